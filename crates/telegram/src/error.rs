use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),

    #[error(transparent)]
    Channel(#[from] beacon_channels::Error),

    /// Telegram rejects media captions longer than this.
    #[error("caption is {len} characters, limit is {limit}")]
    CaptionTooLong { len: usize, limit: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
