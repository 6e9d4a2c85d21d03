use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("unknown pending upload kind: {value}")]
    UnknownPending { value: String },
}

impl Error {
    #[must_use]
    pub fn unknown_pending(value: impl Into<String>) -> Self {
        Self::UnknownPending {
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
