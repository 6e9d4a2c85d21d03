use std::error::Error as StdError;

/// Crate-wide result type for channel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed errors for channel administration and post handling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or missing command argument.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The acting user does not own the target channel.
    #[error("channel {channel_id} is owned by another user")]
    OwnershipConflict { channel_id: i64 },

    /// The acting user has not selected a channel yet.
    #[error("no active channel")]
    NoActiveChannel,

    /// The channel has never been claimed or was removed.
    #[error("channel {channel_id} is not configured")]
    NotFound { channel_id: i64 },

    /// Removal index outside `[1, len]`.
    #[error("image index {index} out of range (collection has {len})")]
    IndexOutOfRange { index: i64, len: usize },

    /// Trigger phrase was empty or whitespace only.
    #[error("trigger text must not be empty")]
    EmptyTriggerText,

    #[error(transparent)]
    Session(#[from] beacon_sessions::Error),

    /// Wrapped source error from the storage collaborator.
    #[error("channel storage failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

/// User-facing outcome class of an administrative action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    Success,
    OwnershipConflict,
    NotFound,
    InvalidArgument,
    Failure,
}

impl Error {
    #[must_use]
    pub fn invalid_argument(message: impl std::fmt::Display) -> Self {
        Self::InvalidArgument {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Status reported back to the transport for this error.
    pub fn status(&self) -> ActionStatus {
        match self {
            Self::OwnershipConflict { .. } => ActionStatus::OwnershipConflict,
            Self::NoActiveChannel | Self::NotFound { .. } => ActionStatus::NotFound,
            Self::InvalidArgument { .. } | Self::IndexOutOfRange { .. } | Self::EmptyTriggerText => {
                ActionStatus::InvalidArgument
            },
            Self::Session(_) | Self::External { .. } => ActionStatus::Failure,
        }
    }
}
