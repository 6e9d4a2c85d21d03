use std::{fmt, str::FromStr};

use crate::Error;

/// What the next private photo from a user should be used for.
///
/// "Nothing pending" is `Option::None` on [`Session::pending`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingUpload {
    ReplaceOn,
    ReplaceOff,
    AppendOn,
    AppendOff,
}

impl PendingUpload {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReplaceOn => "replace_on",
            Self::ReplaceOff => "replace_off",
            Self::AppendOn => "append_on",
            Self::AppendOff => "append_off",
        }
    }

    /// Whether the photo replaces the whole collection rather than being appended.
    pub fn replaces(self) -> bool {
        matches!(self, Self::ReplaceOn | Self::ReplaceOff)
    }

    /// Whether the photo targets the "on" collection.
    pub fn targets_on(self) -> bool {
        matches!(self, Self::ReplaceOn | Self::AppendOn)
    }
}

impl fmt::Display for PendingUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PendingUpload {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replace_on" => Ok(Self::ReplaceOn),
            "replace_off" => Ok(Self::ReplaceOff),
            "append_on" => Ok(Self::AppendOn),
            "append_off" => Ok(Self::AppendOff),
            other => Err(Error::unknown_pending(other)),
        }
    }
}

/// A user's administrative session.
///
/// Overwritten on every `/set_channel`; never expires on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: i64,
    pub active_channel_id: i64,
    pub pending: Option<PendingUpload>,
    pub updated_at: i64,
}
