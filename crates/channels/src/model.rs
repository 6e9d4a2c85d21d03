use std::fmt;

use beacon_sessions::PendingUpload;

use crate::{Error, Result, images};

/// Built-in trigger phrase for the "on" state.
pub const DEFAULT_TEXT_ON: &str = "світло з'явилося";

/// Built-in trigger phrase for the "off" state.
pub const DEFAULT_TEXT_OFF: &str = "світло зникло";

/// One of the two broadcast states a channel post can announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    On,
    Off,
}

impl Signal {
    /// Glyph that must precede the trigger phrase in a post.
    pub fn marker(self) -> &'static str {
        match self {
            Self::On => "🟢",
            Self::Off => "🔴",
        }
    }

    pub fn default_text(self) -> &'static str {
        match self {
            Self::On => DEFAULT_TEXT_ON,
            Self::Off => DEFAULT_TEXT_OFF,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::On => "on",
            Self::Off => "off",
        })
    }
}

impl From<PendingUpload> for Signal {
    fn from(pending: PendingUpload) -> Self {
        if pending.targets_on() {
            Self::On
        } else {
            Self::Off
        }
    }
}

/// Persisted configuration of one monitored channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub channel_id: i64,
    /// `None` means unclaimed.
    pub owner_id: Option<i64>,
    pub on_images: Vec<String>,
    pub off_images: Vec<String>,
    pub display_username: Option<String>,
    pub display_title: Option<String>,
    /// `None` means the built-in phrase.
    pub text_on: Option<String>,
    pub text_off: Option<String>,
}

impl ChannelConfig {
    /// A fresh, unclaimed record.
    pub fn new(channel_id: i64) -> Self {
        Self {
            channel_id,
            owner_id: None,
            on_images: Vec::new(),
            off_images: Vec::new(),
            display_username: None,
            display_title: None,
            text_on: None,
            text_off: None,
        }
    }

    pub fn images(&self, signal: Signal) -> &[String] {
        match signal {
            Signal::On => &self.on_images,
            Signal::Off => &self.off_images,
        }
    }

    pub fn images_mut(&mut self, signal: Signal) -> &mut Vec<String> {
        match signal {
            Signal::On => &mut self.on_images,
            Signal::Off => &mut self.off_images,
        }
    }

    /// Effective trigger phrase, falling back to the built-in one.
    pub fn trigger_text(&self, signal: Signal) -> &str {
        let custom = match signal {
            Signal::On => self.text_on.as_deref(),
            Signal::Off => self.text_off.as_deref(),
        };
        custom.unwrap_or_else(|| signal.default_text())
    }

    /// Human-facing label: `@username`, then title, then the numeric id.
    pub fn display_name(&self) -> String {
        if let Some(username) = self.display_username.as_deref() {
            format!("@{username}")
        } else if let Some(title) = self.display_title.as_deref() {
            title.to_string()
        } else {
            self.channel_id.to_string()
        }
    }
}

/// A single-field mutation of a [`ChannelConfig`].
///
/// Stores apply an edit inside the same read-modify-write that re-checks
/// ownership, so an edit is never applied to a stale snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEdit {
    ReplaceImages { signal: Signal, image: String },
    AppendImage { signal: Signal, image: String },
    /// `index` is 1-based, as shown to users.
    RemoveImage { signal: Signal, index: i64 },
    SetText { signal: Signal, text: String },
    ResetText,
    TransferOwner { new_owner: i64 },
}

impl ChannelEdit {
    /// Edit that stores a photo for the given pending upload.
    pub fn for_upload(pending: PendingUpload, image: String) -> Self {
        let signal = Signal::from(pending);
        if pending.replaces() {
            Self::ReplaceImages { signal, image }
        } else {
            Self::AppendImage { signal, image }
        }
    }

    /// Apply the edit. Validation happens before anything is touched; on
    /// error `config` is left unchanged.
    pub fn apply(self, config: &mut ChannelConfig) -> Result<()> {
        match self {
            Self::ReplaceImages { signal, image } => {
                images::replace_all(config.images_mut(signal), image);
            },
            Self::AppendImage { signal, image } => {
                images::append(config.images_mut(signal), image);
            },
            Self::RemoveImage { signal, index } => {
                images::remove_at(config.images_mut(signal), index)?;
            },
            Self::SetText { signal, text } => {
                let text = validate_trigger_text(&text)?;
                match signal {
                    Signal::On => config.text_on = Some(text),
                    Signal::Off => config.text_off = Some(text),
                }
            },
            Self::ResetText => {
                config.text_on = None;
                config.text_off = None;
            },
            Self::TransferOwner { new_owner } => config.owner_id = Some(new_owner),
        }
        Ok(())
    }
}

/// Trim a trigger phrase, rejecting one that would match every post.
pub fn validate_trigger_text(text: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyTriggerText);
    }
    Ok(trimmed.to_string())
}

/// An inbound post in a monitored channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPost {
    pub channel_id: i64,
    pub text: String,
    pub display_username: Option<String>,
    pub display_title: Option<String>,
}
