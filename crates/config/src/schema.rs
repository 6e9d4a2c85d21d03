use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

use crate::{Error, Result};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconConfig {
    pub telegram: TelegramConfig,
    pub storage: StorageConfig,
}

impl BeaconConfig {
    /// Path of the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .unwrap_or_else(crate::data_dir)
            .join(&self.storage.database)
    }

    /// Check the settings required to start the bot.
    pub fn validate(&self) -> Result<()> {
        if self.telegram.token.expose_secret().trim().is_empty() {
            return Err(Error::MissingToken);
        }
        if self.storage.database.trim().is_empty() {
            return Err(Error::invalid("storage.database must not be empty"));
        }
        if self.telegram.poll_timeout_secs == 0 {
            return Err(Error::invalid("telegram.poll_timeout_secs must be positive"));
        }
        Ok(())
    }
}

/// Telegram bot settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Long-polling timeout for `getUpdates` (seconds).
    pub poll_timeout_secs: u32,

    /// Register the slash-command list with Telegram on startup.
    pub register_commands: bool,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("register_commands", &self.register_commands)
            .finish()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            poll_timeout_secs: 30,
            register_commands: true,
        }
    }
}

/// Where state is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Overrides the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Database file name inside the data directory.
    pub database: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            database: "beacon.db".into(),
        }
    }
}
