//! Gateway: wires storage, the channel service and the Telegram transport.
//!
//! Lifecycle:
//! 1. Load + validate config
//! 2. Open the SQLite database and run migrations
//! 3. Normalize legacy image lists left by older records
//! 4. Start the Telegram polling loop
//! 5. Wait for Ctrl-C or for the loop to stop on its own

pub mod channel_store;
pub mod server;

use std::path::Path;

use {sqlx::SqlitePool, tracing::debug};

pub use {channel_store::SqliteChannelStore, server::start};

/// Run database migrations for the gateway crate and the crates it owns
/// the pool for.
///
/// Creates the `channels` table (this crate) and the `sessions` table
/// (`beacon-sessions`).
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    beacon_sessions::run_migrations(pool).await?;
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}

/// Open (creating if needed) the SQLite database at `path`.
pub async fn open_database(path: &Path) -> anyhow::Result<SqlitePool> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let db_url = format!("sqlite:{}?mode=rwc", path.display());
    debug!(path = %path.display(), "opening database");
    Ok(SqlitePool::connect(&db_url).await?)
}
