//! Administrative session registry.
//!
//! Every user administering a channel through the bot has one session row
//! mapping their user id to the channel they selected with `/set_channel`,
//! plus the short-lived "waiting for the next photo" state.

pub mod error;
pub mod registry;
pub mod session;
pub mod state_store;

pub use {
    error::{Error, Result},
    registry::SessionRegistry,
    session::{PendingUpload, Session},
    state_store::SqliteSessionStore,
};

/// Run database migrations for the sessions crate.
///
/// Creates the `sessions` table. Safe to run alongside the gateway
/// migrations against the same pool.
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}
