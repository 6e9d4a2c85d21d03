use std::sync::Arc;

use tracing::{info, warn};

use {
    beacon_channels::{ChannelService, ChannelStore},
    beacon_config::BeaconConfig,
    beacon_sessions::{SessionRegistry, SqliteSessionStore},
};

use crate::{SqliteChannelStore, open_database, run_migrations};

/// Start the bot and run until Ctrl-C or until polling stops.
pub async fn start(config: BeaconConfig) -> anyhow::Result<()> {
    config.validate()?;

    let db_path = config.database_path();
    let pool = open_database(&db_path).await?;
    run_migrations(&pool).await?;
    info!(path = %db_path.display(), "database ready");

    let channel_store = Arc::new(SqliteChannelStore::new(pool.clone()));
    match channel_store.normalize_legacy_rows().await {
        Ok(0) => {},
        Ok(rewritten) => info!(rewritten, "normalized legacy channel records"),
        Err(e) => warn!(error = %e, "failed to normalize legacy channel records"),
    }

    let channels: Arc<dyn ChannelStore> = channel_store;
    let sessions: Arc<dyn SessionRegistry> = Arc::new(SqliteSessionStore::new(pool.clone()));
    let service = Arc::new(ChannelService::new(channels, sessions));

    let cancel = beacon_telegram::start_polling(&config.telegram, service).await?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "failed to listen for ctrl-c");
            }
            info!("shutting down");
            cancel.cancel();
        },
        () = cancel.cancelled() => {
            warn!("telegram polling stopped");
        },
    }

    pool.close().await;
    Ok(())
}
