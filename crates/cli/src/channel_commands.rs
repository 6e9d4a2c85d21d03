//! CLI subcommands for inspecting channel configuration.

use {
    beacon_channels::{ChannelConfig, ChannelStore, Signal},
    clap::Subcommand,
};

use beacon_gateway::{SqliteChannelStore, open_database};

use crate::db_commands::db_path;

#[derive(Subcommand)]
pub enum ChannelAction {
    /// List every configured channel.
    List,
}

pub async fn handle_channels(action: ChannelAction) -> anyhow::Result<()> {
    match action {
        ChannelAction::List => list().await,
    }
}

async fn list() -> anyhow::Result<()> {
    let path = db_path()?;
    if !path.exists() {
        println!("No database found at {}", path.display());
        return Ok(());
    }
    let pool = open_database(&path).await?;
    beacon_gateway::run_migrations(&pool).await?;
    let mut channels = SqliteChannelStore::new(pool.clone()).list().await?;
    pool.close().await;

    if channels.is_empty() {
        println!("No channels configured.");
        return Ok(());
    }
    channels.sort_by_key(|c| c.channel_id);
    for config in &channels {
        println!("{}", format_channel(config));
    }
    Ok(())
}

fn format_channel(config: &ChannelConfig) -> String {
    let owner = config
        .owner_id
        .map_or_else(|| "unclaimed".to_string(), |id| id.to_string());
    format!(
        "{}  {}  owner={owner}  on={} off={}  text_on={:?} text_off={:?}",
        config.channel_id,
        config.display_name(),
        config.images(Signal::On).len(),
        config.images(Signal::Off).len(),
        config.trigger_text(Signal::On),
        config.trigger_text(Signal::Off),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_channel_shows_counts_and_phrases() {
        let mut config = ChannelConfig::new(-100);
        config.owner_id = Some(7);
        config.display_username = Some("svitlo".into());
        config.on_images = vec!["a".into()];
        config.text_off = Some("немає світла".into());

        let line = format_channel(&config);
        assert_eq!(
            line,
            "-100  @svitlo  owner=7  on=1 off=0  text_on=\"світло з'явилося\" text_off=\"немає світла\""
        );
    }

    #[test]
    fn unclaimed_channel() {
        assert!(format_channel(&ChannelConfig::new(-5)).contains("owner=unclaimed"));
    }
}
