mod channel_commands;
mod db_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "beacon", about = "Beacon: attaches status images to channel outage posts")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Custom config directory (overrides default ~/.config/beacon/).
    #[arg(long, global = true, env = "BEACON_CONFIG_DIR")]
    config_dir: Option<PathBuf>,
    /// Custom data directory (overrides default data dir).
    #[arg(long, global = true, env = "BEACON_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot (default when no subcommand is provided).
    Run,
    /// Database management (migrate, legacy import).
    Db {
        #[command(subcommand)]
        action: db_commands::DbAction,
    },
    /// Inspect configured channels.
    Channels {
        #[command(subcommand)]
        action: channel_commands::ChannelAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "beacon starting");

    // Directory overrides must be in place before any config or data path is
    // resolved.
    if let Some(ref dir) = cli.config_dir {
        beacon_config::set_config_dir(dir.clone());
    }
    if let Some(ref dir) = cli.data_dir {
        beacon_config::set_data_dir(dir.clone());
    }

    match cli.command {
        None | Some(Commands::Run) => {
            let config = beacon_config::discover_and_load()?;
            beacon_gateway::start(config).await
        },
        Some(Commands::Db { action }) => db_commands::handle_db(action).await,
        Some(Commands::Channels { action }) => channel_commands::handle_channels(action).await,
    }
}
