use std::path::{Path, PathBuf};

use {anyhow::Context, clap::Subcommand, sqlx::SqlitePool};

use beacon_gateway::{SqliteChannelStore, open_database, run_migrations};

#[derive(Subcommand)]
pub enum DbAction {
    /// Run all pending database migrations.
    Migrate,
    /// Import channels from a legacy `config.db`.
    ImportLegacy {
        /// Path of the legacy database.
        #[arg(long)]
        from: PathBuf,
    },
}

/// Path of the main database, as configured.
pub fn db_path() -> anyhow::Result<PathBuf> {
    Ok(beacon_config::discover_and_load()?.database_path())
}

pub async fn handle_db(action: DbAction) -> anyhow::Result<()> {
    let target = db_path()?;
    match action {
        DbAction::Migrate => {
            migrate(&target).await?;
            println!("Migrations complete: {}", target.display());
        },
        DbAction::ImportLegacy { from } => {
            let imported = import_legacy(&from, &target).await?;
            println!(
                "Imported {imported} channel(s) from {} into {}",
                from.display(),
                target.display()
            );
        },
    }
    Ok(())
}

async fn migrate(target: &Path) -> anyhow::Result<SqlitePool> {
    let pool = open_database(target).await?;
    run_migrations(&pool)
        .await
        .context("gateway migrations failed")?;
    Ok(pool)
}

/// Copy every legacy channel not yet known into `target`. Returns the number
/// of channels imported.
async fn import_legacy(from: &Path, target: &Path) -> anyhow::Result<u64> {
    if !from.exists() {
        anyhow::bail!("legacy database not found: {}", from.display());
    }
    let legacy_url = format!("sqlite:{}?mode=ro", from.display());
    let legacy = SqlitePool::connect(&legacy_url)
        .await
        .with_context(|| format!("failed to open {}", from.display()))?;

    let pool = migrate(target).await?;
    let store = SqliteChannelStore::new(pool.clone());
    let imported = store.import_legacy(&legacy).await?;

    legacy.close().await;
    pool.close().await;
    Ok(imported)
}
