//! Migration tool for copying user libraries between stores
//!
//! Usage:
//!   fpmigrate --source-config config.toml --dest-config config.postgresql.toml
//!   fpmigrate --source-config config.toml --dest-config config.postgresql.toml --dry-run

use anyhow::{Context, Result};
use clap::Parser;
use tastesync_core::{open_store, LibraryStore, TasteSyncConfig};
use std::path::Path;

#[derive(Parser, Debug)]
#[command(name = "fpmigrate")]
#[command(about = "Copy user libraries from one store to another", long_about = None)]
struct Args {
    /// Source configuration file
    #[arg(long)]
    source_config: String,

    /// Destination configuration file
    #[arg(long)]
    dest_config: String,

    /// Dry run - show what would be migrated without actually migrating
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Default, PartialEq)]
struct MigrationSummary {
    users: usize,
    migrated: usize,
    failed: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    log::info!("🚀 Starting library migration");

    let source_config = TasteSyncConfig::load(Path::new(&args.source_config))
        .context("Failed to load source configuration")?;
    let dest_config = TasteSyncConfig::load(Path::new(&args.dest_config))
        .context("Failed to load destination configuration")?;

    if source_config.features.n_coefficients != dest_config.features.n_coefficients {
        anyhow::bail!(
            "Source stores {} coefficients per frame, destination expects {}",
            source_config.features.n_coefficients,
            dest_config.features.n_coefficients
        );
    }

    log::info!("📂 Source: {:?} from '{}'", source_config.storage.backend, args.source_config);
    let source = open_store(&source_config).await?;
    log::info!("🗄️  Destination: {:?} from '{}'", dest_config.storage.backend, args.dest_config);
    let dest = open_store(&dest_config).await?;

    let summary = migrate_libraries(source.as_ref(), dest.as_ref(), args.dry_run).await?;

    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("📈 Migration Summary:");
    log::info!("   Users:          {}", summary.users);
    log::info!("   ✅ Migrated:    {}", summary.migrated);
    log::info!("   ❌ Failed:      {}", summary.failed);
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if summary.failed > 0 {
        anyhow::bail!("{} tracks failed to migrate", summary.failed);
    }

    log::info!("✅ Migration completed successfully");
    Ok(())
}

async fn migrate_libraries(
    source: &dyn LibraryStore,
    dest: &dyn LibraryStore,
    dry_run: bool,
) -> Result<MigrationSummary> {
    let users = source
        .list_users()
        .await
        .context("Failed to list users in source")?;
    log::info!("Found {} users to migrate", users.len());

    let mut summary = MigrationSummary {
        users: users.len(),
        ..MigrationSummary::default()
    };

    for user in users {
        let entries = source
            .export_entries(&user.username)
            .await
            .with_context(|| format!("Failed to load library of '{}'", user.username))?;

        if dry_run {
            log::info!(
                "  [DRY RUN] Would migrate '{}' ({} tracks)",
                user.username,
                entries.len()
            );
            summary.migrated += entries.len();
            continue;
        }

        dest.ensure_user(&user.username, user.chat_id).await?;
        for entry in &entries {
            match dest.add_entry(&user.username, entry).await {
                Ok(id) => {
                    log::debug!("  Migrated '{}' for '{}' as {}", entry.title, user.username, id);
                    summary.migrated += 1;
                }
                Err(e) => {
                    log::error!("  ❌ Failed to migrate '{}' for '{}': {:#}", entry.title, user.username, e);
                    summary.failed += 1;
                }
            }
        }
        log::info!("  ✅ Migrated '{}' ({} tracks)", user.username, entries.len());
    }

    Ok(summary)
}
