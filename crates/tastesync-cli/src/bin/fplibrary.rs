//! fplibrary - Manage users' track libraries
//!
//! Usage:
//!   fplibrary add <user> <audio> --title <title> --artist <artist>...
//!   fplibrary list <user>
//!   fplibrary count <user>
//!   fplibrary remove <user> <entry_id>
//!   fplibrary profile <user>
//!   fplibrary users

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tastesync_cli::output::print_json;
use tastesync_cli::{init_logger, load_config};
use tastesync_core::{acquire_local, ingest, open_store, LibraryStore, ProfileAggregator, TasteSyncConfig};

#[derive(Parser, Debug)]
#[command(name = "fplibrary")]
#[command(about = "Manage TasteSync user libraries", long_about = None)]
struct Args {
    /// Path to configuration file (TOML). If not provided, uses config.toml
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fingerprint an audio file and add it to a user's library
    Add {
        username: String,
        audio_path: PathBuf,
        /// Track title (defaults to the file name)
        #[arg(short, long)]
        title: Option<String>,
        /// Artist label; repeat for featured artists, the first one is used for grouping
        #[arg(short, long = "artist", required = true)]
        artists: Vec<String>,
        /// Chat id to associate with the user
        #[arg(long)]
        chat_id: Option<i64>,
    },
    /// List a user's library
    List { username: String },
    /// Count the tracks in a user's library
    Count { username: String },
    /// Remove one entry from a user's library
    Remove { username: String, entry_id: i64 },
    /// Print the taste profile of a user
    Profile { username: String },
    /// List known users
    Users,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let config = load_config(args.config.as_deref())?;
    let store = open_store(&config).await?;

    run(args.command, &config, store.as_ref()).await
}

async fn run(command: Command, config: &TasteSyncConfig, store: &dyn LibraryStore) -> Result<()> {
    match command {
        Command::Add {
            username,
            audio_path,
            title,
            artists,
            chat_id,
        } => {
            let title = title.unwrap_or_else(|| {
                audio_path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });

            // Decoding and extraction are CPU-bound
            let features = config.features.clone();
            let entry = tokio::task::spawn_blocking(move || {
                ingest(acquire_local(&audio_path, &title, &artists), &features)
            })
            .await
            .context("Fingerprint worker panicked")??;

            store.ensure_user(&username, chat_id).await?;
            let entry_id = store.add_entry(&username, &entry).await?;
            let track_count = store.track_count(&username).await?;

            log::info!("Track added! Total tracks: {}", track_count);
            print_json(&json!({
                "status": "success",
                "user": username,
                "entry_id": entry_id,
                "title": entry.title,
                "artist": entry.artist,
                "num_frames": entry.num_frames,
                "track_count": track_count,
            }));
        }
        Command::List { username } => {
            print_json(&store.list_entries(&username).await?);
        }
        Command::Count { username } => {
            let track_count = store.track_count(&username).await?;
            print_json(&json!({ "user": username, "track_count": track_count }));
        }
        Command::Remove { username, entry_id } => {
            let removed = store.remove_entry(&username, entry_id).await?;
            if !removed {
                anyhow::bail!("No entry {} in {}'s library", entry_id, username);
            }
            print_json(&json!({ "status": "success", "user": username, "removed": entry_id }));
        }
        Command::Profile { username } => {
            let view = store.library_view(&username).await?;
            let report = ProfileAggregator::new(&config.features).aggregate(&view);
            print_json(&report);
        }
        Command::Users => {
            print_json(&store.list_users().await?);
        }
    }

    Ok(())
}
