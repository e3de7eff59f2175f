//! fpmatch - Musical compatibility between two users
//!
//! Usage:
//!   fpmatch <user_a> <user_b>                    # Uses config.toml
//!   fpmatch --config <path> <user_a> <user_b>    # Uses custom config

use anyhow::Result;
use clap::Parser;
use tastesync_cli::output::{print_json, MatchOutput};
use tastesync_cli::{init_logger, load_config};
use tastesync_core::{
    compute_similarity, open_store, AggregationReport, LibraryStore, ProfileAggregator,
};

#[derive(Parser, Debug)]
#[command(name = "fpmatch")]
#[command(about = "Score the musical compatibility of two users", long_about = None)]
struct Args {
    /// Path to configuration file (TOML). If not provided, uses config.toml
    #[arg(short, long)]
    config: Option<String>,

    /// First user
    user_a: String,

    /// Second user
    user_b: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let config = load_config(args.config.as_deref())?;
    let store = open_store(&config).await?;
    let aggregator = ProfileAggregator::new(&config.features);

    let report_a = user_report(store.as_ref(), &aggregator, &args.user_a).await?;
    let report_b = user_report(store.as_ref(), &aggregator, &args.user_b).await?;

    let score = compute_similarity(&report_a.taste, &report_b.taste)?;
    log::info!("{} vs {}: {}", args.user_a, args.user_b, score);

    print_json(&MatchOutput::new(
        &args.user_a,
        &args.user_b,
        &report_a,
        &report_b,
        score,
    ));

    Ok(())
}

async fn user_report(
    store: &dyn LibraryStore,
    aggregator: &ProfileAggregator,
    username: &str,
) -> Result<AggregationReport> {
    if store.find_user(username).await?.is_none() {
        anyhow::bail!("Unknown user: {}", username);
    }

    let view = store.library_view(username).await?;
    let report = aggregator.aggregate(&view);

    log::info!(
        "{}: {} tracks across {} artists ({} skipped)",
        username,
        report.tracks_used,
        report.artists,
        report.skipped.len()
    );
    Ok(report)
}
