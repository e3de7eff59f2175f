//! fpgen - Fingerprint generator
//!
//! Usage: fpgen [--config <path>] [--artist <name>] <audio>... -o <output_dir>

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tastesync_cli::output::print_json;
use tastesync_cli::{init_logger, load_config};
use tastesync_core::{generate_fingerprint, FeatureConfig};
use tastesync_fp::{FpFile, FpMetadata, FpWriter};

#[derive(Parser, Debug)]
#[command(name = "fpgen")]
#[command(about = "Generate TasteSync fingerprints from audio files", long_about = None)]
struct Args {
    /// Input audio files
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output directory for .tsfp files
    #[arg(short, long)]
    output_dir: String,

    /// Artist label stored in the file metadata
    #[arg(short, long, default_value = "")]
    artist: String,

    /// Path to configuration file (TOML) providing [features]
    #[arg(short, long)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct FileResult {
    status: &'static str,
    input_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_frames: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct Summary {
    processed: usize,
    failed: usize,
    coefficients: usize,
    processing_time_seconds: f64,
    results: Vec<FileResult>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let config = load_config(args.config.as_deref())?;
    let output_dir = Path::new(&args.output_dir);
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let start = std::time::Instant::now();
    let results: Vec<FileResult> = args
        .inputs
        .par_iter()
        .map(|input| {
            match process_file(Path::new(input), output_dir, &args.artist, &config.features) {
                Ok(result) => result,
                Err(e) => {
                    log::warn!("Failed to fingerprint {}: {:#}", input, e);
                    FileResult {
                        status: "error",
                        input_file: input.clone(),
                        output_file: None,
                        num_frames: None,
                        sample_rate: None,
                        error: Some(format!("{:#}", e)),
                    }
                }
            }
        })
        .collect();

    let failed = results.iter().filter(|r| r.error.is_some()).count();
    let summary = Summary {
        processed: results.len() - failed,
        failed,
        coefficients: config.features.n_coefficients,
        processing_time_seconds: start.elapsed().as_secs_f64(),
        results,
    };
    print_json(&summary);

    if failed > 0 {
        anyhow::bail!("{} of {} files failed", failed, args.inputs.len());
    }
    Ok(())
}

fn output_path(input_path: &Path, output_dir: &Path) -> Result<PathBuf> {
    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow::anyhow!("Input has no file name: {}", input_path.display()))?;
    Ok(output_dir.join(format!("{}.tsfp", stem)))
}

fn process_file(
    input_path: &Path,
    output_dir: &Path,
    artist: &str,
    features: &FeatureConfig,
) -> Result<FileResult> {
    if !input_path.exists() {
        anyhow::bail!("Input file not found: {}", input_path.display());
    }
    let output_path = output_path(input_path, output_dir)?;

    log::info!("Processing: {}", input_path.display());
    let (fingerprint, sample_rate) = generate_fingerprint(input_path, features)?;
    let num_frames = fingerprint.num_frames();

    let title = input_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let original_filename = input_path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let metadata = FpMetadata::new(
        title,
        artist.to_string(),
        original_filename,
        serde_json::to_string(features)?,
    );

    let fp_file = FpFile::new(metadata, fingerprint, sample_rate)?;
    FpWriter::new().write(&output_path, &fp_file)?;

    log::info!(
        "Wrote {} ({} frames @ {}Hz)",
        output_path.display(),
        num_frames,
        sample_rate
    );

    Ok(FileResult {
        status: "success",
        input_file: input_path.display().to_string(),
        output_file: Some(output_path.display().to_string()),
        num_frames: Some(num_frames),
        sample_rate: Some(sample_rate),
        error: None,
    })
}
