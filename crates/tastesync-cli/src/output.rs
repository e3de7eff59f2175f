//! JSON output formatting

use serde::Serialize;
use tastesync_core::{AggregationReport, SimilarityScore};

/// Result of matching two users
#[derive(Debug, Serialize)]
pub struct MatchOutput {
    pub user_a: String,
    pub user_b: String,
    pub score: SimilarityScore,
    /// Human readable form, e.g. "87.12%"
    pub display: String,
    pub tracks_a: usize,
    pub tracks_b: usize,
    pub skipped_a: usize,
    pub skipped_b: usize,
}

impl MatchOutput {
    pub fn new(
        user_a: &str,
        user_b: &str,
        report_a: &AggregationReport,
        report_b: &AggregationReport,
        score: SimilarityScore,
    ) -> Self {
        Self {
            user_a: user_a.to_string(),
            user_b: user_b.to_string(),
            display: score.to_string(),
            score,
            tracks_a: report_a.tracks_used,
            tracks_b: report_b.tracks_used,
            skipped_a: report_a.skipped.len(),
            skipped_b: report_b.skipped.len(),
        }
    }
}

/// Render any serializable value as pretty JSON
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

/// Print a serializable value as pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match to_json(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing result: {}", e),
    }
}
