//! Error types for the taste pipeline

use tastesync_fp::FingerprintError;
use thiserror::Error;

/// Errors surfaced by extraction, aggregation and similarity
#[derive(Debug, Error)]
pub enum TasteError {
    /// Empty sample buffer, non-positive sample rate or non-finite samples
    #[error("could not analyze audio: {0}")]
    UnreadableAudio(String),

    /// Stored fingerprint bytes are malformed
    #[error("corrupt fingerprint: {0}")]
    CorruptFingerprint(String),

    /// Fingerprint contains NaN or infinite values
    #[error("invalid fingerprint data: {0}")]
    InvalidFingerprintData(String),

    /// Taste vectors built with different coefficient counts
    #[error("taste vector dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("invalid feature configuration: {0}")]
    InvalidConfig(String),
}

impl From<FingerprintError> for TasteError {
    fn from(err: FingerprintError) -> Self {
        match err {
            FingerprintError::NonFinite { .. } => TasteError::InvalidFingerprintData(err.to_string()),
            other => TasteError::CorruptFingerprint(other.to_string()),
        }
    }
}

/// Result alias for pipeline operations
pub type TasteResult<T> = Result<T, TasteError>;
