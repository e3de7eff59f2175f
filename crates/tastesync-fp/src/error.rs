//! Error types for fingerprint data and `.tsfp` containers

use thiserror::Error;

/// Errors raised while building, decoding or validating fingerprints
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// Byte length is not a positive multiple of one frame
    #[error("byte length {len} is not a positive multiple of {row_bytes}")]
    Corrupt { len: usize, row_bytes: usize },

    /// A frame does not carry the configured number of coefficients
    #[error("frame {frame} has {actual} coefficients, expected {expected}")]
    FrameWidth {
        frame: usize,
        expected: usize,
        actual: usize,
    },

    /// Fingerprint with zero frames
    #[error("fingerprint has no frames")]
    Empty,

    /// NaN or infinity inside a frame
    #[error("non-finite value at frame {frame}, coefficient {coefficient}")]
    NonFinite { frame: usize, coefficient: usize },

    #[error("invalid .tsfp file: magic bytes mismatch")]
    BadMagic,

    #[error("unsupported .tsfp version {0}")]
    UnsupportedVersion(u16),

    #[error("truncated .tsfp file: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("payload checksum mismatch: header {expected:#018x}, computed {actual:#018x}")]
    ChecksumMismatch { expected: u64, actual: u64 },

    /// Stored coefficient count differs from the configured one
    #[error("coefficient dimension mismatch: file has {actual}, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}
