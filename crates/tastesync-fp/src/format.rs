//! .tsfp file format structures

use crate::codec;
use crate::fingerprint::Fingerprint;
use crc::{Crc, CRC_64_ECMA_182};
use serde::{Deserialize, Serialize};

/// Magic bytes for .tsfp files: "TSFP"
pub const MAGIC: [u8; 4] = [0x54, 0x53, 0x46, 0x50];

/// Current format version
pub const VERSION: u16 = 1;

/// Size of the fixed header in bytes
pub const HEADER_SIZE: usize = 40;

/// Algorithm identifier written into metadata
pub const ALGORITHM_ID: &str = "MFCC";

pub(crate) const PAYLOAD_CRC: Crc<u64> = Crc::<u64>::new(&CRC_64_ECMA_182);

/// File header (40 bytes fixed size, little-endian)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FpHeader {
    /// Magic bytes: "TSFP"
    pub magic: [u8; 4],
    /// Format version
    pub version: u16,
    /// Flags (currently unused)
    pub flags: u16,
    /// Coefficients per frame (D)
    pub coefficients: u16,
    /// Reserved
    pub reserved: u16,
    /// Number of frames (T)
    pub num_frames: u32,
    /// Sample rate of the analysed audio (Hz)
    pub sample_rate: u32,
    /// Size of the JSON metadata section
    pub metadata_size: u32,
    /// Size of the raw fingerprint payload
    pub payload_size: u64,
    /// CRC-64/ECMA-182 of the payload
    pub checksum: u64,
}

impl FpHeader {
    pub fn new(
        coefficients: u16,
        num_frames: u32,
        sample_rate: u32,
        metadata_size: u32,
        payload_size: u64,
        checksum: u64,
    ) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            flags: 0,
            coefficients,
            reserved: 0,
            num_frames,
            sample_rate,
            metadata_size,
            payload_size,
            checksum,
        }
    }
}

/// Metadata section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FpMetadata {
    /// Track title
    pub title: String,
    /// Artist label used for grouping
    pub artist: String,
    /// Original filename
    pub original_filename: String,
    /// Algorithm ID (e.g., "MFCC")
    pub algorithm_id: String,
    /// Feature parameters (JSON)
    pub algorithm_params: String,
    /// RFC 3339 creation time
    pub created_at: String,
}

impl FpMetadata {
    pub fn new(title: String, artist: String, original_filename: String, algorithm_params: String) -> Self {
        Self {
            title,
            artist,
            original_filename,
            algorithm_id: ALGORITHM_ID.to_string(),
            algorithm_params,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Complete .tsfp file structure
#[derive(Debug, Clone)]
pub struct FpFile {
    pub header: FpHeader,
    pub metadata: FpMetadata,
    pub fingerprint: Fingerprint,
}

impl FpFile {
    /// Assemble a file, filling in sizes and checksum
    pub fn new(metadata: FpMetadata, fingerprint: Fingerprint, sample_rate: u32) -> Result<Self, crate::FingerprintError> {
        let metadata_json = serde_json::to_vec(&metadata)?;
        let payload = codec::encode(&fingerprint);
        let coefficients = u16::try_from(fingerprint.coefficients()).map_err(|_| {
            crate::FingerprintError::DimensionMismatch {
                expected: u16::MAX as usize,
                actual: fingerprint.coefficients(),
            }
        })?;

        let header = FpHeader::new(
            coefficients,
            fingerprint.num_frames() as u32,
            sample_rate,
            metadata_json.len() as u32,
            payload.len() as u64,
            PAYLOAD_CRC.checksum(&payload),
        );

        Ok(Self {
            header,
            metadata,
            fingerprint,
        })
    }

    /// Raw codec payload as it would be persisted in a library row
    pub fn payload(&self) -> Vec<u8> {
        codec::encode(&self.fingerprint)
    }
}
