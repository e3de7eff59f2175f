//! .tsfp file reader

use crate::codec;
use crate::error::FingerprintError;
use crate::format::{FpFile, FpHeader, FpMetadata, HEADER_SIZE, MAGIC, PAYLOAD_CRC, VERSION};
use anyhow::{Context, Result};
use std::io::{Cursor, Read};
use std::path::Path;

pub struct FpReader;

impl FpReader {
    /// Read .tsfp file, checking that it was produced with `coefficients` per frame
    pub fn read(path: &Path, coefficients: usize) -> Result<FpFile> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to open .tsfp file: {}", path.display()))?;

        Self::from_bytes(&bytes, coefficients)
            .with_context(|| format!("Failed to parse .tsfp file: {}", path.display()))
    }

    /// Parse a complete in-memory .tsfp image
    pub fn from_bytes(bytes: &[u8], coefficients: usize) -> Result<FpFile, FingerprintError> {
        if bytes.len() < HEADER_SIZE {
            return Err(FingerprintError::Truncated {
                needed: HEADER_SIZE,
                available: bytes.len(),
            });
        }

        let mut reader = Cursor::new(bytes);
        let header = Self::read_header(&mut reader)?;

        if header.magic != MAGIC {
            return Err(FingerprintError::BadMagic);
        }
        if header.version != VERSION {
            return Err(FingerprintError::UnsupportedVersion(header.version));
        }
        if header.coefficients as usize != coefficients {
            return Err(FingerprintError::DimensionMismatch {
                expected: coefficients,
                actual: header.coefficients as usize,
            });
        }

        // Size fields come from the file; an overflowing sum can never be satisfied
        let metadata_end = usize::try_from(header.metadata_size)
            .ok()
            .and_then(|size| HEADER_SIZE.checked_add(size));
        let payload_end = metadata_end.and_then(|end| {
            usize::try_from(header.payload_size)
                .ok()
                .and_then(|size| end.checked_add(size))
        });
        let (metadata_end, payload_end) = match (metadata_end, payload_end) {
            (Some(m), Some(p)) if p <= bytes.len() => (m, p),
            (_, p) => {
                return Err(FingerprintError::Truncated {
                    needed: p.unwrap_or(usize::MAX),
                    available: bytes.len(),
                })
            }
        };

        let metadata: FpMetadata = serde_json::from_slice(&bytes[HEADER_SIZE..metadata_end])?;

        let payload = &bytes[metadata_end..payload_end];
        let actual = PAYLOAD_CRC.checksum(payload);
        if actual != header.checksum {
            return Err(FingerprintError::ChecksumMismatch {
                expected: header.checksum,
                actual,
            });
        }

        let fingerprint = codec::decode(payload, coefficients)?;

        Ok(FpFile {
            header,
            metadata,
            fingerprint,
        })
    }

    fn read_header(reader: &mut Cursor<&[u8]>) -> Result<FpHeader, FingerprintError> {
        let mut magic = [0u8; 4];
        Self::fill(reader, &mut magic)?;

        Ok(FpHeader {
            magic,
            version: u16::from_le_bytes(Self::take(reader)?),
            flags: u16::from_le_bytes(Self::take(reader)?),
            coefficients: u16::from_le_bytes(Self::take(reader)?),
            reserved: u16::from_le_bytes(Self::take(reader)?),
            num_frames: u32::from_le_bytes(Self::take(reader)?),
            sample_rate: u32::from_le_bytes(Self::take(reader)?),
            metadata_size: u32::from_le_bytes(Self::take(reader)?),
            payload_size: u64::from_le_bytes(Self::take(reader)?),
            checksum: u64::from_le_bytes(Self::take(reader)?),
        })
    }

    fn take<const N: usize>(reader: &mut Cursor<&[u8]>) -> Result<[u8; N], FingerprintError> {
        let mut buf = [0u8; N];
        Self::fill(reader, &mut buf)?;
        Ok(buf)
    }

    fn fill(reader: &mut Cursor<&[u8]>, buf: &mut [u8]) -> Result<(), FingerprintError> {
        let available = reader.get_ref().len();
        reader
            .read_exact(buf)
            .map_err(|_| FingerprintError::Truncated {
                needed: reader.position() as usize + buf.len(),
                available,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Fingerprint, FpWriter};

    fn sample_file() -> FpFile {
        let fingerprint =
            Fingerprint::from_frames(vec![vec![1.5, -2.0, 3.25], vec![0.5, 0.25, -8.0]], 3).unwrap();
        let metadata = FpMetadata::new(
            "Je te laisserai des mots".to_string(),
            "Patrick Watson".to_string(),
            "watson.mp3".to_string(),
            "{}".to_string(),
        );
        FpFile::new(metadata, fingerprint, 44100).unwrap()
    }

    #[test]
    fn test_write_then_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.tsfp");
        let original = sample_file();

        FpWriter::new().write(&path, &original).unwrap();
        let loaded = FpReader::read(&path, 3).unwrap();

        assert_eq!(loaded.header, original.header);
        assert_eq!(loaded.metadata, original.metadata);
        assert_eq!(loaded.fingerprint, original.fingerprint);
        assert_eq!(loaded.header.num_frames, 2);
        assert_eq!(loaded.header.sample_rate, 44100);
    }

    #[test]
    fn test_rejects_other_dimension() {
        let bytes = FpWriter::new().to_bytes(&sample_file()).unwrap();
        let err = FpReader::from_bytes(&bytes, 20).unwrap_err();
        assert!(matches!(
            err,
            FingerprintError::DimensionMismatch { expected: 20, actual: 3 }
        ));
    }

    #[test]
    fn test_detects_payload_corruption() {
        let mut bytes = FpWriter::new().to_bytes(&sample_file()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(
            FpReader::from_bytes(&bytes, 3),
            Err(FingerprintError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_magic_and_truncation() {
        let mut bytes = FpWriter::new().to_bytes(&sample_file()).unwrap();

        let truncated = &bytes[..bytes.len() - 4];
        assert!(matches!(
            FpReader::from_bytes(truncated, 3),
            Err(FingerprintError::Truncated { .. })
        ));
        assert!(matches!(
            FpReader::from_bytes(&bytes[..10], 3),
            Err(FingerprintError::Truncated { needed: HEADER_SIZE, available: 10 })
        ));

        bytes[0] = b'X';
        assert!(matches!(
            FpReader::from_bytes(&bytes, 3),
            Err(FingerprintError::BadMagic)
        ));
    }

    #[test]
    fn test_rejects_oversized_section_lengths() {
        let valid = FpWriter::new().to_bytes(&sample_file()).unwrap();

        let mut huge_payload = valid.clone();
        huge_payload[24..32].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(
            FpReader::from_bytes(&huge_payload, 3),
            Err(FingerprintError::Truncated { .. })
        ));

        let mut huge_metadata = valid.clone();
        huge_metadata[20..24].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            FpReader::from_bytes(&huge_metadata, 3),
            Err(FingerprintError::Truncated { .. })
        ));

        let mut both = valid;
        both[20..24].copy_from_slice(&u32::MAX.to_le_bytes());
        both[24..32].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(
            FpReader::from_bytes(&both, 3),
            Err(FingerprintError::Truncated { needed: usize::MAX, .. })
        ));
    }

    #[test]
    fn test_read_reports_oversized_file_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("damaged.tsfp");
        let mut bytes = FpWriter::new().to_bytes(&sample_file()).unwrap();
        bytes[24..32].copy_from_slice(&(u64::MAX - 8).to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();

        assert!(FpReader::read(&path, 3).is_err());
    }
}
