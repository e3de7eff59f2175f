//! Raw fingerprint blob codec
//!
//! The persisted layout is a flat run of `T × D` little-endian IEEE-754
//! `f32` values, frame-major. D is not stored in the blob; it comes from the
//! feature configuration. Changing D invalidates every stored blob.

use crate::error::FingerprintError;
use crate::fingerprint::Fingerprint;

/// Width of one stored coefficient in bytes
pub const ELEMENT_WIDTH: usize = 4;

/// Encoder/decoder for a fixed coefficient count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintCodec {
    coefficients: usize,
}

impl FingerprintCodec {
    pub fn new(coefficients: usize) -> Self {
        Self { coefficients }
    }

    pub fn coefficients(&self) -> usize {
        self.coefficients
    }

    /// Bytes occupied by a single frame
    pub fn row_bytes(&self) -> usize {
        self.coefficients * ELEMENT_WIDTH
    }

    pub fn encode(&self, fingerprint: &Fingerprint) -> Vec<u8> {
        encode(fingerprint)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Fingerprint, FingerprintError> {
        decode(bytes, self.coefficients)
    }
}

/// Flatten a fingerprint to bytes
pub fn encode(fingerprint: &Fingerprint) -> Vec<u8> {
    let values = fingerprint.as_flat();
    let mut bytes = Vec::with_capacity(values.len() * ELEMENT_WIDTH);
    for v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Rebuild a fingerprint from bytes given the coefficient count
pub fn decode(bytes: &[u8], coefficients: usize) -> Result<Fingerprint, FingerprintError> {
    let row_bytes = coefficients * ELEMENT_WIDTH;
    if row_bytes == 0 || bytes.is_empty() || bytes.len() % row_bytes != 0 {
        return Err(FingerprintError::Corrupt {
            len: bytes.len(),
            row_bytes,
        });
    }

    let values: Vec<f32> = bytes
        .chunks_exact(ELEMENT_WIDTH)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    Fingerprint::from_flat(values, coefficients)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fingerprint() -> Fingerprint {
        let frames = vec![
            vec![-312.25, 41.5, 0.0, -0.0],
            vec![1.0e-7, f32::MAX, f32::MIN_POSITIVE, 7.125],
            vec![3.0, -2.5, 12.75, 100.0],
        ];
        Fingerprint::from_frames(frames, 4).unwrap()
    }

    #[test]
    fn test_round_trip_is_bit_exact() {
        let fp = sample_fingerprint();
        let bytes = encode(&fp);
        assert_eq!(bytes.len(), 3 * 4 * ELEMENT_WIDTH);

        let decoded = decode(&bytes, 4).unwrap();
        assert_eq!(decoded.num_frames(), 3);
        let original: Vec<u32> = fp.as_flat().iter().map(|v| v.to_bits()).collect();
        let restored: Vec<u32> = decoded.as_flat().iter().map(|v| v.to_bits()).collect();
        assert_eq!(original, restored);
    }

    #[test]
    fn test_layout_is_frame_major_little_endian() {
        let fp = Fingerprint::from_frames(vec![vec![1.0, 2.0], vec![3.0, 4.0]], 2).unwrap();
        let bytes = encode(&fp);
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[4..8], &2.0f32.to_le_bytes());
        assert_eq!(&bytes[8..12], &3.0f32.to_le_bytes());
    }

    #[test]
    fn test_decode_rejects_bad_lengths() {
        let codec = FingerprintCodec::new(20);
        assert_eq!(codec.row_bytes(), 80);

        for len in [0usize, 4, 79, 81, 159] {
            let err = codec.decode(&vec![0u8; len]).unwrap_err();
            assert!(
                matches!(err, FingerprintError::Corrupt { row_bytes: 80, .. }),
                "length {len} should be corrupt"
            );
        }

        let fp = codec.decode(&vec![0u8; 160]).unwrap();
        assert_eq!(fp.num_frames(), 2);
    }
}
