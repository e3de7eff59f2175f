//! Fingerprint matrix: T frames of D spectral coefficients

use crate::error::FingerprintError;

/// Ordered sequence of coefficient frames for one track.
///
/// Stored flat in frame-major order; every frame has exactly
/// `coefficients` values and there is at least one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Fingerprint {
    coefficients: usize,
    values: Vec<f32>,
}

impl Fingerprint {
    /// Build from a flat frame-major buffer
    pub fn from_flat(values: Vec<f32>, coefficients: usize) -> Result<Self, FingerprintError> {
        if values.is_empty() {
            return Err(FingerprintError::Empty);
        }
        if coefficients == 0 {
            return Err(FingerprintError::FrameWidth {
                frame: 0,
                expected: 0,
                actual: values.len(),
            });
        }
        if values.len() % coefficients != 0 {
            return Err(FingerprintError::FrameWidth {
                frame: values.len() / coefficients,
                expected: coefficients,
                actual: values.len() % coefficients,
            });
        }
        Ok(Self {
            coefficients,
            values,
        })
    }

    /// Build from individual frames, checking each frame's width
    pub fn from_frames(frames: Vec<Vec<f32>>, coefficients: usize) -> Result<Self, FingerprintError> {
        if frames.is_empty() {
            return Err(FingerprintError::Empty);
        }

        let mut values = Vec::with_capacity(frames.len() * coefficients);
        for (frame, row) in frames.into_iter().enumerate() {
            if row.len() != coefficients {
                return Err(FingerprintError::FrameWidth {
                    frame,
                    expected: coefficients,
                    actual: row.len(),
                });
            }
            values.extend(row);
        }

        Self::from_flat(values, coefficients)
    }

    /// Number of time frames (T)
    pub fn num_frames(&self) -> usize {
        self.values.len() / self.coefficients
    }

    /// Coefficients per frame (D)
    pub fn coefficients(&self) -> usize {
        self.coefficients
    }

    pub fn frame(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.coefficients)?;
        let end = start.checked_add(self.coefficients)?;
        self.values.get(start..end)
    }

    pub fn frames(&self) -> impl Iterator<Item = &[f32]> {
        self.values.chunks_exact(self.coefficients)
    }

    /// Flat frame-major view of all values
    pub fn as_flat(&self) -> &[f32] {
        &self.values
    }

    /// Reject NaN and infinite coefficients
    pub fn ensure_finite(&self) -> Result<(), FingerprintError> {
        match self.values.iter().position(|v| !v.is_finite()) {
            Some(pos) => Err(FingerprintError::NonFinite {
                frame: pos / self.coefficients,
                coefficient: pos % self.coefficients,
            }),
            None => Ok(()),
        }
    }

    /// Element-wise mean over the time axis
    pub fn frame_mean(&self) -> Vec<f64> {
        let mut sums = vec![0.0f64; self.coefficients];
        for frame in self.frames() {
            for (sum, &v) in sums.iter_mut().zip(frame) {
                *sum += v as f64;
            }
        }

        let count = self.num_frames() as f64;
        sums.iter_mut().for_each(|s| *s /= count);
        sums
    }
}
