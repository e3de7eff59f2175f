//! Feature extraction parameters
//!
//! One `FeatureConfig` value is threaded through extraction, encoding,
//! decoding and aggregation. The defaults reproduce the reference MFCC front
//! end; changing `n_coefficients` invalidates every stored fingerprint.

use serde::{Deserialize, Serialize};

use crate::error::TasteError;

/// Default number of cepstral coefficients per frame (D)
pub const DEFAULT_COEFFICIENTS: usize = 20;

/// Spectral feature configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Coefficients retained per frame (D)
    pub n_coefficients: usize,
    /// Analysis window / FFT length in samples
    pub n_fft: usize,
    /// Samples between successive frames
    pub hop_length: usize,
    /// Mel filter bank size
    pub n_mels: usize,
    /// Lowest filter-bank frequency (Hz)
    pub f_min: f32,
    /// Highest filter-bank frequency (Hz), Nyquist when unset
    pub f_max: Option<f32>,
    /// Dynamic-range floor below the loudest bin (dB)
    pub top_db: Option<f32>,
    /// Centre frames by zero-padding half a window on both sides
    pub center: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            n_coefficients: DEFAULT_COEFFICIENTS,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            f_min: 0.0,
            f_max: None,
            top_db: Some(80.0),
            center: true,
        }
    }
}

impl FeatureConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), TasteError> {
        if self.n_coefficients == 0 {
            return Err(TasteError::InvalidConfig("n_coefficients must be > 0".into()));
        }
        if self.n_fft == 0 {
            return Err(TasteError::InvalidConfig("n_fft must be > 0".into()));
        }
        if self.hop_length == 0 {
            return Err(TasteError::InvalidConfig("hop_length must be > 0".into()));
        }
        if self.n_mels < self.n_coefficients {
            return Err(TasteError::InvalidConfig(format!(
                "n_mels ({}) must be >= n_coefficients ({})",
                self.n_mels, self.n_coefficients
            )));
        }
        if !(self.f_min >= 0.0) {
            return Err(TasteError::InvalidConfig("f_min must be >= 0".into()));
        }
        if let Some(f_max) = self.f_max {
            if !(f_max > self.f_min) {
                return Err(TasteError::InvalidConfig("f_max must be > f_min".into()));
            }
        }
        if let Some(top_db) = self.top_db {
            if !(top_db >= 0.0) {
                return Err(TasteError::InvalidConfig("top_db must be >= 0".into()));
            }
        }
        Ok(())
    }

    /// Length of a taste vector built with this configuration (2·D)
    pub fn taste_dimension(&self) -> usize {
        2 * self.n_coefficients
    }

    /// Upper filter-bank edge for a given sample rate
    pub fn effective_f_max(&self, sample_rate: u32) -> f32 {
        self.f_max.unwrap_or(sample_rate as f32 / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = FeatureConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.n_coefficients, 20);
        assert_eq!(config.taste_dimension(), 40);
        assert_eq!(config.effective_f_max(22050), 11025.0);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let cases = [
            FeatureConfig { n_coefficients: 0, ..Default::default() },
            FeatureConfig { hop_length: 0, ..Default::default() },
            FeatureConfig { n_mels: 10, ..Default::default() },
            FeatureConfig { f_max: Some(0.0), ..Default::default() },
            FeatureConfig { top_db: Some(-1.0), ..Default::default() },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(TasteError::InvalidConfig(_))),
                "{config:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: FeatureConfig = toml::from_str("n_coefficients = 13\nhop_length = 256").unwrap();
        assert_eq!(config.n_coefficients, 13);
        assert_eq!(config.hop_length, 256);
        assert_eq!(config.n_fft, 2048);
        assert_eq!(config.top_db, Some(80.0));
    }
}
