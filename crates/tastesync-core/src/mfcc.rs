//! Cepstral fingerprint extraction
//!
//! power spectrum → mel energies → decibels (floored `top_db` below the
//! loudest bin of the whole track) → orthonormal DCT-II, first D coefficients.

use crate::config::FeatureConfig;
use crate::error::{TasteError, TasteResult};
use crate::transform::{MelFilterBank, Stft};
use rayon::prelude::*;
use std::f64::consts::PI;
use tastesync_fp::Fingerprint;

/// Power floor before taking the logarithm
const AMIN: f64 = 1e-10;

/// Extracts spectral fingerprints from mono sample buffers
pub struct FeatureExtractor {
    config: FeatureConfig,
    stft: Stft,
    /// dct[k][m] for k < D, m < n_mels
    dct: Vec<Vec<f64>>,
}

impl FeatureExtractor {
    pub fn new(config: &FeatureConfig) -> TasteResult<Self> {
        config.validate()?;

        Ok(Self {
            config: config.clone(),
            stft: Stft::new(config),
            dct: dct_basis(config.n_coefficients, config.n_mels),
        })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Extract a fingerprint from mono samples at `sample_rate`
    pub fn extract(&self, samples: &[f32], sample_rate: u32) -> TasteResult<Fingerprint> {
        if samples.is_empty() {
            return Err(TasteError::UnreadableAudio("empty sample buffer".into()));
        }
        if sample_rate == 0 {
            return Err(TasteError::UnreadableAudio("sample rate must be positive".into()));
        }
        if let Some(pos) = samples.iter().position(|s| !s.is_finite()) {
            return Err(TasteError::UnreadableAudio(format!(
                "non-finite sample at index {pos}"
            )));
        }

        let f_max = self.config.effective_f_max(sample_rate);
        if self.config.f_min >= f_max {
            return Err(TasteError::InvalidConfig(format!(
                "f_min {} Hz is not below f_max {} Hz at {} Hz",
                self.config.f_min, f_max, sample_rate
            )));
        }

        let mel_bank = MelFilterBank::new(&self.config, sample_rate);
        let num_frames = self.stft.num_frames(samples.len());

        let mut mel_db: Vec<Vec<f64>> = (0..num_frames)
            .into_par_iter()
            .map(|t| {
                let power = self.stft.power_frame(samples, t);
                mel_bank
                    .apply(&power)
                    .into_iter()
                    .map(|e| 10.0 * e.max(AMIN).log10())
                    .collect()
            })
            .collect();

        if let Some(top_db) = self.config.top_db {
            let peak = mel_db
                .iter()
                .flatten()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max);
            let floor = peak - top_db as f64;
            mel_db
                .iter_mut()
                .flatten()
                .for_each(|v| *v = v.max(floor));
        }

        let frames: Vec<Vec<f32>> = mel_db
            .iter()
            .map(|bands| {
                self.dct
                    .iter()
                    .map(|basis| basis.iter().zip(bands).map(|(b, v)| b * v).sum::<f64>() as f32)
                    .collect()
            })
            .collect();

        log::debug!(
            "Extracted {} frames x {} coefficients from {} samples @ {}Hz",
            frames.len(),
            self.config.n_coefficients,
            samples.len(),
            sample_rate
        );

        Ok(Fingerprint::from_frames(frames, self.config.n_coefficients)?)
    }
}

/// Extract a fingerprint with a one-off extractor
pub fn extract_fingerprint(
    samples: &[f32],
    sample_rate: u32,
    config: &FeatureConfig,
) -> TasteResult<Fingerprint> {
    FeatureExtractor::new(config)?.extract(samples, sample_rate)
}

/// Orthonormal DCT-II rows, truncated to the first `n_coefficients`
fn dct_basis(n_coefficients: usize, n_inputs: usize) -> Vec<Vec<f64>> {
    let n = n_inputs as f64;
    (0..n_coefficients)
        .map(|k| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            (0..n_inputs)
                .map(|m| scale * (PI * k as f64 * (2 * m + 1) as f64 / (2.0 * n)).cos())
                .collect()
        })
        .collect()
}
