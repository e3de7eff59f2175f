//! Short-time power spectrum and mel filter bank
//!
//! Frames are centred (half a window of zero padding on each side), windowed
//! with a periodic Hann window and transformed with a real-input FFT of
//! `n_fft` points. The mel bank uses the Slaney scale with area-normalised
//! triangular filters.

use crate::config::FeatureConfig;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;

/// Short-time Fourier transform producing one power frame at a time
pub struct Stft {
    fft: Arc<dyn Fft<f64>>,
    window: Vec<f64>,
    n_fft: usize,
    hop_length: usize,
    center: bool,
}

impl Stft {
    pub fn new(config: &FeatureConfig) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.n_fft);

        Self {
            fft,
            window: create_hann_window(config.n_fft),
            n_fft: config.n_fft,
            hop_length: config.hop_length,
            center: config.center,
        }
    }

    /// Number of power bins per frame (`n_fft / 2 + 1`)
    pub fn num_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Number of frames produced for `num_samples` input samples (at least 1)
    pub fn num_frames(&self, num_samples: usize) -> usize {
        let padded = num_samples + self.padding() * 2;
        if padded <= self.n_fft {
            1
        } else {
            1 + (padded - self.n_fft) / self.hop_length
        }
    }

    fn padding(&self) -> usize {
        if self.center {
            self.n_fft / 2
        } else {
            0
        }
    }

    /// Power spectrum `|X(k)|²` of one frame
    pub fn power_frame(&self, samples: &[f32], frame_idx: usize) -> Vec<f64> {
        let pad = self.padding();
        let start = frame_idx * self.hop_length;

        // Index into the virtually padded signal
        let mut frame: Vec<Complex<f64>> = (0..self.n_fft)
            .map(|i| {
                let sample = (start + i)
                    .checked_sub(pad)
                    .and_then(|idx| samples.get(idx))
                    .copied()
                    .unwrap_or(0.0);
                Complex::new(sample as f64 * self.window[i], 0.0)
            })
            .collect();

        self.fft.process(&mut frame);

        frame[..self.num_bins()].iter().map(|c| c.norm_sqr()).collect()
    }
}

/// Create periodic Hann window
fn create_hann_window(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| {
            let x = i as f64 / size as f64;
            0.5 * (1.0 - (2.0 * PI * x).cos())
        })
        .collect()
}

/// Triangular mel filter bank over FFT power bins
pub struct MelFilterBank {
    /// weights[filter][bin]
    weights: Vec<Vec<f64>>,
}

impl MelFilterBank {
    pub fn new(config: &FeatureConfig, sample_rate: u32) -> Self {
        let n_mels = config.n_mels;
        let num_bins = config.n_fft / 2 + 1;
        let sr = sample_rate as f64;

        let fft_freqs: Vec<f64> = (0..num_bins)
            .map(|k| k as f64 * sr / config.n_fft as f64)
            .collect();

        let mel_min = hz_to_mel(config.f_min as f64);
        let mel_max = hz_to_mel(config.effective_f_max(sample_rate) as f64);
        let mel_points: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
            .collect();

        let weights = (0..n_mels)
            .map(|m| {
                let (lower, center, upper) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
                let norm = 2.0 / (upper - lower);
                fft_freqs
                    .iter()
                    .map(|&f| {
                        let rising = (f - lower) / (center - lower);
                        let falling = (upper - f) / (upper - center);
                        rising.min(falling).max(0.0) * norm
                    })
                    .collect()
            })
            .collect();

        Self { weights }
    }

    pub fn num_filters(&self) -> usize {
        self.weights.len()
    }

    pub fn filter(&self, index: usize) -> Option<&[f64]> {
        self.weights.get(index).map(Vec::as_slice)
    }

    /// Project a power spectrum onto the mel bands
    pub fn apply(&self, power: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .map(|w| w.iter().zip(power).map(|(w, p)| w * p).sum())
            .collect()
    }
}

const MEL_F_SP: f64 = 200.0 / 3.0;
const MEL_MIN_LOG_HZ: f64 = 1000.0;
const MEL_MIN_LOG_MEL: f64 = MEL_MIN_LOG_HZ / MEL_F_SP;

fn mel_log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Hz to Mel (Slaney): linear below 1 kHz, logarithmic above
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MEL_MIN_LOG_HZ {
        MEL_MIN_LOG_MEL + (hz / MEL_MIN_LOG_HZ).ln() / mel_log_step()
    } else {
        hz / MEL_F_SP
    }
}

/// Mel to Hz (Slaney)
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MEL_MIN_LOG_MEL {
        MEL_MIN_LOG_HZ * (mel_log_step() * (mel - MEL_MIN_LOG_MEL)).exp()
    } else {
        mel * MEL_F_SP
    }
}
