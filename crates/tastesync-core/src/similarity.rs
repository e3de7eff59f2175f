//! Taste similarity score

use crate::error::{TasteError, TasteResult};
use crate::profile::TasteVector;
use serde::Serialize;
use std::fmt;

/// Compatibility percentage in [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct SimilarityScore(f64);

impl SimilarityScore {
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for SimilarityScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.0)
    }
}

/// Cosine similarity of two taste vectors, clamped at zero and scaled to a
/// percentage. A zero-norm vector carries no taste signal and scores 0.
pub fn compute_similarity(a: &TasteVector, b: &TasteVector) -> TasteResult<SimilarityScore> {
    if a.len() != b.len() {
        return Err(TasteError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let (a, b) = (a.as_slice(), b.as_slice());
    if a.iter().chain(b).any(|v| !v.is_finite()) {
        return Err(TasteError::InvalidFingerprintData(
            "taste vector contains non-finite values".into(),
        ));
    }

    // Dividing by the largest magnitude keeps the squared norms within
    // [1, len] so tiny or huge finite vectors neither underflow nor overflow
    let (scale_a, scale_b) = (max_magnitude(a), max_magnitude(b));
    if scale_a == 0.0 || scale_b == 0.0 {
        return Ok(SimilarityScore(0.0));
    }
    let a: Vec<f64> = a.iter().map(|x| x / scale_a).collect();
    let b: Vec<f64> = b.iter().map(|y| y / scale_b).collect();

    let dot: f64 = a.iter().zip(&b).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum();
    let norm_b: f64 = b.iter().map(|y| y * y).sum();

    // sqrt of the product keeps cos(a, a) at exactly 1
    let cos = dot / (norm_a * norm_b).sqrt();
    Ok(SimilarityScore(cos.clamp(0.0, 1.0) * 100.0))
}

fn max_magnitude(values: &[f64]) -> f64 {
    values.iter().fold(0.0f64, |max, v| max.max(v.abs()))
}
