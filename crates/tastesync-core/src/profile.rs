//! Taste vector aggregation
//!
//! Each track's frames collapse to a track mean. Track means are grouped by
//! artist into an artist mean and a population variance, and the user
//! profile is the average over artists of both. Every artist therefore
//! weighs the same no matter how many of their tracks a user added.

use crate::config::FeatureConfig;
use crate::error::{TasteError, TasteResult};
use crate::library::LibraryView;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tastesync_fp::{Fingerprint, FingerprintCodec};

#[cfg(test)]
mod tests;

/// `concat(meanProfile, varianceProfile)`, length 2·D
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TasteVector(Vec<f64>);

impl TasteVector {
    /// All-zero vector for `coefficients` = D
    pub fn zeros(coefficients: usize) -> Self {
        Self(vec![0.0; 2 * coefficients])
    }

    pub fn from_parts(mean_profile: Vec<f64>, variance_profile: Vec<f64>) -> Self {
        let mut values = mean_profile;
        values.extend(variance_profile);
        Self(values)
    }

    /// Wrap raw values, e.g. a vector computed elsewhere
    pub fn from_values(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn mean_profile(&self) -> &[f64] {
        &self.0[..self.0.len() / 2]
    }

    pub fn variance_profile(&self) -> &[f64] {
        &self.0[self.0.len() / 2..]
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&v| v == 0.0)
    }
}

/// A library entry left out of the profile
#[derive(Debug, Clone, Serialize)]
pub struct SkippedEntry {
    pub index: usize,
    pub artist: String,
    pub reason: String,
}

/// Taste vector plus bookkeeping about what went into it
#[derive(Debug, Clone, Serialize)]
pub struct AggregationReport {
    pub taste: TasteVector,
    pub artists: usize,
    pub tracks_used: usize,
    pub skipped: Vec<SkippedEntry>,
}

/// Reduces a user's library to a taste vector
pub struct ProfileAggregator {
    codec: FingerprintCodec,
}

impl ProfileAggregator {
    pub fn new(config: &FeatureConfig) -> Self {
        Self {
            codec: FingerprintCodec::new(config.n_coefficients),
        }
    }

    pub fn coefficients(&self) -> usize {
        self.codec.coefficients()
    }

    /// Decode and aggregate stored entries; bad entries are skipped
    pub fn aggregate(&self, view: &LibraryView) -> AggregationReport {
        let mut skipped = Vec::new();
        let mut track_means = Vec::with_capacity(view.len());

        for (index, entry) in view.entries().iter().enumerate() {
            let result = self
                .codec
                .decode(&entry.fingerprint)
                .map_err(TasteError::from)
                .and_then(|fp| self.track_mean(&entry.artist, &fp));

            match result {
                Ok(mean) => track_means.push((entry.artist.as_str(), mean)),
                Err(e) => {
                    log::warn!("Skipping library entry {} ({}): {}", index, entry.artist, e);
                    skipped.push(SkippedEntry {
                        index,
                        artist: entry.artist.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.reduce(track_means, skipped)
    }

    /// Aggregate already-decoded fingerprints, with the same skipping rules
    pub fn aggregate_fingerprints<'a, I>(&self, entries: I) -> AggregationReport
    where
        I: IntoIterator<Item = (&'a str, &'a Fingerprint)>,
    {
        let mut skipped = Vec::new();
        let mut track_means = Vec::new();

        for (index, (artist, fingerprint)) in entries.into_iter().enumerate() {
            match self.track_mean(artist, fingerprint) {
                Ok(mean) => track_means.push((artist, mean)),
                Err(e) => {
                    log::warn!("Skipping fingerprint {} ({}): {}", index, artist, e);
                    skipped.push(SkippedEntry {
                        index,
                        artist: artist.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.reduce(track_means, skipped)
    }

    /// Validate one entry and collapse its frames
    fn track_mean(&self, artist: &str, fingerprint: &Fingerprint) -> TasteResult<Vec<f64>> {
        if artist.trim().is_empty() {
            return Err(TasteError::CorruptFingerprint("empty artist label".into()));
        }
        if fingerprint.coefficients() != self.coefficients() {
            return Err(TasteError::CorruptFingerprint(format!(
                "fingerprint has {} coefficients per frame, expected {}",
                fingerprint.coefficients(),
                self.coefficients()
            )));
        }
        fingerprint.ensure_finite()?;

        Ok(fingerprint.frame_mean())
    }

    fn reduce(&self, track_means: Vec<(&str, Vec<f64>)>, skipped: Vec<SkippedEntry>) -> AggregationReport {
        let d = self.coefficients();
        let tracks_used = track_means.len();

        // Group by exact label, keeping first-seen artist order
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<Vec<Vec<f64>>> = Vec::new();
        for (artist, mean) in track_means {
            let slot = *index.entry(artist).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(mean);
        }

        if groups.is_empty() {
            return AggregationReport {
                taste: TasteVector::zeros(d),
                artists: 0,
                tracks_used,
                skipped,
            };
        }

        let mut mean_profile = vec![0.0; d];
        let mut variance_profile = vec![0.0; d];
        for tracks in &groups {
            let (artist_mean, artist_variance) = mean_and_variance(tracks, d);
            add_assign(&mut mean_profile, &artist_mean);
            add_assign(&mut variance_profile, &artist_variance);
        }

        let n_artists = groups.len() as f64;
        mean_profile.iter_mut().for_each(|v| *v /= n_artists);
        variance_profile.iter_mut().for_each(|v| *v /= n_artists);

        log::debug!(
            "Aggregated {} tracks across {} artists ({} skipped)",
            tracks_used,
            groups.len(),
            skipped.len()
        );

        AggregationReport {
            taste: TasteVector::from_parts(mean_profile, variance_profile),
            artists: groups.len(),
            tracks_used,
            skipped,
        }
    }
}

/// Element-wise mean and population variance (denominator = count)
fn mean_and_variance(vectors: &[Vec<f64>], d: usize) -> (Vec<f64>, Vec<f64>) {
    let n = vectors.len() as f64;

    let mut mean = vec![0.0; d];
    for v in vectors {
        add_assign(&mut mean, v);
    }
    mean.iter_mut().for_each(|m| *m /= n);

    let mut variance = vec![0.0; d];
    for v in vectors {
        for ((acc, x), m) in variance.iter_mut().zip(v).zip(&mean) {
            *acc += (x - m).powi(2);
        }
    }
    variance.iter_mut().for_each(|s| *s /= n);

    (mean, variance)
}

fn add_assign(acc: &mut [f64], values: &[f64]) {
    for (a, v) in acc.iter_mut().zip(values) {
        *a += v;
    }
}

/// Taste vector for one library snapshot
pub fn compute_taste_vector(view: &LibraryView, config: &FeatureConfig) -> TasteVector {
    ProfileAggregator::new(config).aggregate(view).taste
}
