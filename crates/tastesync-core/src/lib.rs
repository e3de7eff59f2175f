//! TasteSync Core - Acoustic Taste Matching Library
//!
//! Turns decoded audio into cepstral fingerprints, aggregates a user's
//! library into a taste vector and scores two users against each other.

pub mod acquisition;
pub mod audio;
pub mod config;
pub mod error;
pub mod library;
pub mod mfcc;
pub mod profile;
pub mod similarity;
pub mod storage_backend;
pub mod storage_config;
pub mod transform;

pub use acquisition::{acquire_local, ingest, AcquiredTrack, TrackAudio};
pub use config::FeatureConfig;
pub use error::{TasteError, TasteResult};
pub use library::{LibraryEntrySummary, LibraryView, NewLibraryEntry, StoredFingerprint, UserRecord};
pub use mfcc::{extract_fingerprint, FeatureExtractor};
pub use profile::{compute_taste_vector, AggregationReport, ProfileAggregator, SkippedEntry, TasteVector};
pub use similarity::{compute_similarity, SimilarityScore};
pub use storage_backend::{open_store, FilesystemStore, LibraryStore, PostgresStore};
pub use storage_config::TasteSyncConfig;

pub use tastesync_fp::Fingerprint;

use std::path::Path;

/// Generate a fingerprint from an audio file.
///
/// Returns the fingerprint and the native sample rate it was computed at.
pub fn generate_fingerprint(
    audio_path: &Path,
    config: &FeatureConfig,
) -> anyhow::Result<(Fingerprint, u32)> {
    // Decode audio
    let audio_data = audio::decode_audio(audio_path)?;

    // Convert to mono samples
    let mono_samples = audio_data.to_mono();

    let fingerprint = FeatureExtractor::new(config)?.extract(&mono_samples, audio_data.sample_rate)?;

    Ok((fingerprint, audio_data.sample_rate))
}

/// Score two users whose libraries are already snapshotted
pub fn match_libraries(
    a: &LibraryView,
    b: &LibraryView,
    config: &FeatureConfig,
) -> TasteResult<SimilarityScore> {
    let aggregator = ProfileAggregator::new(config);
    let taste_a = aggregator.aggregate(a).taste;
    let taste_b = aggregator.aggregate(b).taste;
    compute_similarity(&taste_a, &taste_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library(entries: &[(&str, &[f32])], d: usize) -> LibraryView {
        entries
            .iter()
            .map(|(artist, values)| {
                let fp = Fingerprint::from_flat(values.to_vec(), d).unwrap();
                StoredFingerprint::new(*artist, tastesync_fp::encode(&fp))
            })
            .collect()
    }

    #[test]
    fn test_match_identical_libraries() {
        let config = FeatureConfig {
            n_coefficients: 2,
            ..FeatureConfig::default()
        };
        let a = library(&[("A", &[1.0, 2.0, 3.0, 4.0]), ("B", &[-1.0, 0.5])], 2);
        let score = match_libraries(&a, &a.clone(), &config).unwrap();
        assert_eq!(score.value(), 100.0);
    }

    #[test]
    fn test_match_empty_library_scores_zero() {
        let config = FeatureConfig::default();
        let a = library(&[("A", &[0.5; 20])], 20);
        let score = match_libraries(&a, &LibraryView::empty(), &config).unwrap();
        assert_eq!(score.value(), 0.0);
    }

    #[test]
    fn test_generate_fingerprint_from_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..22050 {
            let t = i as f32 / 22050.0;
            let s = (2.0 * std::f32::consts::PI * 440.0 * t).sin();
            writer.write_sample((s * 16000.0) as i16).unwrap();
        }
        writer.finalize().unwrap();

        let (fp, sample_rate) = generate_fingerprint(&path, &FeatureConfig::default()).unwrap();
        assert_eq!(sample_rate, 22050);
        assert_eq!(fp.coefficients(), 20);
        assert_eq!(fp.num_frames(), 1 + 22050 / 512);
    }
}
