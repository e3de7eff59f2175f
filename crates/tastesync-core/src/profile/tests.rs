//! Tests for taste vector aggregation

use super::*;
use crate::library::StoredFingerprint;
use approx::assert_relative_eq;

fn config(d: usize) -> FeatureConfig {
    FeatureConfig {
        n_coefficients: d,
        ..FeatureConfig::default()
    }
}

fn fingerprint(frames: &[&[f32]]) -> Fingerprint {
    let d = frames[0].len();
    Fingerprint::from_frames(frames.iter().map(|f| f.to_vec()).collect(), d).unwrap()
}

fn stored(artist: &str, frames: &[&[f32]]) -> StoredFingerprint {
    StoredFingerprint::new(artist, tastesync_fp::encode(&fingerprint(frames)))
}

#[test]
fn test_empty_library_is_zero_vector() {
    for d in [1, 2, 13, 20] {
        let taste = compute_taste_vector(&LibraryView::empty(), &config(d));
        assert_eq!(taste.len(), 2 * d);
        assert!(taste.is_zero());
    }
}

#[test]
fn test_two_tracks_one_artist() {
    // Track means (1,1) and (3,3)
    let view = LibraryView::new(vec![
        stored("A", &[&[0.0, 0.0], &[2.0, 2.0]]),
        stored("A", &[&[3.0, 3.0]]),
    ]);

    let report = ProfileAggregator::new(&config(2)).aggregate(&view);
    assert_eq!(report.taste.as_slice(), &[2.0, 2.0, 1.0, 1.0]);
    assert_eq!(report.taste.mean_profile(), &[2.0, 2.0]);
    assert_eq!(report.taste.variance_profile(), &[1.0, 1.0]);
    assert_eq!(report.artists, 1);
    assert_eq!(report.tracks_used, 2);
    assert!(report.skipped.is_empty());
}

#[test]
fn test_single_track_has_zero_variance() {
    let view = LibraryView::new(vec![stored("Solo", &[&[4.0, -1.0, 2.5], &[2.0, 1.0, 0.5]])]);
    let taste = compute_taste_vector(&view, &config(3));

    assert_eq!(taste.mean_profile(), &[3.0, 0.0, 1.5]);
    assert_eq!(taste.variance_profile(), &[0.0, 0.0, 0.0]);
}

#[test]
fn test_prolific_artist_does_not_dominate() {
    let heavy = LibraryView::new(
        (0..10)
            .map(|_| stored("X", &[&[5.0, 1.0]]))
            .collect(),
    );
    let light = LibraryView::new(vec![stored("X", &[&[5.0, 1.0]])]);

    let heavy_taste = compute_taste_vector(&heavy, &config(2));
    let light_taste = compute_taste_vector(&light, &config(2));
    assert_eq!(heavy_taste.mean_profile(), light_taste.mean_profile());
    assert_eq!(heavy_taste, light_taste);
}

#[test]
fn test_artists_weighted_equally() {
    let view = LibraryView::new(vec![
        stored("X", &[&[10.0, 10.0]]),
        stored("X", &[&[10.0, 10.0]]),
        stored("X", &[&[10.0, 10.0]]),
        stored("Y", &[&[0.0, 0.0]]),
    ]);

    let taste = compute_taste_vector(&view, &config(2));
    // Per-track weighting would give 7.5
    assert_eq!(taste.mean_profile(), &[5.0, 5.0]);
}

#[test]
fn test_variance_profile_averages_artists() {
    let view = LibraryView::new(vec![
        stored("A", &[&[1.0, 1.0]]),
        stored("B", &[&[5.0, 5.0]]),
        stored("A", &[&[3.0, 3.0]]),
    ]);

    let report = ProfileAggregator::new(&config(2)).aggregate(&view);
    assert_eq!(report.artists, 2);
    assert_eq!(report.taste.mean_profile(), &[3.5, 3.5]);
    assert_eq!(report.taste.variance_profile(), &[0.5, 0.5]);
}

#[test]
fn test_corrupt_entry_is_skipped() {
    let good = stored("A", &[&[1.0, 2.0]]);
    let view = LibraryView::new(vec![
        good.clone(),
        StoredFingerprint::new("B", vec![0u8; 7]),
        StoredFingerprint::new("C", Vec::new()),
    ]);

    let report = ProfileAggregator::new(&config(2)).aggregate(&view);
    assert_eq!(report.tracks_used, 1);
    assert_eq!(report.skipped.len(), 2);
    assert_eq!(report.skipped[0].index, 1);
    assert_eq!(report.skipped[0].artist, "B");
    assert!(report.skipped[0].reason.contains("corrupt"));

    let clean = compute_taste_vector(&LibraryView::new(vec![good]), &config(2));
    assert_eq!(report.taste, clean);
}

#[test]
fn test_non_finite_entry_is_skipped() {
    let view = LibraryView::new(vec![
        stored("A", &[&[1.0, f32::NAN]]),
        stored("A", &[&[2.0, 4.0]]),
    ]);

    let report = ProfileAggregator::new(&config(2)).aggregate(&view);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].reason.contains("invalid fingerprint data"));
    assert_eq!(report.taste.as_slice(), &[2.0, 4.0, 0.0, 0.0]);
}

#[test]
fn test_blank_artist_is_skipped() {
    let view = LibraryView::new(vec![stored("  ", &[&[1.0, 1.0]]), stored("A", &[&[3.0, 1.0]])]);
    let report = ProfileAggregator::new(&config(2)).aggregate(&view);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.artists, 1);
    assert_eq!(report.taste.mean_profile(), &[3.0, 1.0]);
}

#[test]
fn test_all_entries_bad_gives_zero_vector() {
    let view = LibraryView::new(vec![StoredFingerprint::new("A", vec![1, 2, 3])]);
    let report = ProfileAggregator::new(&config(20)).aggregate(&view);
    assert!(report.taste.is_zero());
    assert_eq!(report.taste.len(), 40);
    assert_eq!(report.skipped.len(), 1);
}

#[test]
fn test_decoded_fingerprints_with_wrong_dimension_are_skipped() {
    let two = fingerprint(&[&[1.0, 1.0]]);
    let three = fingerprint(&[&[1.0, 1.0, 1.0]]);

    let report = ProfileAggregator::new(&config(2))
        .aggregate_fingerprints([("A", &two), ("B", &three)]);
    assert_eq!(report.tracks_used, 1);
    assert_eq!(report.skipped[0].artist, "B");
    assert_eq!(report.taste.as_slice(), &[1.0, 1.0, 0.0, 0.0]);
}

#[test]
fn test_fractional_means() {
    let view = LibraryView::new(vec![
        stored("A", &[&[0.1, -0.2], &[0.3, 0.4]]),
        stored("A", &[&[0.5, 0.0]]),
    ]);

    let taste = compute_taste_vector(&view, &config(2));
    // Track means (0.2, 0.1) and (0.5, 0.0)
    assert_relative_eq!(taste.as_slice()[0], 0.35, max_relative = 1e-6);
    assert_relative_eq!(taste.as_slice()[1], 0.05, max_relative = 1e-6);
    assert_relative_eq!(taste.as_slice()[2], 0.0225, max_relative = 1e-5);
    assert_relative_eq!(taste.as_slice()[3], 0.0025, max_relative = 1e-5);
}
