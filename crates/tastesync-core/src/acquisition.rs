//! Boundary between track acquisition and the fingerprint pipeline
//!
//! Whatever fetched the audio hands over an explicit `AcquiredTrack`;
//! only the `Track` variant carries samples into extraction.

use crate::audio::{decode_audio, AudioData};
use crate::config::FeatureConfig;
use crate::library::NewLibraryEntry;
use crate::mfcc::FeatureExtractor;
use anyhow::Result;
use std::path::Path;

/// Decoded audio plus the catalogue metadata it was fetched with
#[derive(Debug, Clone)]
pub struct TrackAudio {
    pub title: String,
    pub artists: Vec<String>,
    pub original_filename: String,
    pub audio: AudioData,
}

impl TrackAudio {
    /// Artist label used for grouping: the first listed artist
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists
            .iter()
            .map(|a| a.trim())
            .find(|a| !a.is_empty())
    }
}

/// Outcome of acquiring a track
#[derive(Debug, Clone)]
pub enum AcquiredTrack {
    Track(TrackAudio),
    NotFound { query: String },
    Error { query: String, reason: String },
}

/// Acquire a track from a local audio file
pub fn acquire_local(path: &Path, title: &str, artists: &[String]) -> AcquiredTrack {
    let query = path.display().to_string();

    if !path.exists() {
        return AcquiredTrack::NotFound { query };
    }

    match decode_audio(path) {
        Ok(audio) => AcquiredTrack::Track(TrackAudio {
            title: title.to_string(),
            artists: artists.to_vec(),
            original_filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            audio,
        }),
        Err(e) => AcquiredTrack::Error {
            query,
            reason: format!("{:#}", e),
        },
    }
}

/// Turn an acquired track into a persistable library entry.
///
/// CPU-bound; callers inside an async runtime should run it on a blocking
/// worker.
pub fn ingest(acquired: AcquiredTrack, config: &FeatureConfig) -> Result<NewLibraryEntry> {
    let track = match acquired {
        AcquiredTrack::Track(track) => track,
        AcquiredTrack::NotFound { query } => anyhow::bail!("Track not found: {}", query),
        AcquiredTrack::Error { query, reason } => {
            anyhow::bail!("Failed to acquire {}: {}", query, reason)
        }
    };

    let artist = track
        .primary_artist()
        .ok_or_else(|| anyhow::anyhow!("Track '{}' has no artist label", track.title))?
        .to_string();

    let mono = track.audio.to_mono();
    let extractor = FeatureExtractor::new(config)?;
    let fingerprint = extractor.extract(&mono, track.audio.sample_rate)?;

    log::info!(
        "Fingerprinted '{}' by {}: {} frames @ {}Hz",
        track.title,
        artist,
        fingerprint.num_frames(),
        track.audio.sample_rate
    );

    Ok(NewLibraryEntry {
        title: track.title,
        artist,
        fingerprint: tastesync_fp::encode(&fingerprint),
        num_frames: fingerprint.num_frames(),
        sample_rate: track.audio.sample_rate,
        original_filename: track.original_filename,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TasteError;

    fn track(artists: &[&str], samples: Vec<f32>) -> AcquiredTrack {
        AcquiredTrack::Track(TrackAudio {
            title: "Song".to_string(),
            artists: artists.iter().map(|a| a.to_string()).collect(),
            original_filename: "song.wav".to_string(),
            audio: AudioData::new(samples, 22050, 1),
        })
    }

    #[test]
    fn test_ingest_uses_first_artist() {
        let samples: Vec<f32> = (0..4096).map(|i| ((i % 64) as f32 / 64.0) - 0.5).collect();
        let entry = ingest(track(&["  ", "Björk", "Thom Yorke"], samples), &FeatureConfig::default()).unwrap();

        assert_eq!(entry.artist, "Björk");
        assert_eq!(entry.num_frames, 1 + 4096 / 512);
        assert_eq!(entry.fingerprint.len(), entry.num_frames * 20 * 4);
        assert_eq!(entry.sample_rate, 22050);
    }

    #[test]
    fn test_ingest_rejects_missing_artist() {
        let err = ingest(track(&[], vec![0.1; 100]), &FeatureConfig::default()).unwrap_err();
        assert!(err.to_string().contains("no artist"));
    }

    #[test]
    fn test_ingest_surfaces_unreadable_audio() {
        let err = ingest(track(&["A"], vec![]), &FeatureConfig::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TasteError>(),
            Some(TasteError::UnreadableAudio(_))
        ));
    }

    #[test]
    fn test_not_found_and_error_variants() {
        let config = FeatureConfig::default();
        let missing = acquire_local(Path::new("/no/such/track.mp3"), "x", &["y".to_string()]);
        assert!(matches!(missing, AcquiredTrack::NotFound { .. }));
        assert!(ingest(missing, &config).unwrap_err().to_string().contains("not found"));

        let failed = AcquiredTrack::Error {
            query: "q".into(),
            reason: "HTTP 404".into(),
        };
        assert!(ingest(failed, &config).unwrap_err().to_string().contains("HTTP 404"));
    }
}
