//! Library entries and the read-only per-user view used for aggregation

use serde::{Deserialize, Serialize};

/// A user known to a library store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub chat_id: Option<i64>,
}

/// A library entry ready to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewLibraryEntry {
    pub title: String,
    pub artist: String,
    /// Raw codec payload (T × D little-endian f32)
    pub fingerprint: Vec<u8>,
    pub num_frames: usize,
    pub sample_rate: u32,
    pub original_filename: String,
}

/// Summary of a stored entry, without its fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryEntrySummary {
    pub id: i64,
    pub title: String,
    pub artist: String,
}

/// One stored (artist, fingerprint bytes) pair
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFingerprint {
    pub artist: String,
    pub fingerprint: Vec<u8>,
}

impl StoredFingerprint {
    pub fn new(artist: impl Into<String>, fingerprint: Vec<u8>) -> Self {
        Self {
            artist: artist.into(),
            fingerprint,
        }
    }
}

/// Snapshot of one user's stored fingerprints, in store order.
///
/// The snapshot is taken once by the caller; aggregation never observes
/// entries being added or removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryView {
    entries: Vec<StoredFingerprint>,
}

impl LibraryView {
    pub fn new(entries: Vec<StoredFingerprint>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[StoredFingerprint] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<StoredFingerprint> for LibraryView {
    fn from_iter<I: IntoIterator<Item = StoredFingerprint>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
