use serde::{Deserialize, Serialize};

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub chat_id: Option<i64>,
}

/// A track in a user's library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub user_id: i32,
    pub title: String,
    pub artist: String,
    pub num_frames: i32,
    pub sample_rate: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Input structure for creating new tracks
#[derive(Debug, Clone)]
pub struct NewTrack {
    pub user_id: i32,
    pub title: String,
    pub artist: String,
    /// Raw fingerprint payload (T × D little-endian f32)
    pub fingerprint: Vec<u8>,
    pub num_frames: i32,
    pub sample_rate: i32,
    pub original_filename: String,
}

/// (artist, fingerprint bytes) row used for aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct TrackFingerprint {
    pub artist: String,
    pub fingerprint: Vec<u8>,
}
