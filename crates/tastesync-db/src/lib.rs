//! TasteSync Database Layer
//!
//! PostgreSQL persistence for users and their fingerprinted track libraries

pub mod connection;
pub mod models;
pub mod operations;

// Re-export commonly used types
pub use connection::{create_pool, verify_server, DbPool, DbTarget, ServerInfo};
pub use models::{NewTrack, Track, TrackFingerprint, User};
pub use operations::{
    delete_track, export_user_tracks, get_or_create_user, get_user_by_chat_id, get_user_by_username,
    get_user_track_count, get_user_tracks, init_schema, insert_track, list_user_tracks,
    list_users, reset_database,
};
