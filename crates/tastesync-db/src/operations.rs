use anyhow::{Context, Result};
use deadpool_postgres::Pool;
use tokio_postgres::Row;

use crate::models::*;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id SERIAL PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        chat_id BIGINT UNIQUE
    );

    CREATE TABLE IF NOT EXISTS tracks (
        id BIGSERIAL PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        artist TEXT NOT NULL,
        fingerprint BYTEA NOT NULL,
        num_frames INTEGER NOT NULL,
        sample_rate INTEGER NOT NULL,
        original_filename TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    );

    CREATE INDEX IF NOT EXISTS idx_tracks_user ON tracks (user_id, id);
";

fn user_from_row(r: &Row) -> User {
    User {
        id: r.get(0),
        username: r.get(1),
        chat_id: r.get(2),
    }
}

/// Create the users/tracks tables if they do not exist
pub async fn init_schema(pool: &Pool) -> Result<()> {
    let client = pool.get().await?;

    client
        .batch_execute(SCHEMA)
        .await
        .context("Failed to initialise schema")?;

    Ok(())
}

/// Drop every table and recreate the schema
pub async fn reset_database(pool: &Pool) -> Result<()> {
    {
        let client = pool.get().await?;
        client
            .batch_execute("DROP TABLE IF EXISTS tracks; DROP TABLE IF EXISTS users;")
            .await
            .context("Failed to drop tables")?;
    }
    log::warn!("Dropped users and tracks tables");

    init_schema(pool).await
}

/// Look up a user by name, creating it on first use.
///
/// A known user keeps its chat id unless a new one is supplied.
pub async fn get_or_create_user(pool: &Pool, username: &str, chat_id: Option<i64>) -> Result<User> {
    let client = pool.get().await?;

    let row = client
        .query_one(
            "INSERT INTO users (username, chat_id)
             VALUES ($1, $2)
             ON CONFLICT (username)
             DO UPDATE SET chat_id = COALESCE(EXCLUDED.chat_id, users.chat_id)
             RETURNING id, username, chat_id",
            &[&username, &chat_id],
        )
        .await
        .with_context(|| format!("Failed to get or create user '{}'", username))?;

    Ok(user_from_row(&row))
}

/// Get user by username
pub async fn get_user_by_username(pool: &Pool, username: &str) -> Result<Option<User>> {
    let client = pool.get().await?;

    let row = client
        .query_opt(
            "SELECT id, username, chat_id FROM users WHERE username = $1",
            &[&username],
        )
        .await
        .context("Failed to get user by username")?;

    Ok(row.as_ref().map(user_from_row))
}

/// Get user by chat id
pub async fn get_user_by_chat_id(pool: &Pool, chat_id: i64) -> Result<Option<User>> {
    let client = pool.get().await?;

    let row = client
        .query_opt(
            "SELECT id, username, chat_id FROM users WHERE chat_id = $1",
            &[&chat_id],
        )
        .await
        .context("Failed to get user by chat id")?;

    Ok(row.as_ref().map(user_from_row))
}

/// Get all users ordered by name
pub async fn list_users(pool: &Pool) -> Result<Vec<User>> {
    let client = pool.get().await?;

    let rows = client
        .query("SELECT id, username, chat_id FROM users ORDER BY username", &[])
        .await
        .context("Failed to list users")?;

    Ok(rows.iter().map(user_from_row).collect())
}

/// Insert a track into a user's library, returning its id
pub async fn insert_track(pool: &Pool, track: &NewTrack) -> Result<i64> {
    let client = pool.get().await?;

    let row = client
        .query_one(
            "INSERT INTO tracks
             (user_id, title, artist, fingerprint, num_frames, sample_rate, original_filename)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id",
            &[
                &track.user_id,
                &track.title,
                &track.artist,
                &track.fingerprint,
                &track.num_frames,
                &track.sample_rate,
                &track.original_filename,
            ],
        )
        .await
        .context("Failed to insert track")?;

    Ok(row.get(0))
}

/// Artist labels and fingerprint blobs of a user's tracks, in insertion order
pub async fn get_user_tracks(pool: &Pool, user_id: i32) -> Result<Vec<TrackFingerprint>> {
    let client = pool.get().await?;

    let rows = client
        .query(
            "SELECT artist, fingerprint FROM tracks WHERE user_id = $1 ORDER BY id",
            &[&user_id],
        )
        .await
        .context("Failed to get user tracks")?;

    Ok(rows
        .iter()
        .map(|r| TrackFingerprint {
            artist: r.get(0),
            fingerprint: r.get(1),
        })
        .collect())
}

/// Complete track rows of a user, fingerprints included, in insertion order
pub async fn export_user_tracks(pool: &Pool, user_id: i32) -> Result<Vec<NewTrack>> {
    let client = pool.get().await?;

    let rows = client
        .query(
            "SELECT user_id, title, artist, fingerprint, num_frames, sample_rate, original_filename
             FROM tracks
             WHERE user_id = $1
             ORDER BY id",
            &[&user_id],
        )
        .await
        .context("Failed to export user tracks")?;

    Ok(rows
        .iter()
        .map(|r| NewTrack {
            user_id: r.get(0),
            title: r.get(1),
            artist: r.get(2),
            fingerprint: r.get(3),
            num_frames: r.get(4),
            sample_rate: r.get(5),
            original_filename: r.get(6),
        })
        .collect())
}

/// Track listing for a user without fingerprint payloads
pub async fn list_user_tracks(pool: &Pool, user_id: i32) -> Result<Vec<Track>> {
    let client = pool.get().await?;

    let rows = client
        .query(
            "SELECT id, user_id, title, artist, num_frames, sample_rate, created_at
             FROM tracks
             WHERE user_id = $1
             ORDER BY id",
            &[&user_id],
        )
        .await
        .context("Failed to list user tracks")?;

    Ok(rows
        .iter()
        .map(|r| Track {
            id: r.get(0),
            user_id: r.get(1),
            title: r.get(2),
            artist: r.get(3),
            num_frames: r.get(4),
            sample_rate: r.get(5),
            created_at: r.get(6),
        })
        .collect())
}

/// Number of tracks in a user's library
pub async fn get_user_track_count(pool: &Pool, user_id: i32) -> Result<i64> {
    let client = pool.get().await?;

    let row = client
        .query_one("SELECT COUNT(*) FROM tracks WHERE user_id = $1", &[&user_id])
        .await
        .context("Failed to count user tracks")?;

    Ok(row.get(0))
}

/// Delete one track from a user's library. Returns false if it did not exist.
pub async fn delete_track(pool: &Pool, user_id: i32, track_id: i64) -> Result<bool> {
    let client = pool.get().await?;

    let deleted = client
        .execute(
            "DELETE FROM tracks WHERE id = $1 AND user_id = $2",
            &[&track_id, &user_id],
        )
        .await
        .context("Failed to delete track")?;

    Ok(deleted > 0)
}
