//! Library store trait and implementations
//!
//! Provides an abstraction over where user libraries live (filesystem, PostgreSQL)

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::FeatureConfig;
use crate::library::{LibraryEntrySummary, LibraryView, NewLibraryEntry, StoredFingerprint, UserRecord};
use crate::storage_config::{FilesystemConfig, PostgresqlConfig, StorageBackend, TasteSyncConfig};
use tastesync_fp::{Fingerprint, FpFile, FpMetadata, FpReader, FpWriter};

const USER_FILE: &str = "user.json";
const ENTRY_EXTENSION: &str = "tsfp";

/// Abstract library store
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Register a user, or return the existing record. A supplied chat id
    /// replaces the stored one.
    async fn ensure_user(&self, username: &str, chat_id: Option<i64>) -> Result<UserRecord>;

    /// Look up a user by name
    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>>;

    /// All known users, ordered by name
    async fn list_users(&self) -> Result<Vec<UserRecord>>;

    /// Append an entry to a user's library, returning its id
    async fn add_entry(&self, username: &str, entry: &NewLibraryEntry) -> Result<i64>;

    /// Entry summaries in store order
    async fn list_entries(&self, username: &str) -> Result<Vec<LibraryEntrySummary>>;

    /// Full entries in store order, used to copy libraries between stores
    async fn export_entries(&self, username: &str) -> Result<Vec<NewLibraryEntry>>;

    /// Snapshot of (artist, fingerprint) pairs for aggregation
    async fn library_view(&self, username: &str) -> Result<LibraryView>;

    /// Number of entries in a user's library
    async fn track_count(&self, username: &str) -> Result<usize>;

    /// Remove one entry. Returns false if it did not exist.
    async fn remove_entry(&self, username: &str, entry_id: i64) -> Result<bool>;
}

/// Open the store selected by `[storage] backend`
pub async fn open_store(config: &TasteSyncConfig) -> Result<Box<dyn LibraryStore>> {
    match config.storage.backend {
        StorageBackend::Filesystem => {
            log::info!(
                "Using filesystem library at {}",
                config.storage.filesystem.base_directory
            );
            Ok(Box::new(FilesystemStore::new(
                &config.storage.filesystem,
                &config.features,
            )?))
        }
        StorageBackend::Postgresql => {
            log::info!(
                "Using PostgreSQL library at {}:{}/{}",
                config.storage.postgresql.host,
                config.storage.postgresql.port,
                config.storage.postgresql.database
            );
            Ok(Box::new(
                PostgresStore::new(&config.storage.postgresql, &config.features).await?,
            ))
        }
    }
}

/// Decode an entry's payload with the configured coefficient count
fn decode_entry(entry: &NewLibraryEntry, coefficients: usize) -> Result<Fingerprint> {
    let fingerprint = tastesync_fp::decode(&entry.fingerprint, coefficients)
        .with_context(|| format!("Invalid fingerprint for '{}'", entry.title))?;

    if entry.artist.trim().is_empty() {
        anyhow::bail!("Entry '{}' has no artist label", entry.title);
    }
    Ok(fingerprint)
}

/// `user.json` contents
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserFile {
    #[serde(flatten)]
    user: UserRecord,
    #[serde(default = "first_entry_id")]
    next_entry_id: i64,
}

fn first_entry_id() -> i64 {
    1
}

/// Filesystem-based library store.
///
/// Layout: `<base>/<username>/user.json` plus one `<id>.tsfp` per entry.
pub struct FilesystemStore {
    base_dir: PathBuf,
    features: FeatureConfig,
    write_lock: Mutex<()>,
}

impl FilesystemStore {
    /// Create a new filesystem store, creating the base directory if needed
    pub fn new(config: &FilesystemConfig, features: &FeatureConfig) -> Result<Self> {
        Self::from_path(Path::new(&config.base_directory), features)
    }

    /// Create from directory path
    pub fn from_path(base_dir: &Path, features: &FeatureConfig) -> Result<Self> {
        features.validate()?;
        std::fs::create_dir_all(base_dir)
            .with_context(|| format!("Failed to create library directory {}", base_dir.display()))?;

        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            features: features.clone(),
            write_lock: Mutex::new(()),
        })
    }

    fn user_dir(&self, username: &str) -> Result<PathBuf> {
        let valid = !username.is_empty()
            && !username.starts_with('.')
            && !username.contains(['/', '\\', '\0']);
        if !valid {
            anyhow::bail!("Invalid username for filesystem store: {:?}", username);
        }
        Ok(self.base_dir.join(username))
    }

    fn read_user_file(&self, username: &str) -> Result<Option<UserFile>> {
        let path = self.user_dir(username)?.join(USER_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let user_file = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(user_file))
    }

    fn write_user_file(&self, user_file: &UserFile) -> Result<()> {
        let dir = self.user_dir(&user_file.user.username)?;
        std::fs::create_dir_all(&dir)?;

        let path = dir.join(USER_FILE);
        let json = serde_json::to_string_pretty(user_file)?;
        std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    fn require_user(&self, username: &str) -> Result<UserFile> {
        self.read_user_file(username)?
            .ok_or_else(|| anyhow::anyhow!("Unknown user: {}", username))
    }

    fn entry_path(&self, username: &str, entry_id: i64) -> Result<PathBuf> {
        Ok(self
            .user_dir(username)?
            .join(format!("{}.{}", entry_id, ENTRY_EXTENSION)))
    }

    /// Entry ids present on disk, ascending
    fn entry_ids(&self, username: &str) -> Result<Vec<i64>> {
        self.require_user(username)?;
        let dir = self.user_dir(username)?;

        let mut ids: Vec<i64> = std::fs::read_dir(&dir)
            .with_context(|| format!("Failed to list {}", dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .map(|ext| ext == ENTRY_EXTENSION)
                    .unwrap_or(false)
            })
            .filter_map(|path| path.file_stem()?.to_str()?.parse().ok())
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Load every readable entry; unreadable files are skipped
    async fn load_entries(&self, username: &str) -> Result<Vec<(i64, FpFile)>> {
        let coefficients = self.features.n_coefficients;
        let paths: Vec<(i64, PathBuf)> = self
            .entry_ids(username)?
            .into_iter()
            .map(|id| self.entry_path(username, id).map(|path| (id, path)))
            .collect::<Result<_>>()?;
        let total = paths.len();

        // File reads and the rayon fan-out run on the blocking pool
        let loaded = tokio::task::spawn_blocking(move || read_entries(&paths, coefficients))
            .await
            .context("Library loader panicked")?;

        log::debug!("Loaded {}/{} entries for {}", loaded.len(), total, username);
        Ok(loaded)
    }
}

/// Read `.tsfp` files in parallel, keeping input order and dropping the unreadable ones
fn read_entries(paths: &[(i64, PathBuf)], coefficients: usize) -> Vec<(i64, FpFile)> {
    use rayon::prelude::*;

    paths
        .par_iter()
        .filter_map(|(id, path)| match FpReader::read(path, coefficients) {
            Ok(fp_file) => Some((*id, fp_file)),
            Err(e) => {
                log::warn!("Skipping library entry {}: {:#}", path.display(), e);
                None
            }
        })
        .collect()
}

#[async_trait]
impl LibraryStore for FilesystemStore {
    async fn ensure_user(&self, username: &str, chat_id: Option<i64>) -> Result<UserRecord> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("Library write lock poisoned"))?;

        let user_file = match self.read_user_file(username)? {
            Some(mut existing) => {
                if chat_id.is_some() && existing.user.chat_id != chat_id {
                    existing.user.chat_id = chat_id;
                    self.write_user_file(&existing)?;
                }
                existing
            }
            None => {
                let created = UserFile {
                    user: UserRecord {
                        username: username.to_string(),
                        chat_id,
                    },
                    next_entry_id: first_entry_id(),
                };
                self.write_user_file(&created)?;
                log::info!("Registered user {}", username);
                created
            }
        };

        Ok(user_file.user)
    }

    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self.read_user_file(username)?.map(|f| f.user))
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let mut users = Vec::new();

        for entry in std::fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if !path.join(USER_FILE).is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            match self.read_user_file(name) {
                Ok(Some(user_file)) => users.push(user_file.user),
                Ok(None) => {}
                Err(e) => log::warn!("Skipping user directory {}: {:#}", path.display(), e),
            }
        }

        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn add_entry(&self, username: &str, entry: &NewLibraryEntry) -> Result<i64> {
        let fingerprint = decode_entry(entry, self.features.n_coefficients)?;
        let metadata = FpMetadata::new(
            entry.title.clone(),
            entry.artist.clone(),
            entry.original_filename.clone(),
            serde_json::to_string(&self.features)?,
        );
        let fp_file = FpFile::new(metadata, fingerprint, entry.sample_rate)?;

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("Library write lock poisoned"))?;

        let mut user_file = self.require_user(username)?;
        let entry_id = user_file.next_entry_id;

        FpWriter::new().write(&self.entry_path(username, entry_id)?, &fp_file)?;
        user_file.next_entry_id += 1;
        self.write_user_file(&user_file)?;

        log::debug!("Stored entry {} for {}: '{}'", entry_id, username, entry.title);
        Ok(entry_id)
    }

    async fn list_entries(&self, username: &str) -> Result<Vec<LibraryEntrySummary>> {
        Ok(self
            .load_entries(username)
            .await?
            .into_iter()
            .map(|(id, fp_file)| LibraryEntrySummary {
                id,
                title: fp_file.metadata.title,
                artist: fp_file.metadata.artist,
            })
            .collect())
    }

    async fn export_entries(&self, username: &str) -> Result<Vec<NewLibraryEntry>> {
        Ok(self
            .load_entries(username)
            .await?
            .into_iter()
            .map(|(_, fp_file)| NewLibraryEntry {
                fingerprint: fp_file.payload(),
                num_frames: fp_file.fingerprint.num_frames(),
                sample_rate: fp_file.header.sample_rate,
                title: fp_file.metadata.title,
                artist: fp_file.metadata.artist,
                original_filename: fp_file.metadata.original_filename,
            })
            .collect())
    }

    async fn library_view(&self, username: &str) -> Result<LibraryView> {
        Ok(self
            .load_entries(username)
            .await?
            .into_iter()
            .map(|(_, fp_file)| StoredFingerprint::new(fp_file.metadata.artist.clone(), fp_file.payload()))
            .collect())
    }

    async fn track_count(&self, username: &str) -> Result<usize> {
        Ok(self.entry_ids(username)?.len())
    }

    async fn remove_entry(&self, username: &str, entry_id: i64) -> Result<bool> {
        self.require_user(username)?;
        let path = self.entry_path(username, entry_id)?;

        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to remove {}", path.display()))?;
        Ok(true)
    }
}

/// PostgreSQL-based library store
pub struct PostgresStore {
    pool: deadpool_postgres::Pool,
    coefficients: usize,
}

impl PostgresStore {
    /// Connect, verify the connection and make sure the schema exists
    pub async fn new(config: &PostgresqlConfig, features: &FeatureConfig) -> Result<Self> {
        features.validate()?;
        let pool = tastesync_db::create_pool(&config.db_target())?;

        tastesync_db::verify_server(&pool).await?;
        tastesync_db::init_schema(&pool).await?;

        Ok(Self {
            pool,
            coefficients: features.n_coefficients,
        })
    }

    async fn user_id(&self, username: &str) -> Result<i32> {
        tastesync_db::get_user_by_username(&self.pool, username)
            .await?
            .map(|user| user.id)
            .ok_or_else(|| anyhow::anyhow!("Unknown user: {}", username))
    }
}

fn to_record(user: tastesync_db::User) -> UserRecord {
    UserRecord {
        username: user.username,
        chat_id: user.chat_id,
    }
}

#[async_trait]
impl LibraryStore for PostgresStore {
    async fn ensure_user(&self, username: &str, chat_id: Option<i64>) -> Result<UserRecord> {
        let user = tastesync_db::get_or_create_user(&self.pool, username, chat_id).await?;
        Ok(to_record(user))
    }

    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>> {
        let user = tastesync_db::get_user_by_username(&self.pool, username).await?;
        Ok(user.map(to_record))
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let users = tastesync_db::list_users(&self.pool).await?;
        Ok(users.into_iter().map(to_record).collect())
    }

    async fn add_entry(&self, username: &str, entry: &NewLibraryEntry) -> Result<i64> {
        let fingerprint = decode_entry(entry, self.coefficients)?;
        let user_id = self.user_id(username).await?;

        let track = tastesync_db::NewTrack {
            user_id,
            title: entry.title.clone(),
            artist: entry.artist.clone(),
            fingerprint: entry.fingerprint.clone(),
            num_frames: i32::try_from(fingerprint.num_frames())
                .context("Fingerprint has too many frames")?,
            sample_rate: i32::try_from(entry.sample_rate).context("Sample rate out of range")?,
            original_filename: entry.original_filename.clone(),
        };

        tastesync_db::insert_track(&self.pool, &track).await
    }

    async fn list_entries(&self, username: &str) -> Result<Vec<LibraryEntrySummary>> {
        let user_id = self.user_id(username).await?;
        let tracks = tastesync_db::list_user_tracks(&self.pool, user_id).await?;

        Ok(tracks
            .into_iter()
            .map(|t| LibraryEntrySummary {
                id: t.id,
                title: t.title,
                artist: t.artist,
            })
            .collect())
    }

    async fn export_entries(&self, username: &str) -> Result<Vec<NewLibraryEntry>> {
        let user_id = self.user_id(username).await?;
        let tracks = tastesync_db::export_user_tracks(&self.pool, user_id).await?;

        Ok(tracks
            .into_iter()
            .map(|t| NewLibraryEntry {
                title: t.title,
                artist: t.artist,
                fingerprint: t.fingerprint,
                num_frames: t.num_frames.max(0) as usize,
                sample_rate: t.sample_rate.max(0) as u32,
                original_filename: t.original_filename,
            })
            .collect())
    }

    async fn library_view(&self, username: &str) -> Result<LibraryView> {
        let user_id = self.user_id(username).await?;
        let rows = tastesync_db::get_user_tracks(&self.pool, user_id).await?;

        Ok(rows
            .into_iter()
            .map(|row| StoredFingerprint::new(row.artist, row.fingerprint))
            .collect())
    }

    async fn track_count(&self, username: &str) -> Result<usize> {
        let user_id = self.user_id(username).await?;
        let count = tastesync_db::get_user_track_count(&self.pool, user_id).await?;
        Ok(count.max(0) as usize)
    }

    async fn remove_entry(&self, username: &str, entry_id: i64) -> Result<bool> {
        let user_id = self.user_id(username).await?;
        tastesync_db::delete_track(&self.pool, user_id, entry_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileAggregator;
    use tempfile::TempDir;

    fn features() -> FeatureConfig {
        FeatureConfig {
            n_coefficients: 2,
            ..FeatureConfig::default()
        }
    }

    fn store() -> (TempDir, FilesystemStore) {
        let dir = TempDir::new().unwrap();
        let store = FilesystemStore::from_path(dir.path(), &features()).unwrap();
        (dir, store)
    }

    fn entry(title: &str, artist: &str, frames: &[[f32; 2]]) -> NewLibraryEntry {
        let flat: Vec<f32> = frames.iter().flatten().copied().collect();
        let fingerprint = Fingerprint::from_flat(flat, 2).unwrap();
        NewLibraryEntry {
            title: title.to_string(),
            artist: artist.to_string(),
            fingerprint: tastesync_fp::encode(&fingerprint),
            num_frames: fingerprint.num_frames(),
            sample_rate: 22050,
            original_filename: format!("{}.mp3", title),
        }
    }

    #[tokio::test]
    async fn test_ensure_user_is_idempotent() {
        let (_dir, store) = store();

        let created = store.ensure_user("alice", Some(7)).await.unwrap();
        let again = store.ensure_user("alice", None).await.unwrap();
        assert_eq!(created, again);
        assert_eq!(again.chat_id, Some(7));

        let updated = store.ensure_user("alice", Some(8)).await.unwrap();
        assert_eq!(updated.chat_id, Some(8));

        store.ensure_user("bob", None).await.unwrap();
        let names: Vec<_> = store
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, ["alice", "bob"]);
        assert!(store.find_user("carol").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entries_round_trip_in_order() {
        let (_dir, store) = store();
        store.ensure_user("alice", None).await.unwrap();

        let first = store
            .add_entry("alice", &entry("one", "A", &[[2.0, 2.0]]))
            .await
            .unwrap();
        let second = store
            .add_entry("alice", &entry("two", "B", &[[1.0, 3.0], [3.0, 1.0]]))
            .await
            .unwrap();
        assert!(second > first);
        assert_eq!(store.track_count("alice").await.unwrap(), 2);

        let listed = store.list_entries("alice").await.unwrap();
        let titles: Vec<_> = listed.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["one", "two"]);

        let exported = store.export_entries("alice").await.unwrap();
        assert_eq!(exported[1], entry("two", "B", &[[1.0, 3.0], [3.0, 1.0]]));

        let view = store.library_view("alice").await.unwrap();
        let report = ProfileAggregator::new(&features()).aggregate(&view);
        assert_eq!(report.artists, 2);
        assert_eq!(report.taste.as_slice(), &[2.0, 2.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_ids_stay_monotonic_after_removal() {
        let (_dir, store) = store();
        store.ensure_user("alice", None).await.unwrap();

        let first = store.add_entry("alice", &entry("one", "A", &[[1.0, 0.0]])).await.unwrap();
        assert!(store.remove_entry("alice", first).await.unwrap());
        assert!(!store.remove_entry("alice", first).await.unwrap());

        let next = store.add_entry("alice", &entry("two", "A", &[[1.0, 0.0]])).await.unwrap();
        assert!(next > first);
        assert_eq!(store.track_count("alice").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_entry_is_skipped() {
        let (dir, store) = store();
        store.ensure_user("alice", None).await.unwrap();
        store.add_entry("alice", &entry("one", "A", &[[1.0, 1.0]])).await.unwrap();
        std::fs::write(dir.path().join("alice").join("99.tsfp"), b"garbage").unwrap();

        let view = store.library_view("alice").await.unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(view.entries()[0].artist, "A");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_damaged_header_is_skipped_on_worker_runtime() {
        let (dir, store) = store();
        store.ensure_user("alice", None).await.unwrap();
        let id = store.add_entry("alice", &entry("one", "A", &[[1.0, 1.0]])).await.unwrap();
        store.add_entry("alice", &entry("two", "B", &[[2.0, 0.0]])).await.unwrap();

        let user_dir = dir.path().join("alice");
        let mut bytes = std::fs::read(user_dir.join(format!("{}.tsfp", id))).unwrap();
        bytes[24..32].copy_from_slice(&u64::MAX.to_le_bytes());
        std::fs::write(user_dir.join("50.tsfp"), &bytes).unwrap();

        let (view, listed) = tokio::join!(store.library_view("alice"), store.list_entries("alice"));
        assert_eq!(view.unwrap().len(), 2);
        let titles: Vec<_> = listed.unwrap().into_iter().map(|e| e.title).collect();
        assert_eq!(titles, ["one", "two"]);
    }

    #[test]
    fn test_read_entries_keeps_order() {
        let (dir, store) = store();
        let fp = Fingerprint::from_flat(vec![1.0, 2.0], 2).unwrap();
        let mut paths = Vec::new();
        for id in [3, 1, 2] {
            let path = dir.path().join(format!("{}.tsfp", id));
            let metadata = FpMetadata::new(format!("t{}", id), "A".to_string(), String::new(), "{}".to_string());
            FpWriter::new()
                .write(&path, &FpFile::new(metadata, fp.clone(), 22050).unwrap())
                .unwrap();
            paths.push((id, path));
        }
        paths.push((4, dir.path().join("4.tsfp")));

        let loaded = read_entries(&paths, store.features.n_coefficients);
        let ids: Vec<_> = loaded.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, [3, 1, 2]);
        assert_eq!(loaded[0].1.metadata.title, "t3");
    }

    #[tokio::test]
    async fn test_rejects_bad_entries() {
        let (_dir, store) = store();
        store.ensure_user("alice", None).await.unwrap();

        let mut wrong_width = entry("one", "A", &[[1.0, 1.0]]);
        wrong_width.fingerprint.truncate(4);
        assert!(store.add_entry("alice", &wrong_width).await.is_err());

        let blank_artist = entry("two", "  ", &[[1.0, 1.0]]);
        assert!(store.add_entry("alice", &blank_artist).await.is_err());

        assert_eq!(store.track_count("alice").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_user_is_an_error() {
        let (_dir, store) = store();
        assert!(store.library_view("nobody").await.is_err());
        assert!(store.add_entry("nobody", &entry("one", "A", &[[1.0, 1.0]])).await.is_err());
        assert!(store.ensure_user("../escape", None).await.is_err());
    }

    #[tokio::test]
    #[ignore] // Requires PostgreSQL to be running
    async fn test_postgres_store() {
        let config = PostgresqlConfig {
            database: "tastesync_test".to_string(),
            ..PostgresqlConfig::default()
        };
        let store = PostgresStore::new(&config, &features()).await.unwrap();
        store.ensure_user("pg_alice", None).await.unwrap();
        let id = store
            .add_entry("pg_alice", &entry("one", "A", &[[1.0, 1.0]]))
            .await
            .unwrap();
        assert!(store.track_count("pg_alice").await.unwrap() >= 1);
        assert!(store.remove_entry("pg_alice", id).await.unwrap());
    }
}
