//! # Durable Storage
//!
//! String-keyed, string-valued storage for the saved collection, in the
//! spirit of browser localStorage. The whole collection is one value, written
//! in a single atomic replace.
//!
//! - [`MemoryStore`] - in-process map
//! - [`FileStore`] - one `<key>.json` file per key in a directory, with:
//!   - **Atomic writes**: write to .tmp, fsync, rename
//!   - **Exclusive lock**: one live process owns the directory at a time
//!
//! ## Example
//!
//! ```rust,no_run
//! use spoke_core::storage::{load_collection, FileStore};
//! use std::path::Path;
//!
//! let store = FileStore::open(Path::new("/tmp/spokecalc"), "me@example.com")?;
//! let saved = load_collection(&store)?;
//! println!("{} saved calculations", saved.len());
//! # Ok::<(), spoke_core::errors::CalcError>(())
//! ```

use std::collections::HashMap;
#[cfg(not(target_arch = "wasm32"))]
use std::fs::{self, File, OpenOptions};
#[cfg(not(target_arch = "wasm32"))]
use std::io::Write;
#[cfg(not(target_arch = "wasm32"))]
use std::path::{Path, PathBuf};

#[cfg(not(target_arch = "wasm32"))]
use chrono::{DateTime, Utc};
#[cfg(not(target_arch = "wasm32"))]
use fs2::FileExt;
#[cfg(not(target_arch = "wasm32"))]
use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::saved::SavedCollection;

/// Key under which the saved collection is stored
pub const SAVED_CALCULATIONS_KEY: &str = "spokeCalculations";

/// Minimal key-value storage.
pub trait KeyValueStore {
    /// Value for `key`, or `None` if never written
    fn get(&self, key: &str) -> CalcResult<Option<String>>;

    /// Replace the value for `key`
    fn set(&mut self, key: &str, value: &str) -> CalcResult<()>;
}

/// Read the saved collection. A missing key is an empty collection.
pub fn load_collection(store: &dyn KeyValueStore) -> CalcResult<SavedCollection> {
    match store.get(SAVED_CALCULATIONS_KEY)? {
        None => Ok(SavedCollection::new()),
        Some(json) => serde_json::from_str(&json).map_err(|e| {
            CalcError::serialization(format!("Invalid saved calculations: {}", e))
        }),
    }
}

/// Write the whole saved collection.
pub fn persist_collection(store: &mut dyn KeyValueStore, collection: &SavedCollection) -> CalcResult<()> {
    let json = serde_json::to_string_pretty(collection)
        .map_err(|e| CalcError::serialization(e.to_string()))?;
    store.set(SAVED_CALCULATIONS_KEY, &json)?;
    tracing::debug!(entries = collection.len(), "persisted saved calculations");
    Ok(())
}

/// In-memory store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> CalcResult<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> CalcResult<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Lock metadata stored in the store's `.lock` file
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// User identifier (email or username)
    pub user_id: String,
    /// Machine name where lock was acquired
    pub machine: String,
    /// Process ID that holds the lock
    pub pid: u32,
    /// When the lock was acquired
    pub locked_at: DateTime<Utc>,
}

#[cfg(not(target_arch = "wasm32"))]
impl LockInfo {
    /// Create new lock info for the current process
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::env::var("HOST").ok())
    }
}

/// Lock file name inside the store directory
#[cfg(not(target_arch = "wasm32"))]
const LOCK_FILE_NAME: &str = ".spokecalc.lock";

/// Directory-backed store.
///
/// Holds an OS-level exclusive lock (fs2) on `.spokecalc.lock` for as long as
/// it lives, so all writes to the collection go through a single owner. The
/// lock file also records who holds it, for the error shown to a second
/// process.
#[cfg(not(target_arch = "wasm32"))]
pub struct FileStore {
    dir: PathBuf,
    /// Holds the OS lock
    lock_file: File,
    pub lock_info: LockInfo,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileStore {
    /// Open (creating if needed) the store in `dir` and take its lock.
    ///
    /// # Returns
    ///
    /// * `Ok(FileStore)` - Lock acquired
    /// * `Err(CalcError::FileLocked)` - Another live process holds the store
    /// * `Err(CalcError::FileError)` - Directory or lock file could not be created
    pub fn open(dir: &Path, user_id: impl Into<String>) -> CalcResult<Self> {
        fs::create_dir_all(dir)
            .map_err(|e| CalcError::file_error("create directory", dir.display().to_string(), e.to_string()))?;

        let lock_path = dir.join(LOCK_FILE_NAME);
        let info = LockInfo::new(user_id);

        let mut lock_file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| CalcError::file_error("create lock", lock_path.display().to_string(), e.to_string()))?;

        // The OS lock decides ownership; the metadata only names the holder.
        if lock_file.try_lock_exclusive().is_err() {
            return Err(match read_lock_info(&lock_path) {
                Some(holder) => CalcError::file_locked(
                    dir.display().to_string(),
                    format!("{} ({}, pid {})", holder.user_id, holder.machine, holder.pid),
                    holder.locked_at.to_rfc3339(),
                ),
                None => CalcError::file_locked(dir.display().to_string(), "another process", "unknown"),
            });
        }

        if let Some(previous) = read_lock_info(&lock_path) {
            tracing::info!(pid = previous.pid, machine = %previous.machine, "replacing lock left by exited process");
        }

        let lock_json =
            serde_json::to_string_pretty(&info).map_err(|e| CalcError::serialization(e.to_string()))?;
        lock_file
            .set_len(0)
            .and_then(|_| lock_file.write_all(lock_json.as_bytes()))
            .and_then(|_| lock_file.sync_all())
            .map_err(|e| CalcError::file_error("write lock", lock_path.display().to_string(), e.to_string()))?;

        tracing::debug!(dir = %dir.display(), "opened file store");
        Ok(FileStore {
            dir: dir.to_path_buf(),
            lock_file,
            lock_info: info,
        })
    }

    /// Directory holding the store
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> CalcResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(CalcError::invalid_input("key", key, "Storage keys are [A-Za-z0-9_-]+"));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Drop for FileStore {
    fn drop(&mut self) {
        // The file stays so every opener locks the same inode; the OS lock
        // is released with the handle.
        let _ = self.lock_file.set_len(0);
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> CalcResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CalcError::file_error("read", path.display().to_string(), e.to_string())),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> CalcResult<()> {
        let path = self.path_for(key)?;
        write_atomic(&path, value.as_bytes())
    }
}

/// Write a file with atomic replace semantics.
///
/// 1. Write to a sibling `.tmp` file
/// 2. Sync to disk (fsync)
/// 3. Rename over the target (atomic on most filesystems)
#[cfg(not(target_arch = "wasm32"))]
pub fn write_atomic(path: &Path, contents: &[u8]) -> CalcResult<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let mut tmp_file = File::create(&tmp_path).map_err(|e| {
        CalcError::file_error("create temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.write_all(contents).map_err(|e| {
        CalcError::file_error("write temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.sync_all().map_err(|e| {
        CalcError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        CalcError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn read_lock_info(lock_path: &Path) -> Option<LockInfo> {
    let contents = fs::read_to_string(lock_path).ok()?;
    serde_json::from_str(&contents).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::CalculationResult;
    use crate::inputs::CalculationInputs;

    fn one_entry() -> SavedCollection {
        let mut collection = SavedCollection::new();
        collection
            .add("Front", &CalculationInputs::default(), &CalculationResult::both(287.9, 286.5))
            .unwrap();
        collection
    }

    #[test]
    fn test_missing_key_is_empty_collection() {
        let store = MemoryStore::new();
        assert!(load_collection(&store).unwrap().is_empty());
    }

    #[test]
    fn test_memory_roundtrip() {
        let mut store = MemoryStore::new();
        let collection = one_entry();
        persist_collection(&mut store, &collection).unwrap();
        assert_eq!(load_collection(&store).unwrap(), collection);
    }

    #[test]
    fn test_corrupt_value_is_serialization_error() {
        let mut store = MemoryStore::new();
        store.set(SAVED_CALCULATIONS_KEY, "{not json").unwrap();
        assert!(matches!(
            load_collection(&store),
            Err(CalcError::SerializationError { .. })
        ));
        // stored data untouched
        assert_eq!(store.get(SAVED_CALCULATIONS_KEY).unwrap().as_deref(), Some("{not json"));
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let collection = one_entry();
        {
            let mut store = FileStore::open(dir.path(), "test@example.com").unwrap();
            persist_collection(&mut store, &collection).unwrap();
            assert!(dir.path().join("spokeCalculations.json").exists());
            assert!(!dir.path().join("spokeCalculations.json.tmp").exists());
        }
        let store = FileStore::open(dir.path(), "test@example.com").unwrap();
        assert_eq!(load_collection(&store).unwrap(), collection);
    }

    #[test]
    fn test_file_store_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let first = FileStore::open(dir.path(), "first@example.com").unwrap();
        assert_eq!(first.lock_info.user_id, "first@example.com");

        let second = FileStore::open(dir.path(), "second@example.com");
        assert!(matches!(second, Err(CalcError::FileLocked { .. })));

        drop(first);
        assert!(read_lock_info(&dir.path().join(LOCK_FILE_NAME)).is_none());
        assert!(FileStore::open(dir.path(), "second@example.com").is_ok());
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path(), "t").unwrap();
        assert!(store.set("../escape", "x").is_err());
        assert!(store.get("").is_err());
    }

    #[test]
    fn test_lock_left_by_killed_process_is_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let left_behind = LockInfo {
            user_id: "ghost".to_string(),
            machine: "another-machine".to_string(),
            pid: 999_999,
            locked_at: Utc::now(),
        };
        fs::write(
            dir.path().join(LOCK_FILE_NAME),
            serde_json::to_string(&left_behind).unwrap(),
        )
        .unwrap();

        let store = FileStore::open(dir.path(), "me").unwrap();
        let on_disk = read_lock_info(&dir.path().join(LOCK_FILE_NAME)).unwrap();
        assert_eq!(on_disk.user_id, "me");
        assert_eq!(on_disk.pid, std::process::id());
        assert_eq!(store.lock_info.user_id, "me");
    }

    #[test]
    fn test_locked_error_names_holder() {
        let dir = tempfile::tempdir().unwrap();
        let _first = FileStore::open(dir.path(), "first@example.com").unwrap();
        match FileStore::open(dir.path(), "second@example.com") {
            Err(CalcError::FileLocked { locked_by, .. }) => {
                assert!(locked_by.starts_with("first@example.com"), "{}", locked_by);
            }
            other => panic!("expected FileLocked, got {:?}", other.err()),
        }
    }
}
