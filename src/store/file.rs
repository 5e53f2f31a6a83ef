//! File-backed backend.
//!
//! One JSON file per key, named by a hash of the key. Writes go through a
//! temp file and a rename so a crash never leaves a half-written record.
//! Compare-and-swap runs under an exclusive lock file, which serializes
//! writers across processes sharing the same directory.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use uuid::Uuid;

use crate::error::{ProvflowError, Result};

use super::backend::{precondition_holds, Expect, KvBackend, StoredEntry};

/// How long a writer waits for the lock before giving up.
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Lock files older than this are assumed to belong to a dead process.
const STALE_LOCK_AFTER: Duration = Duration::from_secs(30);

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Directory-of-JSON-files backend.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the backend root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| {
            ProvflowError::persistence(format!(
                "failed to create store directory {:?}: {}",
                self.root, e
            ))
        })
    }

    /// Path of the file holding `key`.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        let hash = Sha256::digest(key.as_bytes());
        self.root.join(format!("{}.json", hex::encode(&hash[..16])))
    }

    fn lock_path(&self) -> PathBuf {
        self.root.join(".lock")
    }

    fn read_entry(path: &Path) -> Result<Option<StoredEntry>> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ProvflowError::persistence(format!(
                    "failed to read {:?}: {}",
                    path, e
                )))
            }
        };
        let entry: StoredEntry = serde_json::from_str(&json)?;
        Ok(Some(entry))
    }

    fn write_entry(&self, entry: &StoredEntry) -> Result<()> {
        let path = self.entry_path(&entry.key);
        let json = serde_json::to_string_pretty(entry)?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json)
            .and_then(|_| fs::rename(&temp_path, &path))
            .map_err(|e| {
                ProvflowError::persistence(format!("failed to write {:?}: {}", path, e))
            })
    }

    fn acquire_lock(&self) -> Result<LockFile> {
        self.ensure_dir()?;
        let path = self.lock_path();
        let deadline = Instant::now() + LOCK_TIMEOUT;

        loop {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(_) => return Ok(LockFile { path }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if lock_is_stale(&path) && break_stale_lock(&path) {
                        continue;
                    }
                    if Instant::now() >= deadline {
                        return Err(ProvflowError::persistence(format!(
                            "timed out waiting for store lock {:?}",
                            path
                        )));
                    }
                    std::thread::sleep(LOCK_POLL_INTERVAL);
                }
                Err(e) => {
                    return Err(ProvflowError::persistence(format!(
                        "failed to create lock {:?}: {}",
                        path, e
                    )))
                }
            }
        }
    }

    /// All parseable entries on disk, expired ones included. Unreadable
    /// files are logged and left in place.
    fn all_entries(&self) -> Result<Vec<(PathBuf, StoredEntry)>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let dir = fs::read_dir(&self.root).map_err(ProvflowError::persistence)?;
        for item in dir {
            let path = item.map_err(ProvflowError::persistence)?.path();
            if path.extension().is_some_and(|e| e == "json") {
                match Self::read_entry(&path) {
                    Ok(Some(entry)) => entries.push((path, entry)),
                    Ok(None) => {}
                    Err(e) => tracing::warn!("Skipping unreadable store entry {:?}: {}", path, e),
                }
            }
        }
        Ok(entries)
    }
}

fn lock_is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > STALE_LOCK_AFTER)
}

/// Move a stale lock out of the way.
///
/// The lock is claimed by renaming it to a unique name, so of several
/// writers that saw it stale only one gets it. Returns false when the lock
/// vanished first or the claimed file turns out to be a fresh lock taken
/// after the staleness check, which is then put back.
fn break_stale_lock(path: &Path) -> bool {
    let claimed = path.with_extension(format!("stale-{}", Uuid::new_v4().simple()));
    if fs::rename(path, &claimed).is_err() {
        return false;
    }

    if lock_is_stale(&claimed) {
        tracing::warn!("Breaking stale store lock at {:?}", path);
        let _ = fs::remove_file(&claimed);
        return true;
    }

    if let Err(e) = fs::hard_link(&claimed, path) {
        tracing::warn!("Could not restore live store lock at {:?}: {}", path, e);
    }
    let _ = fs::remove_file(&claimed);
    false
}

/// Held lock; removed on drop.
struct LockFile {
    path: PathBuf,
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

impl KvBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<StoredEntry>> {
        let entry = Self::read_entry(&self.entry_path(key))?;
        Ok(entry.filter(|e| e.key == key && !e.is_expired()))
    }

    fn put(&self, entry: StoredEntry, expect: Expect) -> Result<()> {
        let _lock = self.acquire_lock()?;
        let current = Self::read_entry(&self.entry_path(&entry.key))?;
        if !precondition_holds(current.as_ref(), expect) {
            return Err(ProvflowError::Conflict { key: entry.key });
        }
        self.write_entry(&entry)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let _lock = self.acquire_lock()?;
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ProvflowError::persistence(e)),
        }
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .all_entries()?
            .into_iter()
            .filter(|(_, e)| !e.is_expired() && e.key.starts_with(prefix))
            .map(|(_, e)| e.key)
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn purge_expired(&self) -> Result<usize> {
        let _lock = self.acquire_lock()?;
        let mut removed = 0;
        for (path, entry) in self.all_entries()? {
            if entry.is_expired() && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
