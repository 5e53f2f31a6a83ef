//! In-memory backend.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::{ProvflowError, Result};

use super::backend::{precondition_holds, Expect, KvBackend, StoredEntry};

/// Process-local backend. Compare-and-swap is atomic under a single mutex.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, StoredEntry>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<String, StoredEntry>>> {
        self.entries
            .lock()
            .map_err(|_| ProvflowError::persistence("memory backend lock poisoned"))
    }
}

impl KvBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<StoredEntry>> {
        let entries = self.entries()?;
        Ok(entries.get(key).filter(|e| !e.is_expired()).cloned())
    }

    fn put(&self, entry: StoredEntry, expect: Expect) -> Result<()> {
        let mut entries = self.entries()?;
        if !precondition_holds(entries.get(&entry.key), expect) {
            return Err(ProvflowError::Conflict { key: entry.key });
        }
        entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries()?;
        Ok(entries.remove(key).is_some())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries()?;
        let mut keys: Vec<String> = entries
            .values()
            .filter(|e| !e.is_expired() && e.key.starts_with(prefix))
            .map(|e| e.key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn purge_expired(&self) -> Result<usize> {
        let mut entries = self.entries()?;
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired());
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(key: &str, rev: u64) -> StoredEntry {
        StoredEntry::new(key, rev, "{}", Duration::hours(1))
    }

    #[test]
    fn put_and_get() {
        let backend = MemoryBackend::new();
        backend.put(entry("a", 1), Expect::Absent).unwrap();

        let loaded = backend.get("a").unwrap().unwrap();
        assert_eq!(loaded.revision, 1);
    }

    #[test]
    fn get_missing_is_none() {
        let backend = MemoryBackend::new();
        assert!(backend.get("missing").unwrap().is_none());
    }

    #[test]
    fn put_absent_conflicts_when_present() {
        let backend = MemoryBackend::new();
        backend.put(entry("a", 1), Expect::Absent).unwrap();

        let err = backend.put(entry("a", 1), Expect::Absent).unwrap_err();
        assert!(matches!(err, ProvflowError::Conflict { .. }));
    }

    #[test]
    fn put_with_stale_revision_conflicts() {
        let backend = MemoryBackend::new();
        backend.put(entry("a", 1), Expect::Absent).unwrap();
        backend.put(entry("a", 2), Expect::Revision(1)).unwrap();

        let err = backend.put(entry("a", 2), Expect::Revision(1)).unwrap_err();
        assert!(matches!(err, ProvflowError::Conflict { .. }));
        assert_eq!(backend.get("a").unwrap().unwrap().revision, 2);
    }

    #[test]
    fn expired_entries_are_invisible_and_purged() {
        let backend = MemoryBackend::new();
        backend
            .put(StoredEntry::new("old", 1, "{}", Duration::zero()), Expect::Absent)
            .unwrap();
        backend.put(entry("new", 1), Expect::Absent).unwrap();

        assert!(backend.get("old").unwrap().is_none());
        assert_eq!(backend.keys("").unwrap(), vec!["new".to_string()]);
        assert_eq!(backend.purge_expired().unwrap(), 1);
    }

    #[test]
    fn keys_filter_by_prefix() {
        let backend = MemoryBackend::new();
        backend.put(entry("workflow:b", 1), Expect::Absent).unwrap();
        backend.put(entry("workflow:a", 1), Expect::Absent).unwrap();
        backend.put(entry("other:c", 1), Expect::Absent).unwrap();

        assert_eq!(
            backend.keys("workflow:").unwrap(),
            vec!["workflow:a".to_string(), "workflow:b".to_string()]
        );
    }

    #[test]
    fn delete_reports_removal() {
        let backend = MemoryBackend::new();
        backend.put(entry("a", 1), Expect::Absent).unwrap();

        assert!(backend.delete("a").unwrap());
        assert!(!backend.delete("a").unwrap());
    }
}
