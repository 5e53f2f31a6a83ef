//! Key-value backend interface.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A stored value with its version and retention metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    /// Full key, e.g. `workflow:wf_...`.
    pub key: String,
    /// Version of this value; incremented on every write.
    pub revision: u64,
    /// When this value was written.
    pub stored_at: DateTime<Utc>,
    /// When the value stops being readable.
    pub expires_at: DateTime<Utc>,
    /// Serialized payload.
    pub body: String,
}

impl StoredEntry {
    /// Create an entry expiring `ttl` from now.
    pub fn new(key: impl Into<String>, revision: u64, body: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            revision,
            stored_at: now,
            expires_at: now + ttl,
            body: body.into(),
        }
    }

    /// Check if the entry has outlived its TTL.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Write precondition for [`KvBackend::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// The key must not hold a live value.
    Absent,
    /// The live value must be at this revision.
    Revision(u64),
}

/// Key-value engine used by the workflow store.
///
/// Expired entries behave as absent for every operation. `put` is an atomic
/// compare-and-swap: it fails with `ProvflowError::Conflict` when the
/// precondition does not hold.
pub trait KvBackend: Send + Sync {
    /// Read a live entry.
    fn get(&self, key: &str) -> Result<Option<StoredEntry>>;

    /// Write an entry if `expect` holds.
    fn put(&self, entry: StoredEntry, expect: Expect) -> Result<()>;

    /// Remove an entry. Returns whether anything was removed.
    fn delete(&self, key: &str) -> Result<bool>;

    /// Keys of live entries starting with `prefix`.
    fn keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Evict expired entries, returning how many were removed.
    fn purge_expired(&self) -> Result<usize>;
}

/// Check a CAS precondition against the currently stored entry.
pub(crate) fn precondition_holds(current: Option<&StoredEntry>, expect: Expect) -> bool {
    let live = current.filter(|e| !e.is_expired());
    match (live, expect) {
        (None, Expect::Absent) => true,
        (Some(entry), Expect::Revision(rev)) => entry.revision == rev,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_expiration() {
        let entry = StoredEntry::new("k", 1, "{}", Duration::zero());
        assert!(entry.is_expired());

        let entry = StoredEntry::new("k", 1, "{}", Duration::hours(1));
        assert!(!entry.is_expired());
        assert_eq!(entry.expires_at - entry.stored_at, Duration::hours(1));
    }

    #[test]
    fn precondition_absent() {
        let live = StoredEntry::new("k", 3, "{}", Duration::hours(1));
        let dead = StoredEntry::new("k", 3, "{}", Duration::zero());

        assert!(precondition_holds(None, Expect::Absent));
        assert!(precondition_holds(Some(&dead), Expect::Absent));
        assert!(!precondition_holds(Some(&live), Expect::Absent));
    }

    #[test]
    fn precondition_revision() {
        let live = StoredEntry::new("k", 3, "{}", Duration::hours(1));

        assert!(precondition_holds(Some(&live), Expect::Revision(3)));
        assert!(!precondition_holds(Some(&live), Expect::Revision(2)));
        assert!(!precondition_holds(None, Expect::Revision(3)));
    }
}
