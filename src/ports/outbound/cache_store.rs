use crate::shared::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One stored cache record. The value is opaque to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: Value,
    pub created_at: DateTime<Utc>,
    /// Always after `created_at`; an entry at or past it is logically absent
    pub expires_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    /// Monotonic access counter; breaks `last_accessed` ties for LRU ordering
    pub access_seq: u64,
    pub hit_count: u64,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// LRU ordering key: smaller is older
    pub fn recency(&self) -> (DateTime<Utc>, u64) {
        (self.last_accessed, self.access_seq)
    }
}

/// CacheStore port: raw key/entry storage behind the Cache Manager
///
/// Stores know nothing about TTLs or capacity; the manager enforces both.
/// Every method may fail (disk I/O, disabled store); the manager turns
/// failures into misses or no-ops.
///
/// Implementations must be `Send + Sync` so one store can be shared by
/// concurrent graph resolution and stage workers.
pub trait CacheStore: Send + Sync {
    /// Loads the entry for `key`, expired or not
    fn load(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Inserts or overwrites the entry with the same key
    fn save(&self, entry: CacheEntry) -> Result<()>;

    /// Removes the entry; returns whether one existed
    fn remove(&self, key: &str) -> Result<bool>;

    /// Records an access without touching the value
    fn touch(&self, key: &str, accessed_at: DateTime<Utc>, access_seq: u64) -> Result<()>;

    /// Number of stored entries, expired ones included
    fn len(&self) -> Result<usize>;

    /// Key of the entry with the oldest access
    fn least_recently_used(&self) -> Result<Option<String>>;

    /// Every stored entry
    fn entries(&self) -> Result<Vec<CacheEntry>>;

    /// Removes every entry
    fn clear(&self) -> Result<()>;
}
