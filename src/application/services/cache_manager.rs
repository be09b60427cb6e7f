use crate::adapters::outbound::cache::{DisabledCacheStore, InMemoryCacheStore};
use crate::ports::outbound::{CacheEntry, CacheStore};
use crate::shared::{Clock, SystemClock};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default maximum number of entries
pub const DEFAULT_CAPACITY: usize = 10_000;

/// TTL used for registry metadata and version resolution
pub const METADATA_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound applied to TTLs chrono cannot represent
const MAX_TTL_DAYS: i64 = 365 * 100;

/// Counters describing cache behaviour during a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entry_count: usize,
    pub hit_count: u64,
    pub miss_count: u64,
    pub eviction_count: u64,
    pub expiration_count: u64,
}

impl CacheStats {
    /// Hit rate as a percentage of all lookups
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            (self.hit_count as f64 / total as f64) * 100.0
        }
    }
}

/// TTL-bounded, capacity-bounded key/value cache over a pluggable store.
///
/// The cache is an optimisation only. Every store failure becomes a miss
/// (on `get`) or a no-op (on `put`), so a broken or disabled backend changes
/// latency but never results. Keys are opaque; callers build them.
///
/// Every store mutation, including the access bookkeeping on a hit, takes a
/// manager-wide lock, so the capacity check, eviction and save happen as one
/// step and a put is never overwritten by a stale touch. Racing writers on
/// the same key resolve last-write-wins.
pub struct CacheManager {
    store: Arc<dyn CacheStore>,
    capacity: usize,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
    access_seq: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl CacheManager {
    /// Creates a manager over `store`. A capacity of zero is raised to one.
    pub fn new(store: Arc<dyn CacheStore>, capacity: usize) -> Self {
        Self {
            store,
            capacity: capacity.max(1),
            default_ttl: METADATA_TTL,
            clock: Arc::new(SystemClock),
            write_lock: Mutex::new(()),
            access_seq: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    /// In-process cache
    pub fn in_memory(capacity: usize) -> Self {
        Self::new(Arc::new(InMemoryCacheStore::new()), capacity)
    }

    /// Pass-through cache: every lookup misses
    pub fn disabled() -> Self {
        Self::new(Arc::new(DisabledCacheStore), 1)
    }

    /// Replaces the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Overrides the TTL callers use for registry-derived data
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Looks up `key`. Absent, expired and unreadable entries all miss.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        let entry = match self.store.load(key) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Err(e) => {
                tracing::debug!(key, error = %e, "cache load failed, treating as miss");
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if entry.is_expired(now) {
            self.expire(key, now);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        // Stores may rewrite the whole entry on touch, so it must not
        // interleave with a put on the same key
        {
            let _guard = self.write_lock.lock();
            let seq = self.next_seq();
            if let Err(e) = self.store.touch(key, now, seq) {
                tracing::debug!(key, error = %e, "cache touch failed");
            }
        }
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(entry.value)
    }

    /// Typed lookup. A value that no longer deserializes is a miss.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                tracing::debug!(key, error = %e, "cached value has unexpected shape");
                None
            }
        }
    }

    /// Inserts or overwrites `key`.
    ///
    /// A zero `ttl` stores nothing. When the cache is full and `key` is new,
    /// the least recently accessed entry is evicted first.
    pub fn put(&self, key: &str, value: Value, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let _guard = self.write_lock.lock();
        let now = self.clock.now();
        let ttl = chrono::Duration::from_std(ttl)
            .unwrap_or_else(|_| chrono::Duration::days(MAX_TTL_DAYS));

        // An unreadable entry still occupies its slot and is overwritten
        let exists = match self.store.load(key) {
            Ok(existing) => existing.is_some(),
            Err(e) => {
                tracing::debug!(key, error = %e, "existing cache entry unreadable, overwriting");
                true
            }
        };
        if !exists && !self.make_room() {
            return;
        }

        let entry = CacheEntry {
            key: key.to_string(),
            value,
            created_at: now,
            expires_at: now + ttl,
            last_accessed: now,
            access_seq: self.next_seq(),
            hit_count: 0,
        };
        if let Err(e) = self.store.save(entry) {
            tracing::debug!(key, error = %e, "cache unavailable, skipping put");
        }
    }

    /// Serializes and inserts a typed value
    pub fn put_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_value(value) {
            Ok(v) => self.put(key, v, ttl),
            Err(e) => tracing::debug!(key, error = %e, "value not cacheable"),
        }
    }

    /// Removes every expired entry, returning how many were dropped
    pub fn prune_expired(&self) -> usize {
        let _guard = self.write_lock.lock();
        let now = self.clock.now();
        let entries = match self.store.entries() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(error = %e, "cache unavailable, nothing to prune");
                return 0;
            }
        };
        let removed = entries
            .iter()
            .filter(|e| e.is_expired(now))
            .filter(|e| matches!(self.store.remove(&e.key), Ok(true)))
            .count();
        self.expirations
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Drops every entry. Counters are kept.
    pub fn clear(&self) {
        let _guard = self.write_lock.lock();
        if let Err(e) = self.store.clear() {
            tracing::debug!(error = %e, "cache clear failed");
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.store.len().unwrap_or(0),
            hit_count: self.hits.load(Ordering::Relaxed),
            miss_count: self.misses.load(Ordering::Relaxed),
            eviction_count: self.evictions.load(Ordering::Relaxed),
            expiration_count: self.expirations.load(Ordering::Relaxed),
        }
    }

    /// Content-addressed key: SHA-256 over the parts, hex encoded
    pub fn content_key(parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    fn next_seq(&self) -> u64 {
        self.access_seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Re-checks under the write lock so a fresh concurrent put survives
    fn expire(&self, key: &str, now: chrono::DateTime<chrono::Utc>) {
        let _guard = self.write_lock.lock();
        if let Ok(Some(entry)) = self.store.load(key) {
            if entry.is_expired(now) && matches!(self.store.remove(key), Ok(true)) {
                self.expirations.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Evicts until there is space for one more entry. Caller holds the write lock.
    fn make_room(&self) -> bool {
        loop {
            let len = match self.store.len() {
                Ok(len) => len,
                Err(e) => {
                    tracing::debug!(error = %e, "cache unavailable, skipping put");
                    return false;
                }
            };
            if len < self.capacity {
                return true;
            }
            match self.store.least_recently_used() {
                Ok(Some(victim)) => match self.store.remove(&victim) {
                    Ok(_) => {
                        tracing::debug!(key = %victim, "evicted least recently used entry");
                        self.evictions.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        tracing::warn!(key = %victim, error = %e, "cache eviction failed");
                        return false;
                    }
                },
                Ok(None) => return true,
                Err(e) => {
                    tracing::debug!(error = %e, "cache unavailable, skipping put");
                    return false;
                }
            }
        }
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("capacity", &self.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}
