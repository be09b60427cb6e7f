use crate::ports::outbound::{CacheEntry, CacheStore};
use crate::shared::Result;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// In-process cache store backed by a concurrent map
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: DashMap<String, CacheEntry>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for InMemoryCacheStore {
    fn load(&self, key: &str) -> Result<Option<CacheEntry>> {
        Ok(self.entries.get(key).map(|e| e.value().clone()))
    }

    fn save(&self, entry: CacheEntry) -> Result<()> {
        self.entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    fn touch(&self, key: &str, accessed_at: DateTime<Utc>, access_seq: u64) -> Result<()> {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.last_accessed = accessed_at;
            entry.access_seq = access_seq;
            entry.hit_count += 1;
        }
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.entries.len())
    }

    fn least_recently_used(&self) -> Result<Option<String>> {
        Ok(self
            .entries
            .iter()
            .min_by_key(|e| e.value().recency())
            .map(|e| e.key().clone()))
    }

    fn entries(&self) -> Result<Vec<CacheEntry>> {
        Ok(self.entries.iter().map(|e| e.value().clone()).collect())
    }

    fn clear(&self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }
}
