use crate::ports::outbound::{CacheEntry, CacheStore};
use crate::shared::error::AnalysisError;
use crate::shared::Result;
use chrono::{DateTime, Utc};

/// Store used when caching is turned off: every operation reports the
/// cache as unavailable, so the manager behaves as a pass-through.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCacheStore;

fn unavailable<T>() -> Result<T> {
    Err(AnalysisError::CacheUnavailable {
        reason: "caching is disabled".to_string(),
    }
    .into())
}

impl CacheStore for DisabledCacheStore {
    fn load(&self, _key: &str) -> Result<Option<CacheEntry>> {
        unavailable()
    }

    fn save(&self, _entry: CacheEntry) -> Result<()> {
        unavailable()
    }

    fn remove(&self, _key: &str) -> Result<bool> {
        unavailable()
    }

    fn touch(&self, _key: &str, _accessed_at: DateTime<Utc>, _access_seq: u64) -> Result<()> {
        unavailable()
    }

    fn len(&self) -> Result<usize> {
        unavailable()
    }

    fn least_recently_used(&self) -> Result<Option<String>> {
        unavailable()
    }

    fn entries(&self) -> Result<Vec<CacheEntry>> {
        unavailable()
    }

    fn clear(&self) -> Result<()> {
        unavailable()
    }
}
