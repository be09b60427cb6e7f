use crate::analysis::domain::{Ecosystem, PackageMetadata};
use crate::application::services::CacheManager;
use crate::ports::outbound::RegistryClient;
use crate::shared::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// CachingRegistryClient wraps a RegistryClient and adds cache-first lookups.
///
/// This adapter implements the decorator pattern over any RegistryClient.
/// Metadata is stored in the shared [`CacheManager`] under
/// `meta:<ecosystem>:<name>` for 24 hours. Failures are never cached, so a
/// transient registry error is retried on the next lookup.
///
/// # Architecture
/// Caching is an adapter concern: the graph builder and the reputation
/// scorer only ask for metadata and cannot tell whether it came from the
/// cache or the registry.
pub struct CachingRegistryClient<R: RegistryClient + ?Sized> {
    inner: Arc<R>,
    cache: Arc<CacheManager>,
}

impl<R: RegistryClient + ?Sized> CachingRegistryClient<R> {
    pub fn new(inner: Arc<R>, cache: Arc<CacheManager>) -> Self {
        Self { inner, cache }
    }

    fn cache_key(ecosystem: &Ecosystem, name: &str) -> String {
        format!("meta:{}:{}", ecosystem, name)
    }
}

#[async_trait]
impl<R: RegistryClient + ?Sized> RegistryClient for CachingRegistryClient<R> {
    async fn fetch_metadata(&self, ecosystem: &Ecosystem, name: &str) -> Result<PackageMetadata> {
        let key = Self::cache_key(ecosystem, name);

        if let Some(cached) = self.cache.get_as::<PackageMetadata>(&key) {
            return Ok(cached);
        }

        let metadata = self.inner.fetch_metadata(ecosystem, name).await?;
        self.cache.put_json(&key, &metadata, self.cache.default_ttl());

        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::AnalysisError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock registry that tracks call counts
    struct CountingRegistry {
        call_count: AtomicUsize,
        fail: bool,
    }

    impl CountingRegistry {
        fn new(fail: bool) -> Self {
            Self {
                call_count: AtomicUsize::new(0),
                fail,
            }
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RegistryClient for CountingRegistry {
        async fn fetch_metadata(&self, _ecosystem: &Ecosystem, name: &str) -> Result<PackageMetadata> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AnalysisError::MetadataUnavailable {
                    package: name.to_string(),
                    reason: "registry down".to_string(),
                }
                .into());
            }
            Ok(PackageMetadata {
                name: name.to_string(),
                weekly_downloads: Some(42),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn test_second_lookup_is_served_from_cache() {
        let inner = Arc::new(CountingRegistry::new(false));
        let client = CachingRegistryClient::new(inner.clone(), Arc::new(CacheManager::in_memory(10)));

        let first = client.fetch_metadata(&Ecosystem::Npm, "chalk").await.unwrap();
        let second = client.fetch_metadata(&Ecosystem::Npm, "chalk").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn test_ecosystems_are_cached_separately() {
        let inner = Arc::new(CountingRegistry::new(false));
        let client = CachingRegistryClient::new(inner.clone(), Arc::new(CacheManager::in_memory(10)));

        client.fetch_metadata(&Ecosystem::Npm, "six").await.unwrap();
        client.fetch_metadata(&Ecosystem::PyPI, "six").await.unwrap();

        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let inner = Arc::new(CountingRegistry::new(true));
        let cache = Arc::new(CacheManager::in_memory(10));
        let client = CachingRegistryClient::new(inner.clone(), cache.clone());

        assert!(client.fetch_metadata(&Ecosystem::Npm, "x").await.is_err());
        assert!(client.fetch_metadata(&Ecosystem::Npm, "x").await.is_err());

        assert_eq!(inner.calls(), 2);
        assert_eq!(cache.stats().entry_count, 0);
    }

    #[tokio::test]
    async fn test_disabled_cache_passes_through() {
        let inner = Arc::new(CountingRegistry::new(false));
        let client = CachingRegistryClient::new(inner.clone(), Arc::new(CacheManager::disabled()));

        client.fetch_metadata(&Ecosystem::Npm, "chalk").await.unwrap();
        client.fetch_metadata(&Ecosystem::Npm, "chalk").await.unwrap();

        assert_eq!(inner.calls(), 2);
    }
}
