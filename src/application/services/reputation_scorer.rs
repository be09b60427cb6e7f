use crate::analysis::domain::{Finding, PackageId, ReputationScore};
use crate::analysis::policies::reputation_policy::METADATA_UNAVAILABLE_FLAG;
use crate::analysis::policies::ReputationPolicy;
use crate::ports::outbound::RegistryClient;
use crate::shared::error::AnalysisError;
use crate::shared::{Clock, Result, SystemClock};
use futures::stream::{self, StreamExt};
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_WORKERS: usize = 8;
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Reputation of one package plus the standalone finding a low score raises
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPackage {
    pub score: ReputationScore,
    pub finding: Option<Finding>,
}

/// ReputationScorer turns registry metadata into trust scores.
///
/// Metadata comes through the `RegistryClient`, normally the caching
/// decorator, so repeated packages cost one lookup per TTL window. The
/// factor bands and weights live in [`ReputationPolicy`].
pub struct ReputationScorer {
    registry: Arc<dyn RegistryClient>,
    clock: Arc<dyn Clock>,
    worker_pool_size: usize,
    call_timeout: Duration,
}

impl ReputationScorer {
    pub fn new(registry: Arc<dyn RegistryClient>) -> Self {
        Self {
            registry,
            clock: Arc::new(SystemClock),
            worker_pool_size: DEFAULT_WORKERS,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_worker_pool_size(mut self, size: usize) -> Self {
        self.worker_pool_size = size.max(1);
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Scores one package
    ///
    /// # Errors
    /// Returns `AnalysisError::MetadataUnavailable` when neither the cache
    /// nor the registry can supply metadata within the call timeout.
    pub async fn score(&self, package: &PackageId) -> Result<ScoredPackage> {
        let fetch = self
            .registry
            .fetch_metadata(&package.ecosystem, package.name());
        let metadata = match tokio::time::timeout(self.call_timeout, fetch).await {
            Ok(Ok(metadata)) => metadata,
            Ok(Err(e)) => {
                return Err(AnalysisError::MetadataUnavailable {
                    package: package.to_string(),
                    reason: e.to_string(),
                }
                .into())
            }
            Err(_) => {
                return Err(AnalysisError::MetadataUnavailable {
                    package: package.to_string(),
                    reason: format!("timed out after {}ms", self.call_timeout.as_millis()),
                }
                .into())
            }
        };

        let (score, finding) = ReputationPolicy::evaluate(package, &metadata, self.clock.now());
        Ok(ScoredPackage { score, finding })
    }

    /// Scores one package, degrading to a neutral flagged score on failure
    pub async fn score_or_neutral(&self, package: &PackageId) -> ScoredPackage {
        match self.score(package).await {
            Ok(scored) => scored,
            Err(e) => {
                tracing::debug!(package = %package, error = %e, "reputation metadata unavailable");
                ScoredPackage {
                    score: ReputationScore::neutral(
                        package.clone(),
                        METADATA_UNAVAILABLE_FLAG,
                        &format!("registry metadata unavailable: {}", e),
                    ),
                    finding: None,
                }
            }
        }
    }

    /// Scores many packages concurrently through a bounded worker pool.
    /// Results follow the input order.
    pub async fn score_all(&self, packages: &[PackageId]) -> Vec<ScoredPackage> {
        let jobs: Vec<BoxFuture<'_, _>> = packages
            .iter()
            .enumerate()
            .map(|(index, package)| async move { (index, self.score_or_neutral(package).await) }.boxed())
            .collect();
        let mut scored: Vec<(usize, ScoredPackage)> = stream::iter(jobs)
            .buffer_unordered(self.worker_pool_size)
            .collect()
            .await;
        scored.sort_by_key(|(index, _)| *index);
        scored.into_iter().map(|(_, s)| s).collect()
    }
}
