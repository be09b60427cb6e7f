use super::fetch_metadata;
use crate::analysis::domain::{
    DependencyNode, Finding, FindingType, InspectionPayload, PackageMetadata, Severity,
    StageContext, StageName, StagePayload,
};
use crate::analysis::policies::TriggerPolicy;
use crate::application::services::CacheManager;
use crate::ports::outbound::{RegistryClient, StageAnalyzer};
use crate::shared::{Clock, Result, SystemClock};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use futures::future::{BoxFuture, FutureExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Bumped whenever the heuristics change so cached verdicts are not reused
const HEURISTICS_VERSION: &str = "1";
const FRESH_PACKAGE_DAYS: i64 = 30;

/// Deep-inspection stage over registry metadata.
///
/// Only packages already flagged as suspicious are inspected. For each, the
/// resolved version's record is checked for install hooks and for
/// dependencies that appeared in this release. Verdicts are cached by a
/// content key over the package identity and the heuristics version.
pub struct HeuristicInspector {
    registry: Arc<dyn RegistryClient>,
    cache: Arc<CacheManager>,
    clock: Arc<dyn Clock>,
    worker_pool_size: usize,
    call_timeout: Duration,
}

impl HeuristicInspector {
    pub fn new(
        registry: Arc<dyn RegistryClient>,
        cache: Arc<CacheManager>,
        worker_pool_size: usize,
        call_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            cache,
            clock: Arc::new(SystemClock),
            worker_pool_size: worker_pool_size.max(1),
            call_timeout,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn inspect_node(&self, node: &DependencyNode, prior: Vec<&Finding>) -> Vec<Finding> {
        let key = CacheManager::content_key(&["inspect", HEURISTICS_VERSION, &node.id.key()]);
        if let Some(cached) = self.cache.get_as::<Vec<Finding>>(&key) {
            return cached;
        }

        let Some(metadata) = fetch_metadata(self.registry.as_ref(), &node.id, self.call_timeout).await
        else {
            return Vec::new();
        };
        let findings = Self::inspect(node, &metadata, &prior, self.clock.now());
        self.cache.put_json(&key, &findings, self.cache.default_ttl());
        findings
    }

    fn inspect(
        node: &DependencyNode,
        metadata: &PackageMetadata,
        prior: &[&Finding],
        now: DateTime<Utc>,
    ) -> Vec<Finding> {
        let Some(record) = metadata.version(node.id.version()) else {
            return Vec::new();
        };
        let mut findings = Vec::new();
        let fresh = metadata
            .first_published
            .is_some_and(|t| (now - t).num_days() < FRESH_PACKAGE_DAYS);
        let flagged_malicious = prior
            .iter()
            .any(|f| f.finding_type == FindingType::MaliciousCode);

        if record.has_install_script {
            findings.push(Finding::new(
                node.id.clone(),
                FindingType::InstallScript,
                Severity::Medium,
                0.6,
                vec![format!("{} runs an install hook", node.id)],
            ));
            if flagged_malicious {
                findings.push(Finding::new(
                    node.id.clone(),
                    FindingType::MaliciousCode,
                    Severity::Critical,
                    0.9,
                    vec![
                        "rule-based malicious signature confirmed by an install hook".to_string(),
                    ],
                ));
            } else if fresh {
                findings.push(Finding::new(
                    node.id.clone(),
                    FindingType::MaliciousCode,
                    Severity::High,
                    0.6,
                    vec![format!(
                        "install hook in a package first published less than {} days ago",
                        FRESH_PACKAGE_DAYS
                    )],
                ));
            }
        }

        let introduced = Self::introduced_dependencies(metadata, node.id.version());
        if !introduced.is_empty() {
            findings.push(Finding::new(
                node.id.clone(),
                FindingType::Other("new-dependencies".to_string()),
                Severity::Low,
                0.4,
                vec![format!(
                    "dependencies added in {}: {}",
                    node.id.version(),
                    introduced.join(", ")
                )],
            ));
        }
        findings
    }

    /// Dependencies of `version` absent from the release published just before it
    fn introduced_dependencies(metadata: &PackageMetadata, version: &str) -> Vec<String> {
        let mut ordered: Vec<_> = metadata
            .versions
            .iter()
            .filter(|v| v.published_at.is_some())
            .collect();
        ordered.sort_by_key(|v| v.published_at);
        let Some(position) = ordered.iter().position(|v| v.version == version) else {
            return Vec::new();
        };
        let Some(previous) = position.checked_sub(1).map(|p| ordered[p]) else {
            return Vec::new();
        };
        ordered[position]
            .dependencies
            .keys()
            .filter(|name| !previous.dependencies.contains_key(*name))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl StageAnalyzer for HeuristicInspector {
    fn stage(&self) -> StageName {
        StageName::DeepInspection
    }

    async fn analyze(&self, ctx: &StageContext<'_>) -> Result<StagePayload> {
        let suspicious = TriggerPolicy::suspicious_packages(ctx.findings, ctx.results);
        let nodes: Vec<&DependencyNode> = suspicious
            .iter()
            .filter_map(|key| ctx.graph.node_by_key(key))
            .filter(|node| node.is_resolved())
            .collect();
        tracing::debug!(packages = nodes.len(), "deep inspection started");

        let inspections: Vec<BoxFuture<'_, _>> = nodes
            .into_iter()
            .map(|node| async move {
                let prior = ctx.findings_for(&node.id.key());
                (node.id.key(), self.inspect_node(node, prior).await)
            }
            .boxed())
            .collect();
        let packages: BTreeMap<String, Vec<Finding>> = stream::iter(inspections)
            .buffer_unordered(self.worker_pool_size)
            .filter(|(_, findings)| futures::future::ready(!findings.is_empty()))
            .collect()
            .await;

        Ok(StagePayload::DeepInspection(InspectionPayload { packages }))
    }
}
