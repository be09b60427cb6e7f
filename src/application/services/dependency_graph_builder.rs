use super::cache_manager::CacheManager;
use crate::analysis::domain::{
    DeclaredDependency, DeclaredType, DependencyGraph, DependencyNode, Ecosystem, PackageId,
    PackageName, ProjectManifest, ResolutionStatus, Version,
};
use crate::analysis::services::{GraphAnalysis, VersionResolver};
use crate::ports::outbound::RegistryClient;
use crate::shared::error::AnalysisError;
use crate::shared::Result;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Levels below the root explored before truncating
pub const MAX_GRAPH_DEPTH: usize = 64;

const DEFAULT_WORKERS: usize = 8;
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Cached outcome of resolving one `name@range`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Resolution {
    version: String,
    dependencies: BTreeMap<String, String>,
}

/// One edge waiting to be resolved
#[derive(Debug, Clone)]
struct PendingEdge {
    parent: PackageId,
    name: String,
    range: String,
    declared_type: DeclaredType,
    depth: usize,
}

/// DependencyGraphBuilder resolves a project's declared dependencies into
/// the full transitive graph.
///
/// Traversal is breadth-first, one level at a time. Every edge of a level is
/// resolved concurrently (bounded by the worker pool), cache first, then via
/// the registry under a per-call timeout. A dependency that cannot be
/// resolved becomes an `Unresolved` node instead of failing the build.
pub struct DependencyGraphBuilder {
    registry: Arc<dyn RegistryClient>,
    cache: Arc<CacheManager>,
    worker_pool_size: usize,
    call_timeout: Duration,
}

impl DependencyGraphBuilder {
    pub fn new(registry: Arc<dyn RegistryClient>, cache: Arc<CacheManager>) -> Self {
        Self {
            registry,
            cache,
            worker_pool_size: DEFAULT_WORKERS,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_worker_pool_size(mut self, size: usize) -> Self {
        self.worker_pool_size = size.max(1);
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Builds the dependency graph for a project
    ///
    /// # Errors
    /// Returns `AnalysisError::ManifestError` if the project name or any
    /// declared dependency is malformed. Registry failures never fail the build.
    pub async fn build(&self, manifest: &ProjectManifest) -> Result<DependencyGraph> {
        let ecosystem = manifest.ecosystem.clone();
        let manifest_label = manifest
            .manifests
            .first()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| manifest.root.display().to_string());

        let root = PackageId::project_root(ecosystem.clone(), &manifest.project_name).map_err(
            |e| AnalysisError::ManifestError {
                manifest: manifest_label.clone(),
                details: format!("invalid project name: {}", e),
            },
        )?;
        Self::validate_declared(&manifest.dependencies, &manifest_label)?;

        let mut nodes: BTreeMap<PackageId, DependencyNode> = BTreeMap::new();
        nodes.insert(
            root.clone(),
            DependencyNode {
                id: root.clone(),
                declared_type: DeclaredType::Direct,
                depth: 0,
                children: Vec::new(),
                status: ResolutionStatus::Resolved,
                requested_range: None,
            },
        );

        let mut frontier: Vec<PendingEdge> = manifest
            .dependencies
            .iter()
            .map(|dep| PendingEdge {
                parent: root.clone(),
                name: dep.name.trim().to_string(),
                range: dep.version_range.trim().to_string(),
                declared_type: dep.declared_type,
                depth: 1,
            })
            .collect();

        while !frontier.is_empty() {
            let level = frontier.first().map(|e| e.depth).unwrap_or_default();
            tracing::debug!(level, edges = frontier.len(), "resolving dependency level");

            let mut outcomes: Vec<(PendingEdge, Result<Resolution>)> = stream::iter(frontier)
                .map(|edge| {
                    let ecosystem = &ecosystem;
                    async move {
                        let resolution = self.resolve(ecosystem, &edge.name, &edge.range).await;
                        (edge, resolution)
                    }
                })
                .buffer_unordered(self.worker_pool_size)
                .collect()
                .await;
            // Completion order is arbitrary; apply in a stable order
            outcomes.sort_by(|(a, _), (b, _)| {
                (&a.parent, &a.name, &a.range).cmp(&(&b.parent, &b.name, &b.range))
            });

            frontier = Vec::new();
            for (edge, resolution) in outcomes {
                frontier.extend(self.apply(&ecosystem, &mut nodes, edge, resolution));
            }
        }

        let graph = GraphAnalysis::assemble(root, nodes);
        tracing::info!(
            packages = graph.package_count(),
            cycles = graph.cycles().len(),
            conflicts = graph.conflicts().len(),
            unresolved = graph.unresolved().len(),
            "dependency graph built"
        );
        Ok(graph)
    }

    fn validate_declared(dependencies: &[DeclaredDependency], manifest: &str) -> Result<()> {
        for dep in dependencies {
            let name = dep.name.trim();
            if let Err(e) = PackageName::new(name.to_string()) {
                return Err(AnalysisError::ManifestError {
                    manifest: manifest.to_string(),
                    details: format!("invalid dependency name '{}': {}", name, e),
                }
                .into());
            }
            if dep.version_range.trim().is_empty() {
                return Err(AnalysisError::ManifestError {
                    manifest: manifest.to_string(),
                    details: format!("dependency '{}' has an empty version range", name),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Records one resolved (or failed) edge and returns the edges it opens
    fn apply(
        &self,
        ecosystem: &Ecosystem,
        nodes: &mut BTreeMap<PackageId, DependencyNode>,
        edge: PendingEdge,
        resolution: Result<Resolution>,
    ) -> Vec<PendingEdge> {
        let (id, status, children) = match resolution {
            Ok(resolved) => match PackageId::new(ecosystem.clone(), &edge.name, &resolved.version)
            {
                Ok(id) => (id, ResolutionStatus::Resolved, resolved.dependencies),
                Err(e) => match Self::unresolved_id(ecosystem, &edge.name) {
                    Some(id) => (
                        id,
                        ResolutionStatus::Unresolved {
                            reason: format!("registry returned an invalid version: {}", e),
                        },
                        BTreeMap::new(),
                    ),
                    None => return Vec::new(),
                },
            },
            Err(e) => {
                tracing::warn!(
                    package = %edge.name,
                    range = %edge.range,
                    error = %e,
                    "dependency could not be resolved"
                );
                match Self::unresolved_id(ecosystem, &edge.name) {
                    Some(id) => (
                        id,
                        ResolutionStatus::Unresolved {
                            reason: e.to_string(),
                        },
                        BTreeMap::new(),
                    ),
                    None => return Vec::new(),
                }
            }
        };

        if let Some(parent) = nodes.get_mut(&edge.parent) {
            parent.add_child(id.clone());
        }
        if nodes.contains_key(&id) {
            return Vec::new();
        }

        let declared_type = if edge.depth == 1 {
            edge.declared_type
        } else {
            DeclaredType::Transitive
        };
        let resolved = matches!(status, ResolutionStatus::Resolved);
        nodes.insert(
            id.clone(),
            DependencyNode {
                id: id.clone(),
                declared_type,
                depth: edge.depth,
                children: Vec::new(),
                status,
                requested_range: Some(edge.range.clone()),
            },
        );

        if !resolved || children.is_empty() {
            return Vec::new();
        }
        if edge.depth >= MAX_GRAPH_DEPTH {
            tracing::warn!(
                package = %id,
                depth = edge.depth,
                "maximum graph depth reached, not descending further"
            );
            return Vec::new();
        }

        children
            .into_iter()
            .filter_map(|(name, range)| {
                let name = name.trim().to_string();
                if PackageName::new(name.clone()).is_err() {
                    tracing::warn!(parent = %id, dependency = %name, "skipping invalid dependency name from registry");
                    return None;
                }
                let range = match range.trim() {
                    "" => "*".to_string(),
                    r => r.to_string(),
                };
                Some(PendingEdge {
                    parent: id.clone(),
                    name,
                    range,
                    declared_type: DeclaredType::Transitive,
                    depth: edge.depth + 1,
                })
            })
            .collect()
    }

    fn unresolved_id(ecosystem: &Ecosystem, name: &str) -> Option<PackageId> {
        let name = PackageName::new(name.to_string()).ok()?;
        Some(PackageId {
            ecosystem: ecosystem.clone(),
            name,
            version: Version::unresolved(),
        })
    }

    /// Resolves `name@range`, cache first
    async fn resolve(&self, ecosystem: &Ecosystem, name: &str, range: &str) -> Result<Resolution> {
        let key = format!("resolve:{}:{}:{}", ecosystem, name, range);
        if let Some(cached) = self.cache.get_as::<Resolution>(&key) {
            return Ok(cached);
        }

        let resolution_error = |reason: String| AnalysisError::ResolutionError {
            package: name.to_string(),
            range: range.to_string(),
            reason,
        };

        let metadata = tokio::time::timeout(
            self.call_timeout,
            self.registry.fetch_metadata(ecosystem, name),
        )
        .await
        .map_err(|_| {
            resolution_error(format!(
                "registry lookup timed out after {}ms",
                self.call_timeout.as_millis()
            ))
        })?
        .map_err(|e| resolution_error(e.to_string()))?;

        let version = VersionResolver::resolve(
            range,
            metadata.versions.iter().map(|v| v.version.as_str()),
        )
        .ok_or_else(|| resolution_error("no published version satisfies the range".to_string()))?;

        let dependencies = metadata
            .version(&version)
            .map(|record| record.dependencies.clone())
            .unwrap_or_default();

        let resolution = Resolution {
            version,
            dependencies,
        };
        self.cache.put_json(&key, &resolution, self.cache.default_ttl());
        Ok(resolution)
    }
}
