use crate::analysis::domain::{DeclaredType, PackageId, ProjectManifest};
use crate::application::dto::{AnalysisRequest, AnalysisResponse};
use crate::application::orchestrator::AnalysisOrchestrator;
use crate::application::services::{CacheManager, DependencyGraphBuilder};
use crate::ports::inbound::ProjectAnalysisPort;
use crate::ports::outbound::{EcosystemAdapter, FindingDetector, ProgressReporter};
use crate::shared::error::AnalysisError;
use crate::shared::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Fallback project name when neither the manifest nor the directory yields one
const DEFAULT_PROJECT_NAME: &str = "project";

/// AnalyzeProjectUseCase - Core use case for supply-chain analysis
///
/// Reads the project's manifests, builds the dependency graph, seeds the
/// run with rule-based findings and hands everything to the orchestrator.
///
/// # Type Parameters
/// * `PR` - ProgressReporter implementation
pub struct AnalyzeProjectUseCase<PR> {
    adapters: Vec<Box<dyn EcosystemAdapter>>,
    graph_builder: DependencyGraphBuilder,
    detector: Box<dyn FindingDetector>,
    orchestrator: AnalysisOrchestrator,
    cache: Arc<CacheManager>,
    progress_reporter: PR,
}

impl<PR> AnalyzeProjectUseCase<PR>
where
    PR: ProgressReporter,
{
    pub fn new(
        adapters: Vec<Box<dyn EcosystemAdapter>>,
        graph_builder: DependencyGraphBuilder,
        detector: Box<dyn FindingDetector>,
        orchestrator: AnalysisOrchestrator,
        cache: Arc<CacheManager>,
        progress_reporter: PR,
    ) -> Self {
        Self {
            adapters,
            graph_builder,
            detector,
            orchestrator,
            cache,
            progress_reporter,
        }
    }

    /// Executes the analysis
    ///
    /// # Errors
    /// Only unusable input fails the call: a missing project directory, no
    /// supported manifest, or a malformed manifest.
    pub async fn execute(&self, request: AnalysisRequest) -> Result<AnalysisResponse> {
        // Step 1: Read manifests
        let manifest = self.load_manifest(&request)?;
        self.progress_reporter.report(&format!(
            "📖 Loaded {} declared dependenc(ies) from {} {} manifest(s)",
            manifest.dependencies.len(),
            manifest.manifests.len(),
            manifest.ecosystem
        ));

        // Step 2: Build the dependency graph
        self.progress_reporter.report("🔗 Resolving dependency graph...");
        let graph = self.graph_builder.build(&manifest).await?;
        self.progress_reporter.report(&format!(
            "✅ Resolved {} package(s): {} cycle(s), {} conflict(s), {} unresolved",
            graph.package_count(),
            graph.cycles().len(),
            graph.conflicts().len(),
            graph.unresolved().len()
        ));

        // Step 3: Rule-based findings
        let packages: Vec<PackageId> = graph.packages().into_iter().cloned().collect();
        let findings = self.detector.detect(&packages);
        tracing::info!(
            rule_set = %self.detector.rule_set_version(),
            findings = findings.len(),
            "rule-based detection finished"
        );

        // Step 4: Staged analysis
        self.progress_reporter.report("🔍 Running analysis stages...");
        let run = self
            .orchestrator
            .run(graph, findings, &self.progress_reporter)
            .await;

        let stats = self.cache.stats();
        tracing::debug!(
            hits = stats.hit_count,
            misses = stats.miss_count,
            evictions = stats.eviction_count,
            "cache statistics"
        );

        let response = AnalysisResponse::new(run.report, run.graph, request.fail_on_risk, stats);
        self.progress_reporter.report_completion(&format!(
            "✅ Analysis complete ({} report, overall risk {:.2})",
            response.degradation_level(),
            response.report.summary.overall_risk
        ));
        Ok(response)
    }

    fn load_manifest(&self, request: &AnalysisRequest) -> Result<ProjectManifest> {
        let root = request.project_path.as_path();
        if !root.is_dir() {
            return Err(AnalysisError::InvalidProjectPath {
                path: root.to_path_buf(),
                reason: "directory does not exist".to_string(),
            }
            .into());
        }

        let candidates = self
            .adapters
            .iter()
            .filter(|adapter| {
                request
                    .ecosystem
                    .as_ref()
                    .map_or(true, |e| *e == adapter.ecosystem())
            });

        for adapter in candidates {
            let manifests = adapter.detect_manifests(root)?;
            if manifests.is_empty() {
                continue;
            }

            let mut dependencies = Vec::new();
            for manifest in &manifests {
                dependencies.extend(adapter.extract_dependencies(manifest)?);
            }
            if !request.include_dev {
                dependencies.retain(|d| d.declared_type != DeclaredType::Dev);
            }

            let project_name = manifests
                .iter()
                .find_map(|m| adapter.read_project_name(m))
                .unwrap_or_else(|| directory_project_name(root));

            return Ok(ProjectManifest {
                root: root.to_path_buf(),
                project_name,
                ecosystem: adapter.ecosystem(),
                manifests,
                dependencies,
            });
        }

        Err(AnalysisError::InvalidProjectPath {
            path: root.to_path_buf(),
            reason: match &request.ecosystem {
                Some(ecosystem) => format!("no {} manifest found", ecosystem),
                None => format!(
                    "no supported manifest found (looked for {})",
                    self.adapters
                        .iter()
                        .map(|a| a.ecosystem().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            },
        }
        .into())
    }
}

/// Directory name reduced to characters a package name may carry
fn directory_project_name(root: &Path) -> String {
    let raw = root
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_default();
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('-');
    if cleaned.is_empty() {
        DEFAULT_PROJECT_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

#[async_trait(?Send)]
impl<PR> ProjectAnalysisPort for AnalyzeProjectUseCase<PR>
where
    PR: ProgressReporter,
{
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResponse> {
        self.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::domain::Ecosystem;

    #[test]
    fn test_directory_project_name_is_sanitised() {
        let dir = tempfile::Builder::new()
            .prefix("my project ")
            .tempdir()
            .unwrap();
        let name = directory_project_name(dir.path());
        assert!(name.starts_with("my-project"));
        assert!(PackageId::project_root(Ecosystem::Npm, &name).is_ok());
    }

    #[test]
    fn test_missing_directory_falls_back() {
        assert_eq!(
            directory_project_name(Path::new("/definitely/not/here")),
            DEFAULT_PROJECT_NAME
        );
    }
}
