use crate::analysis::domain::{AnalysisReport, DegradationLevel, DependencyGraph};
use crate::application::services::CacheStats;

/// AnalysisResponse - Internal response DTO from the project analysis use case
///
/// Carries the final report together with the graph it was built from,
/// so adapters can render either.
#[derive(Debug, Clone)]
pub struct AnalysisResponse {
    pub report: AnalysisReport,
    pub graph: DependencyGraph,
    /// Keys of packages whose risk reached the requested threshold
    pub packages_above_threshold: Vec<String>,
    /// Used to determine the exit code for CI integration
    pub has_risk_above_threshold: bool,
    pub cache_stats: CacheStats,
}

impl AnalysisResponse {
    pub fn new(
        report: AnalysisReport,
        graph: DependencyGraph,
        fail_on_risk: Option<f64>,
        cache_stats: CacheStats,
    ) -> Self {
        let packages_above_threshold: Vec<String> = fail_on_risk
            .map(|threshold| {
                report
                    .packages_at_or_above(threshold)
                    .into_iter()
                    .map(|p| p.id.key())
                    .collect()
            })
            .unwrap_or_default();
        Self {
            has_risk_above_threshold: !packages_above_threshold.is_empty(),
            packages_above_threshold,
            report,
            graph,
            cache_stats,
        }
    }

    pub fn degradation_level(&self) -> DegradationLevel {
        self.report.degradation.level
    }
}
