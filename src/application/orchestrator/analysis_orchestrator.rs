use super::{AnalysisRun, StageBudgets};
use crate::analysis::domain::{
    AnalysisReport, DependencyGraph, Finding, FindingType, InspectionPayload, PackageVulnerabilities,
    PatternPayload, ReputationPayload, ReputationScore, StageContext, StageError, StageName,
    StagePayload, StageResult, Vulnerability, VulnerabilityPayload,
};
use crate::analysis::policies::reputation_policy::REPUTATION_UNAVAILABLE_FLAG;
use crate::analysis::policies::{DegradationPolicy, TriggerPolicy};
use crate::analysis::services::{ReportSchema, ReportSynthesizer};
use crate::ports::outbound::{ProgressReporter, StageAnalyzer};
use crate::shared::{Clock, SystemClock};
use futures::FutureExt;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Source label of the vulnerability fallback payload
pub const RULE_BASED_SOURCE: &str = "rule-based";

/// AnalysisOrchestrator runs the staged pipeline over a built graph.
///
/// Stages execute in [`StageName::ORDER`]. Required stages always run;
/// optional ones only when [`TriggerPolicy`] says so. Each stage gets its
/// own time budget, panics are caught, and every payload is validated
/// before it is accepted. A failing stage is replaced by its fallback
/// payload so later stages always see a well-formed context, and the run
/// is graded by [`DegradationPolicy`]. Nothing but a report comes out of
/// [`run`](Self::run): stage failures never escape as errors.
pub struct AnalysisOrchestrator {
    analyzers: BTreeMap<StageName, Box<dyn StageAnalyzer>>,
    budgets: StageBudgets,
    clock: Arc<dyn Clock>,
}

impl AnalysisOrchestrator {
    pub fn new(budgets: StageBudgets) -> Self {
        Self {
            analyzers: BTreeMap::new(),
            budgets,
            clock: Arc::new(SystemClock),
        }
    }

    /// Registers the analyzer for its stage, replacing any previous one
    pub fn with_analyzer(mut self, analyzer: Box<dyn StageAnalyzer>) -> Self {
        self.analyzers.insert(analyzer.stage(), analyzer);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn budgets(&self) -> &StageBudgets {
        &self.budgets
    }

    pub async fn run(
        &self,
        graph: DependencyGraph,
        findings: Vec<Finding>,
        progress: &dyn ProgressReporter,
    ) -> AnalysisRun {
        let run_id = Uuid::new_v4();
        let started_at = self.clock.now();
        let mut results: BTreeMap<StageName, StageResult> = BTreeMap::new();
        let mut triggered: BTreeSet<StageName> = BTreeSet::new();
        let total = StageName::ORDER.len();

        tracing::info!(%run_id, packages = graph.package_count(), "analysis run started");

        for (index, stage) in StageName::ORDER.into_iter().enumerate() {
            if !stage.is_required() && !TriggerPolicy::should_run(stage, &findings, &results) {
                tracing::debug!(%stage, "stage not triggered");
                progress.report_progress(index + 1, total, Some(format!("{} (skipped)", stage).as_str()));
                continue;
            }
            triggered.insert(stage);
            progress.report_progress(index, total, Some(stage.as_str()));

            let result = {
                let ctx = StageContext {
                    run_id,
                    started_at,
                    graph: &graph,
                    findings: &findings,
                    results: &results,
                    triggered: &triggered,
                };
                self.execute_stage(stage, &ctx)
                    .instrument(tracing::info_span!("stage", %stage))
                    .await
            };
            if let Some(error) = &result.error {
                progress.report_warning(&format!("{} stage {}; using fallback", stage, error));
            }
            progress.report_progress(index + 1, total, Some(stage.as_str()));
            results.insert(stage, result);
        }

        let degradation_level = DegradationPolicy::level(&results, &triggered);
        let mut report = Self::extract_report(&results, run_id, started_at, &graph, &findings, &triggered);
        report.metadata.degradation_level = degradation_level;
        report.degradation.level = degradation_level;

        tracing::info!(%run_id, level = %degradation_level, "analysis run finished");
        AnalysisRun {
            run_id,
            graph,
            findings,
            results,
            triggered,
            degradation_level,
            report,
        }
    }

    async fn execute_stage(&self, stage: StageName, ctx: &StageContext<'_>) -> StageResult {
        let started = Instant::now();
        let budget = self.budgets.for_stage(stage);

        let outcome = match self.analyzers.get(&stage) {
            None => Err(StageError::Failed {
                reason: "no analyzer registered".to_string(),
            }),
            Some(analyzer) => {
                let guarded = AssertUnwindSafe(analyzer.analyze(ctx)).catch_unwind();
                match tokio::time::timeout(budget, guarded).await {
                    Err(_) => Err(StageError::Timeout {
                        timeout_ms: budget.as_millis() as u64,
                    }),
                    Ok(Err(panic)) => Err(StageError::Panicked {
                        reason: panic_message(panic.as_ref()),
                    }),
                    Ok(Ok(Err(e))) => Err(StageError::Failed {
                        reason: e.to_string(),
                    }),
                    Ok(Ok(Ok(payload))) => Self::validate_payload(stage, &payload, ctx.graph)
                        .map(|_| payload)
                        .map_err(|reason| StageError::Validation { reason }),
                }
            }
        };

        let duration = started.elapsed();
        match outcome {
            Ok(payload) => {
                tracing::debug!(duration_ms = duration.as_millis() as u64, "stage succeeded");
                StageResult::succeeded(payload, duration)
            }
            Err(error) => {
                tracing::warn!(error = %error, "stage failed, using fallback");
                let fallback = Self::fallback_payload(stage, ctx, &error);
                StageResult::failed(stage, error, fallback, duration, stage.is_required())
            }
        }
    }

    /// Checks a stage payload against its contract
    ///
    /// The tag must match the stage, every package key must exist in the
    /// graph, scores and confidences must lie in [0, 1] and a synthesised
    /// report must carry every required section.
    pub fn validate_payload(
        stage: StageName,
        payload: &StagePayload,
        graph: &DependencyGraph,
    ) -> std::result::Result<(), String> {
        if payload.stage() != stage {
            return Err(format!(
                "expected a {} payload, got {}",
                stage,
                payload.stage()
            ));
        }
        if let Some(key) = payload
            .package_keys()
            .into_iter()
            .find(|key| !graph.contains_key(key))
        {
            return Err(format!("package '{}' is not in the dependency graph", key));
        }

        let findings_in_range =
            |findings: &[Finding]| findings.iter().all(|f| (0.0..=1.0).contains(&f.confidence));

        match payload {
            StagePayload::Vulnerability(_) => Ok(()),
            StagePayload::Reputation(p) => {
                if let Some((key, _)) = p
                    .packages
                    .iter()
                    .find(|(key, score)| !score.is_within_bounds() || score.package.key() != **key)
                {
                    return Err(format!("reputation score for '{}' is inconsistent", key));
                }
                if !findings_in_range(p.findings.as_slice()) {
                    return Err("finding confidence outside [0, 1]".to_string());
                }
                Ok(())
            }
            StagePayload::DeepInspection(InspectionPayload { packages })
            | StagePayload::SupplyChainPattern(PatternPayload { packages }) => {
                if packages.values().all(|f| findings_in_range(f.as_slice())) {
                    Ok(())
                } else {
                    Err("finding confidence outside [0, 1]".to_string())
                }
            }
            StagePayload::Synthesis(report) => {
                ReportSchema::validate(report).map_err(|e| e.to_string())?;
                match report.packages.keys().find(|key| !graph.contains_key(key)) {
                    Some(key) => Err(format!("report package '{}' is not in the dependency graph", key)),
                    None => Ok(()),
                }
            }
        }
    }

    fn fallback_payload(stage: StageName, ctx: &StageContext<'_>, error: &StageError) -> StagePayload {
        match stage {
            StageName::Vulnerability => {
                StagePayload::Vulnerability(Self::rule_based_vulnerabilities(ctx))
            }
            StageName::Reputation => {
                let reason = format!("reputation stage {}", error);
                StagePayload::Reputation(ReputationPayload {
                    packages: ctx
                        .graph
                        .packages()
                        .into_iter()
                        .map(|id| {
                            (
                                id.key(),
                                ReputationScore::neutral(id.clone(), REPUTATION_UNAVAILABLE_FLAG, &reason),
                            )
                        })
                        .collect(),
                    findings: Vec::new(),
                })
            }
            StageName::DeepInspection => StagePayload::DeepInspection(InspectionPayload::default()),
            StageName::SupplyChainPattern => {
                StagePayload::SupplyChainPattern(PatternPayload::default())
            }
            StageName::Synthesis => {
                StagePayload::Synthesis(Box::new(ReportSynthesizer::reduced(ctx, &error.to_string())))
            }
        }
    }

    /// Vulnerabilities derived from the rule-based `KnownVulnerability` findings
    fn rule_based_vulnerabilities(ctx: &StageContext<'_>) -> VulnerabilityPayload {
        let mut packages: BTreeMap<String, PackageVulnerabilities> = BTreeMap::new();
        for finding in ctx
            .findings
            .iter()
            .filter(|f| f.finding_type == FindingType::KnownVulnerability)
        {
            let key = finding.package.key();
            if !ctx.graph.contains_key(&key) {
                continue;
            }
            let id = finding
                .evidence
                .first()
                .and_then(|e| e.split(':').next())
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .unwrap_or(RULE_BASED_SOURCE)
                .to_string();
            let summary = (!finding.evidence.is_empty()).then(|| finding.evidence.join("; "));
            if let Ok(vulnerability) = Vulnerability::new(id, None, finding.severity, None, summary) {
                packages
                    .entry(key)
                    .or_default()
                    .vulnerabilities
                    .push(vulnerability);
            }
        }
        VulnerabilityPayload {
            packages,
            source: RULE_BASED_SOURCE.to_string(),
        }
    }

    fn extract_report(
        results: &BTreeMap<StageName, StageResult>,
        run_id: Uuid,
        started_at: chrono::DateTime<chrono::Utc>,
        graph: &DependencyGraph,
        findings: &[Finding],
        triggered: &BTreeSet<StageName>,
    ) -> AnalysisReport {
        if let Some(StagePayload::Synthesis(report)) =
            results.get(&StageName::Synthesis).map(|r| &r.payload)
        {
            return report.as_ref().clone();
        }
        let ctx = StageContext {
            run_id,
            started_at,
            graph,
            findings,
            results,
            triggered,
        };
        ReportSynthesizer::reduced(&ctx, "synthesis produced no report")
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
