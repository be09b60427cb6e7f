use crate::analysis::domain::{DegradationLevel, SkippedAnalysis, StageName, StageResult};
use std::collections::{BTreeMap, BTreeSet};

/// DegradationPolicy grades a run by which stages fell back.
///
/// - minimal: a required stage used its fallback
/// - complete: every triggered optional stage succeeded (or none triggered)
/// - basic: two or more optional stages triggered and all of them failed
/// - partial: anything else
pub struct DegradationPolicy;

impl DegradationPolicy {
    /// A stage missing from `results` counts as not failed; synthesis computes
    /// the level before its own result exists.
    pub fn level(
        results: &BTreeMap<StageName, StageResult>,
        triggered: &BTreeSet<StageName>,
    ) -> DegradationLevel {
        let required_fallback = results
            .values()
            .any(|r| r.stage.is_required() && r.fallback_used);
        if required_fallback {
            return DegradationLevel::Minimal;
        }

        let triggered_optional: Vec<StageName> = triggered
            .iter()
            .copied()
            .filter(|s| !s.is_required())
            .collect();
        let failed = triggered_optional
            .iter()
            .filter(|s| results.get(s).is_some_and(|r| !r.success))
            .count();

        if failed == 0 {
            DegradationLevel::Complete
        } else if triggered_optional.len() >= 2 && failed == triggered_optional.len() {
            DegradationLevel::Basic
        } else {
            DegradationLevel::Partial
        }
    }

    /// One entry per failed stage, in pipeline order
    pub fn skipped(results: &BTreeMap<StageName, StageResult>) -> Vec<SkippedAnalysis> {
        results
            .values()
            .filter(|r| !r.success)
            .map(|r| SkippedAnalysis {
                stage: r.stage,
                reason: r
                    .error
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown failure".to_string()),
                fallback: Self::fallback_description(r.stage).to_string(),
            })
            .collect()
    }

    pub fn fallback_description(stage: StageName) -> &'static str {
        match stage {
            StageName::Vulnerability => "vulnerabilities derived from rule-based findings only",
            StageName::Reputation => "neutral reputation scores",
            StageName::DeepInspection | StageName::SupplyChainPattern => "analysis omitted",
            StageName::Synthesis => "reduced report built from successful stages",
        }
    }
}
