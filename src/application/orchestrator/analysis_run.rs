use crate::analysis::domain::{
    AnalysisReport, DegradationLevel, DependencyGraph, Finding, StageName, StageResult,
};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Everything one pipeline execution produced. Not persisted.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub run_id: Uuid,
    pub graph: DependencyGraph,
    /// Rule-based findings the run started from
    pub findings: Vec<Finding>,
    pub results: BTreeMap<StageName, StageResult>,
    /// Stages that ran, required ones included
    pub triggered: BTreeSet<StageName>,
    pub degradation_level: DegradationLevel,
    pub report: AnalysisReport,
}

impl AnalysisRun {
    pub fn result(&self, stage: StageName) -> Option<&StageResult> {
        self.results.get(&stage)
    }

    pub fn failed_stages(&self) -> Vec<StageName> {
        self.results
            .values()
            .filter(|r| !r.success)
            .map(|r| r.stage)
            .collect()
    }
}
