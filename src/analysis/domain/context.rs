use super::{
    DependencyGraph, Finding, ReputationPayload, StageName, StageResult, VulnerabilityPayload,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Read-only view of a run handed to each stage analyzer.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub graph: &'a DependencyGraph,
    /// Rule-based findings produced before the pipeline started
    pub findings: &'a [Finding],
    /// Results of the stages that already ran
    pub results: &'a BTreeMap<StageName, StageResult>,
    pub triggered: &'a BTreeSet<StageName>,
}

impl<'a> StageContext<'a> {
    pub fn result(&self, stage: StageName) -> Option<&'a StageResult> {
        self.results.get(&stage)
    }

    pub fn vulnerabilities(&self) -> Option<&'a VulnerabilityPayload> {
        self.result(StageName::Vulnerability)
            .and_then(|r| r.payload.as_vulnerability())
    }

    pub fn reputation(&self) -> Option<&'a ReputationPayload> {
        self.result(StageName::Reputation)
            .and_then(|r| r.payload.as_reputation())
    }

    /// Initial findings attached to one package key
    pub fn findings_for(&self, key: &str) -> Vec<&'a Finding> {
        let findings: &'a [Finding] = self.findings;
        findings.iter().filter(|f| f.package.key() == key).collect()
    }
}
