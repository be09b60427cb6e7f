use super::{Ecosystem, Finding, PackageId, ReputationScore, Severity, StageName, Vulnerability};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// How much of the pipeline ran as intended. Ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegradationLevel {
    Complete,
    Partial,
    Basic,
    Minimal,
}

impl fmt::Display for DegradationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DegradationLevel::Complete => "complete",
            DegradationLevel::Partial => "partial",
            DegradationLevel::Basic => "basic",
            DegradationLevel::Minimal => "minimal",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSummary {
    pub stage: StageName,
    pub success: bool,
    pub fallback_used: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub tool_name: String,
    pub tool_version: String,
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub root_project: String,
    pub ecosystem: Ecosystem,
    pub degradation_level: DegradationLevel,
    pub package_count: usize,
    pub stages: Vec<StageSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
            Severity::None => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_packages: usize,
    /// Severity counts over vulnerabilities and findings
    pub by_severity: SeverityCounts,
    pub vulnerable_packages: usize,
    pub low_reputation_packages: usize,
    /// Highest package risk score in the report
    pub overall_risk: f64,
    pub highest_risk_package: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageReport {
    pub id: PackageId,
    pub vulnerabilities: Vec<Vulnerability>,
    pub reputation: Option<ReputationScore>,
    pub findings: Vec<Finding>,
    pub risk_score: f64,
    /// Root-to-package paths rendered as `name@version`
    pub dependency_paths: Vec<Vec<String>>,
    #[serde(default)]
    pub paths_truncated_by_cycle: bool,
    /// More chains exist than the report lists
    #[serde(default)]
    pub paths_truncated_by_limit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedAnalysis {
    pub stage: StageName,
    pub reason: String,
    pub fallback: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degradation {
    pub level: DegradationLevel,
    pub skipped: Vec<SkippedAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictIssue {
    pub name: String,
    pub versions: BTreeMap<String, Vec<Vec<String>>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedIssue {
    pub package: String,
    pub requested_range: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphIssues {
    pub cycles: Vec<Vec<String>>,
    pub conflicts: Vec<ConflictIssue>,
    pub unresolved: Vec<UnresolvedIssue>,
}

/// Final, serializable result of an analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    pub summary: ReportSummary,
    /// PackageId::key -> package view
    pub packages: BTreeMap<String, PackageReport>,
    pub recommendations: Vec<String>,
    pub degradation: Degradation,
    pub graph_issues: GraphIssues,
}

impl AnalysisReport {
    /// Packages whose risk score is at or above `threshold`
    pub fn packages_at_or_above(&self, threshold: f64) -> Vec<&PackageReport> {
        self.packages
            .values()
            .filter(|p| p.risk_score >= threshold)
            .collect()
    }
}
