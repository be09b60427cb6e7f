use super::{AnalysisReport, Finding, PackageVulnerabilities, ReputationScore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Pipeline stages; declaration order is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageName {
    Vulnerability,
    Reputation,
    DeepInspection,
    SupplyChainPattern,
    Synthesis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Required,
    Optional,
}

impl StageName {
    pub const ORDER: [StageName; 5] = [
        StageName::Vulnerability,
        StageName::Reputation,
        StageName::DeepInspection,
        StageName::SupplyChainPattern,
        StageName::Synthesis,
    ];

    pub fn kind(self) -> StageKind {
        match self {
            StageName::DeepInspection | StageName::SupplyChainPattern => StageKind::Optional,
            _ => StageKind::Required,
        }
    }

    pub fn is_required(self) -> bool {
        self.kind() == StageKind::Required
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StageName::Vulnerability => "vulnerability",
            StageName::Reputation => "reputation",
            StageName::DeepInspection => "deep-inspection",
            StageName::SupplyChainPattern => "supply-chain-pattern",
            StageName::Synthesis => "synthesis",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VulnerabilityPayload {
    /// PackageId::key -> vulnerabilities
    pub packages: BTreeMap<String, PackageVulnerabilities>,
    /// Where the data came from (e.g. "osv", "rule-based")
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReputationPayload {
    pub packages: BTreeMap<String, ReputationScore>,
    /// Standalone low-reputation findings
    pub findings: Vec<Finding>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct InspectionPayload {
    pub packages: BTreeMap<String, Vec<Finding>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PatternPayload {
    pub packages: BTreeMap<String, Vec<Finding>>,
}

/// Typed output of one stage. The variant must match the stage that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum StagePayload {
    Vulnerability(VulnerabilityPayload),
    Reputation(ReputationPayload),
    DeepInspection(InspectionPayload),
    SupplyChainPattern(PatternPayload),
    Synthesis(Box<AnalysisReport>),
}

impl StagePayload {
    pub fn stage(&self) -> StageName {
        match self {
            StagePayload::Vulnerability(_) => StageName::Vulnerability,
            StagePayload::Reputation(_) => StageName::Reputation,
            StagePayload::DeepInspection(_) => StageName::DeepInspection,
            StagePayload::SupplyChainPattern(_) => StageName::SupplyChainPattern,
            StagePayload::Synthesis(_) => StageName::Synthesis,
        }
    }

    /// Package keys this payload refers to (empty for synthesis)
    pub fn package_keys(&self) -> Vec<String> {
        match self {
            StagePayload::Vulnerability(p) => p.packages.keys().cloned().collect(),
            StagePayload::Reputation(p) => p
                .packages
                .keys()
                .cloned()
                .chain(p.findings.iter().map(|f| f.package.key()))
                .collect(),
            StagePayload::DeepInspection(p) => p.packages.keys().cloned().collect(),
            StagePayload::SupplyChainPattern(p) => p.packages.keys().cloned().collect(),
            StagePayload::Synthesis(_) => Vec::new(),
        }
    }

    pub fn as_vulnerability(&self) -> Option<&VulnerabilityPayload> {
        match self {
            StagePayload::Vulnerability(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_reputation(&self) -> Option<&ReputationPayload> {
        match self {
            StagePayload::Reputation(p) => Some(p),
            _ => None,
        }
    }

    /// Findings carried by the deep-inspection or supply-chain-pattern payloads
    pub fn package_findings(&self) -> Option<&BTreeMap<String, Vec<Finding>>> {
        match self {
            StagePayload::DeepInspection(p) => Some(&p.packages),
            StagePayload::SupplyChainPattern(p) => Some(&p.packages),
            _ => None,
        }
    }
}

/// Why a stage did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StageError {
    Timeout { timeout_ms: u64 },
    Failed { reason: String },
    Validation { reason: String },
    Panicked { reason: String },
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::Timeout { timeout_ms } => write!(f, "timed out after {}ms", timeout_ms),
            StageError::Failed { reason } => write!(f, "failed: {}", reason),
            StageError::Validation { reason } => write!(f, "invalid payload: {}", reason),
            StageError::Panicked { reason } => write!(f, "panicked: {}", reason),
        }
    }
}

/// Outcome of one executed stage. The payload is always present; on failure
/// it is the stage's fallback payload.
#[derive(Debug, Clone)]
pub struct StageResult {
    pub stage: StageName,
    pub success: bool,
    pub payload: StagePayload,
    pub error: Option<StageError>,
    pub duration: Duration,
    pub fallback_used: bool,
}

impl StageResult {
    pub fn succeeded(payload: StagePayload, duration: Duration) -> Self {
        Self {
            stage: payload.stage(),
            success: true,
            payload,
            error: None,
            duration,
            fallback_used: false,
        }
    }

    pub fn failed(
        stage: StageName,
        error: StageError,
        fallback: StagePayload,
        duration: Duration,
        fallback_used: bool,
    ) -> Self {
        Self {
            stage,
            success: false,
            payload: fallback,
            error: Some(error),
            duration,
            fallback_used,
        }
    }
}
