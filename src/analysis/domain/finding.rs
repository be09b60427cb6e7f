use super::{PackageId, Severity};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingType {
    KnownVulnerability,
    MaliciousCode,
    Typosquatting,
    InstallScript,
    LowReputation,
    SupplyChainPattern,
    Other(String),
}

impl fmt::Display for FindingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingType::KnownVulnerability => write!(f, "known-vulnerability"),
            FindingType::MaliciousCode => write!(f, "malicious-code"),
            FindingType::Typosquatting => write!(f, "typosquatting"),
            FindingType::InstallScript => write!(f, "install-script"),
            FindingType::LowReputation => write!(f, "low-reputation"),
            FindingType::SupplyChainPattern => write!(f, "supply-chain-pattern"),
            FindingType::Other(label) => write!(f, "{}", label),
        }
    }
}

/// A single piece of evidence that a package is risky.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub package: PackageId,
    pub finding_type: FindingType,
    pub severity: Severity,
    /// In [0, 1]
    pub confidence: f64,
    pub evidence: Vec<String>,
}

impl Finding {
    pub fn new(
        package: PackageId,
        finding_type: FindingType,
        severity: Severity,
        confidence: f64,
        evidence: Vec<String>,
    ) -> Self {
        Self {
            package,
            finding_type,
            severity,
            confidence: confidence.clamp(0.0, 1.0),
            evidence,
        }
    }

    /// Contribution of this finding to package risk
    pub fn weighted_severity(&self) -> f64 {
        self.severity.weight() * self.confidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::domain::Ecosystem;

    #[test]
    fn test_confidence_is_clamped() {
        let id = PackageId::new(Ecosystem::Npm, "x", "1.0.0").unwrap();
        let finding = Finding::new(id, FindingType::MaliciousCode, Severity::High, 1.7, vec![]);
        assert_eq!(finding.confidence, 1.0);
        assert!((finding.weighted_severity() - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_finding_type_display() {
        assert_eq!(FindingType::Typosquatting.to_string(), "typosquatting");
        assert_eq!(FindingType::Other("custom".into()).to_string(), "custom");
    }
}
