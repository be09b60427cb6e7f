use crate::shared::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity shared by vulnerabilities, findings and risk factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Numeric weight used in package risk scoring
    pub fn weight(self) -> f64 {
        match self {
            Severity::None => 0.0,
            Severity::Low => 0.2,
            Severity::Medium => 0.5,
            Severity::High => 0.8,
            Severity::Critical => 1.0,
        }
    }

    /// Maps a CVSS base score onto the qualitative CVSS v3 bands
    pub fn from_cvss_score(score: CvssScore) -> Self {
        match score.value() {
            s if s >= 9.0 => Severity::Critical,
            s if s >= 7.0 => Severity::High,
            s if s >= 4.0 => Severity::Medium,
            s if s > 0.0 => Severity::Low,
            _ => Severity::None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        write!(f, "{}", label)
    }
}

/// CVSS base score in [0.0, 10.0]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct CvssScore(f32);

impl CvssScore {
    pub fn new(value: f32) -> Result<Self> {
        if !(0.0..=10.0).contains(&value) {
            anyhow::bail!("CVSS score must be between 0.0 and 10.0, got {}", value);
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl TryFrom<f32> for CvssScore {
    type Error = anyhow::Error;

    fn try_from(value: f32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<CvssScore> for f32 {
    fn from(value: CvssScore) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub id: String,
    pub cvss_score: Option<CvssScore>,
    pub severity: Severity,
    pub fixed_version: Option<String>,
    pub summary: Option<String>,
}

impl Vulnerability {
    pub fn new(
        id: String,
        cvss_score: Option<CvssScore>,
        severity: Severity,
        fixed_version: Option<String>,
        summary: Option<String>,
    ) -> Result<Self> {
        if id.trim().is_empty() {
            anyhow::bail!("Vulnerability id cannot be empty");
        }
        Ok(Self {
            id,
            cvss_score,
            severity,
            fixed_version,
            summary,
        })
    }
}

/// Vulnerabilities known for one package version
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PackageVulnerabilities {
    pub vulnerabilities: Vec<Vulnerability>,
}

impl PackageVulnerabilities {
    pub fn new(vulnerabilities: Vec<Vulnerability>) -> Self {
        Self { vulnerabilities }
    }

    pub fn max_severity(&self) -> Severity {
        self.vulnerabilities
            .iter()
            .map(|v| v.severity)
            .max()
            .unwrap_or(Severity::None)
    }

    pub fn is_empty(&self) -> bool {
        self.vulnerabilities.is_empty()
    }
}
