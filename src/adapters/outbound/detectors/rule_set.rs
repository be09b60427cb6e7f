//! Versioned rule configuration for the rule-based detector

use crate::analysis::domain::{FindingType, Severity};
use crate::shared::error::AnalysisError;
use crate::shared::security::read_manifest_file;
use crate::shared::Result;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// A signature rule matched against package names (and optionally versions)
#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    /// Unique identifier (e.g., "CS-001")
    pub id: String,
    pub description: String,
    /// Ecosystem the rule applies to; all ecosystems when absent
    #[serde(default)]
    pub ecosystem: Option<String>,
    /// Regular expression matched against the full package name
    pub name_pattern: String,
    /// Version range the rule is limited to
    #[serde(default)]
    pub versions: Option<String>,
    pub finding_type: FindingType,
    pub severity: Severity,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_confidence() -> f64 {
    0.8
}

fn default_true() -> bool {
    true
}

fn default_max_distance() -> usize {
    1
}

fn default_min_length() -> usize {
    4
}

/// Popular names per ecosystem that lookalike names are compared against
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TyposquatSettings {
    #[serde(default = "default_max_distance")]
    pub max_distance: usize,
    /// Names shorter than this are never flagged
    #[serde(default = "default_min_length")]
    pub min_name_length: usize,
    /// Ecosystem display name ("npm", "pypi") -> popular package names
    #[serde(default)]
    pub popular: BTreeMap<String, Vec<String>>,
}

/// Injected, versioned rule configuration
///
/// Loaded from YAML:
/// ```yaml
/// version: "team-rules@3"
/// rules:
///   - id: CS-100
///     description: Compromised release
///     ecosystem: npm
///     name_pattern: "^event-stream$"
///     versions: "=3.3.6"
///     finding_type: malicious_code
///     severity: critical
/// typosquatting:
///   max_distance: 1
///   popular:
///     npm: [express, lodash]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSet {
    pub version: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub typosquatting: Option<TyposquatSettings>,
}

impl RuleSet {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let rule_set: RuleSet =
            serde_yaml_ng::from_str(content).map_err(|e| AnalysisError::Validation {
                message: format!("invalid rule set: {}", e),
            })?;
        if rule_set.version.trim().is_empty() {
            return Err(AnalysisError::Validation {
                message: "rule set version must not be empty".to_string(),
            }
            .into());
        }
        Ok(rule_set)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = read_manifest_file(path, "rule set")?;
        Self::from_yaml_str(&content)
    }

    /// Small fixture set shipped with the binary
    pub fn builtin() -> Self {
        let rule = |id: &str,
                    description: &str,
                    ecosystem: &str,
                    name_pattern: &str,
                    versions: Option<&str>,
                    finding_type: FindingType,
                    severity: Severity| Rule {
            id: id.to_string(),
            description: description.to_string(),
            ecosystem: Some(ecosystem.to_string()),
            name_pattern: name_pattern.to_string(),
            versions: versions.map(str::to_string),
            finding_type,
            severity,
            confidence: 0.9,
            enabled: true,
        };

        let popular = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();

        Self {
            version: "builtin@1".to_string(),
            rules: vec![
                rule(
                    "CS-001",
                    "event-stream release carrying the flatmap-stream payload",
                    "npm",
                    "^event-stream$",
                    Some("=3.3.6"),
                    FindingType::MaliciousCode,
                    Severity::Critical,
                ),
                rule(
                    "CS-002",
                    "flatmap-stream was published only to ship a wallet-stealing payload",
                    "npm",
                    "^flatmap-stream$",
                    None,
                    FindingType::MaliciousCode,
                    Severity::Critical,
                ),
                rule(
                    "CS-003",
                    "ua-parser-js releases hijacked to install a cryptominer",
                    "npm",
                    "^ua-parser-js$",
                    Some("=0.7.29 || =0.8.0 || =1.0.0"),
                    FindingType::KnownVulnerability,
                    Severity::Critical,
                ),
                rule(
                    "CS-004",
                    "ctx releases replaced with a credential exfiltrating build",
                    "pypi",
                    "^ctx$",
                    Some("=0.2.2 || =0.2.6"),
                    FindingType::KnownVulnerability,
                    Severity::Critical,
                ),
            ],
            typosquatting: Some(TyposquatSettings {
                max_distance: default_max_distance(),
                min_name_length: default_min_length(),
                popular: BTreeMap::from([
                    (
                        "npm".to_string(),
                        popular(&[
                            "express", "react", "lodash", "axios", "chalk", "commander",
                            "webpack", "typescript", "eslint", "prettier", "jest", "dotenv",
                            "mongoose", "jsonwebtoken", "nodemailer",
                        ]),
                    ),
                    (
                        "pypi".to_string(),
                        popular(&[
                            "requests", "django", "flask", "numpy", "pandas", "scipy",
                            "boto3", "urllib3", "setuptools", "cryptography", "pyyaml",
                            "pillow", "colorama",
                        ]),
                    ),
                ]),
            }),
        }
    }
}
