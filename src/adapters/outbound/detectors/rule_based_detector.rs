use super::rule_set::{Rule, RuleSet, TyposquatSettings};
use crate::analysis::domain::{Finding, FindingType, PackageId, Severity};
use crate::analysis::services::VersionResolver;
use crate::ports::outbound::FindingDetector;
use crate::shared::error::AnalysisError;
use crate::shared::Result;
use regex::Regex;

/// A rule with its name pattern compiled
struct CompiledRule {
    rule: Rule,
    name: Regex,
}

impl CompiledRule {
    fn matches(&self, package: &PackageId) -> bool {
        if let Some(ecosystem) = &self.rule.ecosystem {
            if !ecosystem.eq_ignore_ascii_case(&package.ecosystem.to_string()) {
                return false;
            }
        }
        if !self.name.is_match(package.name()) {
            return false;
        }
        match &self.rule.versions {
            Some(range) => {
                VersionResolver::resolve(range, std::iter::once(package.version())).is_some()
            }
            None => true,
        }
    }

    fn finding(&self, package: &PackageId) -> Finding {
        Finding::new(
            package.clone(),
            self.rule.finding_type.clone(),
            self.rule.severity,
            self.rule.confidence,
            vec![format!("{}: {}", self.rule.id, self.rule.description)],
        )
    }
}

/// RuleBasedDetector runs signature rules and a typosquatting check.
///
/// Offline and deterministic: the rule set is injected at construction, so
/// tests run against fixture sets and the binary against the built-in or a
/// user-supplied YAML file.
pub struct RuleBasedDetector {
    version: String,
    rules: Vec<CompiledRule>,
    typosquatting: Option<TyposquatSettings>,
}

impl RuleBasedDetector {
    /// Compiles every enabled rule
    ///
    /// # Errors
    /// Returns `AnalysisError::Validation` when a name pattern is not a valid regex
    pub fn new(rule_set: RuleSet) -> Result<Self> {
        let rules = rule_set
            .rules
            .into_iter()
            .filter(|rule| rule.enabled)
            .map(|rule| {
                let name = Regex::new(&rule.name_pattern).map_err(|e| AnalysisError::Validation {
                    message: format!("rule {} has an invalid name pattern: {}", rule.id, e),
                })?;
                Ok(CompiledRule { rule, name })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(version = %rule_set.version, rules = rules.len(), "rule set compiled");
        Ok(Self {
            version: rule_set.version,
            rules,
            typosquatting: rule_set.typosquatting,
        })
    }

    pub fn builtin() -> Result<Self> {
        Self::new(RuleSet::builtin())
    }

    fn typosquat_finding(&self, package: &PackageId) -> Option<Finding> {
        let settings = self.typosquatting.as_ref()?;
        let popular = settings.popular.get(&package.ecosystem.to_string())?;
        let name = package.name().to_lowercase();
        if name.chars().count() < settings.min_name_length {
            return None;
        }
        if popular.iter().any(|p| p.eq_ignore_ascii_case(&name)) {
            return None;
        }

        let (target, distance) = popular
            .iter()
            .map(|p| (p, levenshtein::levenshtein(&name, &p.to_lowercase())))
            .filter(|(_, distance)| *distance <= settings.max_distance)
            .min_by_key(|(_, distance)| *distance)?;

        Some(Finding::new(
            package.clone(),
            FindingType::Typosquatting,
            Severity::Medium,
            if distance == 1 { 0.7 } else { 0.5 },
            vec![format!(
                "name is {} edit(s) away from popular package '{}'",
                distance, target
            )],
        ))
    }
}

impl FindingDetector for RuleBasedDetector {
    fn rule_set_version(&self) -> String {
        self.version.clone()
    }

    fn detect(&self, packages: &[PackageId]) -> Vec<Finding> {
        let mut findings = Vec::new();
        for package in packages {
            findings.extend(
                self.rules
                    .iter()
                    .filter(|rule| rule.matches(package))
                    .map(|rule| rule.finding(package)),
            );
            findings.extend(self.typosquat_finding(package));
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::domain::Ecosystem;

    fn npm(name: &str, version: &str) -> PackageId {
        PackageId::new(Ecosystem::Npm, name, version).unwrap()
    }

    #[test]
    fn test_version_scoped_rule() {
        let detector = RuleBasedDetector::builtin().unwrap();
        let findings = detector.detect(&[npm("event-stream", "3.3.6"), npm("event-stream", "4.0.1")]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].package.version(), "3.3.6");
        assert_eq!(findings[0].finding_type, FindingType::MaliciousCode);
        assert!(findings[0].evidence[0].starts_with("CS-001"));
    }

    #[test]
    fn test_ecosystem_scoped_rule() {
        let detector = RuleBasedDetector::builtin().unwrap();
        let pypi = PackageId::new(Ecosystem::PyPI, "flatmap-stream", "0.1.1").unwrap();
        assert!(detector.detect(&[pypi]).is_empty());
        assert_eq!(detector.detect(&[npm("flatmap-stream", "0.1.1")]).len(), 1);
    }

    #[test]
    fn test_typosquatting() {
        let detector = RuleBasedDetector::builtin().unwrap();
        let findings = detector.detect(&[npm("expres", "1.0.0"), npm("express", "4.18.2")]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].finding_type, FindingType::Typosquatting);
        assert!(findings[0].evidence[0].contains("express"));
    }

    #[test]
    fn test_short_names_are_not_typosquats() {
        let detector = RuleBasedDetector::builtin().unwrap();
        assert!(detector.detect(&[npm("jes", "1.0.0")]).is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let rule_set = RuleSet::from_yaml_str(
            "version: bad@1\nrules:\n  - id: B\n    description: x\n    name_pattern: \"(\"\n    finding_type: malicious_code\n    severity: high\n",
        )
        .unwrap();
        assert!(RuleBasedDetector::new(rule_set).is_err());
    }

    #[test]
    fn test_disabled_rules_are_skipped() {
        let rule_set = RuleSet::from_yaml_str(
            "version: off@1\nrules:\n  - id: D\n    description: x\n    name_pattern: \".*\"\n    finding_type: malicious_code\n    severity: high\n    enabled: false\n",
        )
        .unwrap();
        let detector = RuleBasedDetector::new(rule_set).unwrap();
        assert_eq!(detector.rule_set_version(), "off@1");
        assert!(detector.detect(&[npm("anything", "1.0.0")]).is_empty());
    }
}
