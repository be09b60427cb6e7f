use crate::analysis::domain::{Finding, PackageVulnerabilities, ReputationScore};

/// Weight of the reputation deficit in the package risk score
pub const REPUTATION_RISK_WEIGHT: f64 = 0.6;

/// RiskPolicy combines the three risk signals of a package into one score:
/// `max(vulnerability severity, (1 - composite) * 0.6, severity * confidence)`.
pub struct RiskPolicy;

impl RiskPolicy {
    pub fn package_risk(
        vulnerabilities: Option<&PackageVulnerabilities>,
        reputation: Option<&ReputationScore>,
        findings: &[Finding],
    ) -> f64 {
        let vuln_component = vulnerabilities
            .map(|v| v.max_severity().weight())
            .unwrap_or(0.0);
        let reputation_component = reputation
            .map(|r| (1.0 - r.composite) * REPUTATION_RISK_WEIGHT)
            .unwrap_or(0.0);
        let finding_component = findings
            .iter()
            .map(Finding::weighted_severity)
            .fold(0.0, f64::max);

        vuln_component
            .max(reputation_component)
            .max(finding_component)
            .clamp(0.0, 1.0)
    }
}
