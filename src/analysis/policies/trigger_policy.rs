use super::reputation_policy::HIGH_RISK_THRESHOLD;
use crate::analysis::domain::{Finding, Severity, StageName, StageResult};
use std::collections::{BTreeMap, BTreeSet};

/// TriggerPolicy decides whether the optional stages run.
///
/// - deep inspection: some package is suspicious (initial finding >= Medium,
///   a vulnerability >= High, or a reputation finding)
/// - supply-chain pattern: the reputation stage scored some package below
///   [`HIGH_RISK_THRESHOLD`]
pub struct TriggerPolicy;

impl TriggerPolicy {
    /// Keys of packages flagged as suspicious so far
    pub fn suspicious_packages(
        initial_findings: &[Finding],
        results: &BTreeMap<StageName, StageResult>,
    ) -> BTreeSet<String> {
        let mut suspicious: BTreeSet<String> = initial_findings
            .iter()
            .filter(|f| f.severity >= Severity::Medium)
            .map(|f| f.package.key())
            .collect();

        if let Some(vulns) = results
            .get(&StageName::Vulnerability)
            .and_then(|r| r.payload.as_vulnerability())
        {
            suspicious.extend(
                vulns
                    .packages
                    .iter()
                    .filter(|(_, v)| v.max_severity() >= Severity::High)
                    .map(|(key, _)| key.clone()),
            );
        }

        if let Some(reputation) = results
            .get(&StageName::Reputation)
            .and_then(|r| r.payload.as_reputation())
        {
            suspicious.extend(reputation.findings.iter().map(|f| f.package.key()));
        }

        suspicious
    }

    /// Keys of packages whose reputation composite is below the high-risk threshold
    pub fn high_risk_packages(results: &BTreeMap<StageName, StageResult>) -> BTreeSet<String> {
        results
            .get(&StageName::Reputation)
            .and_then(|r| r.payload.as_reputation())
            .map(|reputation| {
                reputation
                    .packages
                    .iter()
                    .filter(|(_, score)| score.composite < HIGH_RISK_THRESHOLD)
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn should_run(
        stage: StageName,
        initial_findings: &[Finding],
        results: &BTreeMap<StageName, StageResult>,
    ) -> bool {
        match stage {
            StageName::DeepInspection => {
                !Self::suspicious_packages(initial_findings, results).is_empty()
            }
            StageName::SupplyChainPattern => !Self::high_risk_packages(results).is_empty(),
            _ => true,
        }
    }
}
