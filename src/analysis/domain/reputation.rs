use super::{PackageId, Severity};
use serde::{Deserialize, Serialize};

/// Score given to every factor when nothing is known about a package
pub const NEUTRAL_FACTOR: f64 = 0.5;

/// Per-factor trust scores, each in [0, 1]; higher is more trustworthy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorScores {
    pub age: f64,
    pub popularity: f64,
    pub author_trust: f64,
    pub maintenance: f64,
}

impl FactorScores {
    pub fn neutral() -> Self {
        Self {
            age: NEUTRAL_FACTOR,
            popularity: NEUTRAL_FACTOR,
            author_trust: NEUTRAL_FACTOR,
            maintenance: NEUTRAL_FACTOR,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        [
            ("age", self.age),
            ("popularity", self.popularity),
            ("author_trust", self.author_trust),
            ("maintenance", self.maintenance),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub label: String,
    pub severity: Severity,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationScore {
    pub package: PackageId,
    /// Weighted composite in [0, 1]
    pub composite: f64,
    pub factors: FactorScores,
    pub risk_factors: Vec<RiskFactor>,
    pub metadata_available: bool,
}

impl ReputationScore {
    /// Score used when registry metadata could not be obtained
    pub fn neutral(package: PackageId, flag: &str, reason: &str) -> Self {
        Self {
            package,
            composite: NEUTRAL_FACTOR,
            factors: FactorScores::neutral(),
            risk_factors: vec![RiskFactor {
                label: flag.to_string(),
                severity: Severity::Low,
                description: reason.to_string(),
            }],
            metadata_available: false,
        }
    }

    pub fn has_flag(&self, label: &str) -> bool {
        self.risk_factors.iter().any(|f| f.label == label)
    }

    pub fn is_within_bounds(&self) -> bool {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        in_unit(self.composite) && self.factors.iter().all(|(_, v)| in_unit(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::domain::Ecosystem;

    #[test]
    fn test_neutral_score() {
        let id = PackageId::new(Ecosystem::PyPI, "requests", "2.31.0").unwrap();
        let score = ReputationScore::neutral(id, "metadata-unavailable", "registry down");
        assert_eq!(score.composite, 0.5);
        assert!(score.has_flag("metadata-unavailable"));
        assert!(!score.metadata_available);
        assert!(score.is_within_bounds());
    }
}
