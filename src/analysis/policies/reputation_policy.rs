use crate::analysis::domain::{
    AuthorKind, FactorScores, Finding, FindingType, PackageId, PackageMetadata, ReputationScore,
    RiskFactor, Severity, NEUTRAL_FACTOR,
};
use chrono::{DateTime, Duration, Utc};

/// Composite weights; they sum to 1.0
pub const AGE_WEIGHT: f64 = 0.3;
pub const POPULARITY_WEIGHT: f64 = 0.3;
pub const AUTHOR_WEIGHT: f64 = 0.2;
pub const MAINTENANCE_WEIGHT: f64 = 0.2;

/// Factors below this produce a risk flag
pub const FACTOR_FLAG_THRESHOLD: f64 = 0.4;
/// Factors below this make the flag High instead of Medium
pub const FACTOR_HIGH_THRESHOLD: f64 = 0.25;
/// Composite below this is a low-reputation package
pub const HIGH_RISK_THRESHOLD: f64 = 0.3;

/// Packages younger than this have no maintenance history worth scoring
const UNPROVEN_AGE_DAYS: i64 = 90;

pub const NEW_PACKAGE_FLAG: &str = "new-package";
pub const LOW_POPULARITY_FLAG: &str = "low-popularity";
pub const UNTRUSTED_AUTHOR_FLAG: &str = "untrusted-author";
pub const UNMAINTAINED_FLAG: &str = "unmaintained";
pub const MAINTAINER_CHURN_FLAG: &str = "maintainer-churn";
pub const METADATA_UNAVAILABLE_FLAG: &str = "metadata-unavailable";
pub const REPUTATION_UNAVAILABLE_FLAG: &str = "reputation-unavailable";

/// ReputationPolicy encodes how registry metadata becomes a trust score.
///
/// Factor bands (higher = more trustworthy):
/// - age since first publish: <30d 0.2, 30-90d 0.5, 90-365d 0.7, 1-2y 0.9, >=2y 1.0
/// - weekly downloads: <100 0.2, <1k 0.4, <10k 0.6, <100k 0.8, otherwise 1.0
/// - author: verified or organisation 1.0, established 0.8, new 0.5, unknown 0.3
/// - maintenance since last release: <=6mo 1.0, <=1y 0.8, <=2y 0.5, older 0.2
pub struct ReputationPolicy;

impl ReputationPolicy {
    /// Scores one package. Returns the score and, when the composite falls
    /// below [`HIGH_RISK_THRESHOLD`], a standalone low-reputation finding.
    pub fn evaluate(
        package: &PackageId,
        metadata: &PackageMetadata,
        now: DateTime<Utc>,
    ) -> (ReputationScore, Option<Finding>) {
        let first_published = metadata.first_published.or_else(|| {
            metadata
                .versions
                .iter()
                .filter_map(|v| v.published_at)
                .min()
        });
        let age_days = first_published.map(|t| (now - t).num_days());

        let factors = FactorScores {
            age: age_days.map(Self::age_score).unwrap_or(NEUTRAL_FACTOR),
            popularity: metadata
                .weekly_downloads
                .map(Self::popularity_score)
                .unwrap_or(NEUTRAL_FACTOR),
            author_trust: Self::author_score(metadata, now),
            maintenance: Self::maintenance_score(metadata, age_days, now),
        };

        let composite = Self::composite(&factors);
        let mut risk_factors = Self::factor_flags(&factors);
        if let Some(churn) = Self::maintainer_churn(metadata) {
            risk_factors.push(churn);
        }

        let finding = (composite < HIGH_RISK_THRESHOLD).then(|| {
            let mut evidence = vec![format!("composite reputation score {:.2}", composite)];
            evidence.extend(risk_factors.iter().map(|f| f.description.clone()));
            Finding::new(
                package.clone(),
                FindingType::LowReputation,
                Severity::High,
                1.0 - composite,
                evidence,
            )
        });

        let score = ReputationScore {
            package: package.clone(),
            composite,
            factors,
            risk_factors,
            metadata_available: true,
        };
        (score, finding)
    }

    pub fn composite(factors: &FactorScores) -> f64 {
        (AGE_WEIGHT * factors.age
            + POPULARITY_WEIGHT * factors.popularity
            + AUTHOR_WEIGHT * factors.author_trust
            + MAINTENANCE_WEIGHT * factors.maintenance)
            .clamp(0.0, 1.0)
    }

    pub fn age_score(days: i64) -> f64 {
        match days {
            d if d < 30 => 0.2,
            d if d < 90 => 0.5,
            d if d < 365 => 0.7,
            d if d < 730 => 0.9,
            _ => 1.0,
        }
    }

    pub fn popularity_score(weekly_downloads: u64) -> f64 {
        match weekly_downloads {
            d if d < 100 => 0.2,
            d if d < 1_000 => 0.4,
            d if d < 10_000 => 0.6,
            d if d < 100_000 => 0.8,
            _ => 1.0,
        }
    }

    fn author_score(metadata: &PackageMetadata, now: DateTime<Utc>) -> f64 {
        let author = &metadata.author;
        if author.verified || author.kind == AuthorKind::Organization {
            return 1.0;
        }
        if author.kind == AuthorKind::Unknown && author.name.is_none() {
            return 0.3;
        }
        match author.first_seen {
            Some(seen) if now - seen >= Duration::days(365) => 0.8,
            _ => 0.5,
        }
    }

    fn maintenance_score(metadata: &PackageMetadata, age_days: Option<i64>, now: DateTime<Utc>) -> f64 {
        if age_days.is_some_and(|d| d < UNPROVEN_AGE_DAYS) {
            return NEUTRAL_FACTOR;
        }
        let last_release = metadata
            .last_update
            .or_else(|| metadata.latest_release().and_then(|v| v.published_at));
        match last_release.map(|t| (now - t).num_days()) {
            Some(d) if d <= 182 => 1.0,
            Some(d) if d <= 365 => 0.8,
            Some(d) if d <= 730 => 0.5,
            Some(_) => 0.2,
            None => NEUTRAL_FACTOR,
        }
    }

    fn factor_flags(factors: &FactorScores) -> Vec<RiskFactor> {
        factors
            .iter()
            .filter(|(_, value)| *value < FACTOR_FLAG_THRESHOLD)
            .map(|(name, value)| {
                let (label, description) = match name {
                    "age" => (NEW_PACKAGE_FLAG, "package was first published very recently"),
                    "popularity" => (LOW_POPULARITY_FLAG, "package has very few weekly downloads"),
                    "author_trust" => (UNTRUSTED_AUTHOR_FLAG, "package author has no established history"),
                    _ => (UNMAINTAINED_FLAG, "package has not been released in a long time"),
                };
                RiskFactor {
                    label: label.to_string(),
                    severity: if value < FACTOR_HIGH_THRESHOLD {
                        Severity::High
                    } else {
                        Severity::Medium
                    },
                    description: format!("{} (score {:.2})", description, value),
                }
            })
            .collect()
    }

    /// A maintainer added within 24h of the latest release.
    ///
    /// Only counts when some release predates the maintainer: whoever
    /// published the first version was not "added" to an existing package.
    fn maintainer_churn(metadata: &PackageMetadata) -> Option<RiskFactor> {
        let released = metadata.latest_release()?.published_at?;
        let newcomer = metadata.maintainers.iter().find(|m| {
            m.added_at.is_some_and(|added| {
                (released - added).num_hours().abs() <= 24
                    && metadata
                        .versions
                        .iter()
                        .any(|v| v.published_at.is_some_and(|at| at < added))
            })
        })?;
        Some(RiskFactor {
            label: MAINTAINER_CHURN_FLAG.to_string(),
            severity: Severity::Medium,
            description: format!(
                "maintainer '{}' was added within 24h of the latest release",
                newcomer.name
            ),
        })
    }
}
