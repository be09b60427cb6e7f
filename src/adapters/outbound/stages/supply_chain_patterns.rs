use super::fetch_metadata;
use crate::analysis::domain::{
    Finding, FindingType, PackageId, PackageMetadata, PatternPayload, ReputationScore, Severity,
    StageContext, StageName, StagePayload,
};
use crate::analysis::policies::reputation_policy::{MAINTAINER_CHURN_FLAG, NEW_PACKAGE_FLAG};
use crate::analysis::policies::TriggerPolicy;
use crate::ports::outbound::{RegistryClient, StageAnalyzer};
use crate::shared::{Clock, Result, SystemClock};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use futures::future::{BoxFuture, FutureExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const DORMANT_GAP_DAYS: i64 = 2 * 365;
const RECENT_RELEASE_DAYS: i64 = 30;

/// Everything one pattern needs to know about a high-risk package
struct Signals<'a> {
    package: &'a PackageId,
    reputation: &'a ReputationScore,
    prior: Vec<&'a Finding>,
    metadata: Option<PackageMetadata>,
}

impl Signals<'_> {
    fn has_install_script(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|m| m.version(self.package.version()))
            .is_some_and(|v| v.has_install_script)
    }

    fn has_prior(&self, finding_type: &FindingType) -> bool {
        self.prior.iter().any(|f| &f.finding_type == finding_type)
    }
}

/// Known supply-chain attack shapes, matched over high-risk packages.
///
/// Runs only for packages the reputation stage scored below the high-risk
/// threshold. Each pattern combines the reputation flags with registry
/// metadata and the rule-based findings.
pub struct SupplyChainPatternMatcher {
    registry: Arc<dyn RegistryClient>,
    clock: Arc<dyn Clock>,
    worker_pool_size: usize,
    call_timeout: Duration,
}

impl SupplyChainPatternMatcher {
    pub fn new(
        registry: Arc<dyn RegistryClient>,
        worker_pool_size: usize,
        call_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            clock: Arc::new(SystemClock),
            worker_pool_size: worker_pool_size.max(1),
            call_timeout,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn match_patterns(signals: &Signals<'_>, now: DateTime<Utc>) -> Vec<Finding> {
        let package = signals.package;
        let pattern = |severity: Severity, confidence: f64, evidence: String| {
            Finding::new(
                package.clone(),
                FindingType::SupplyChainPattern,
                severity,
                confidence,
                vec![evidence],
            )
        };
        let mut findings = Vec::new();

        if signals.reputation.has_flag(MAINTAINER_CHURN_FLAG) {
            if signals.has_install_script() {
                findings.push(pattern(
                    Severity::High,
                    0.8,
                    "account takeover shape: new maintainer shipped a release with an install hook"
                        .to_string(),
                ));
            } else {
                findings.push(pattern(
                    Severity::Medium,
                    0.5,
                    "maintainer added shortly before the latest release".to_string(),
                ));
            }
        }

        if signals.reputation.has_flag(NEW_PACKAGE_FLAG) && signals.has_install_script() {
            findings.push(pattern(
                Severity::High,
                0.7,
                "newly published package runs an install hook".to_string(),
            ));
        }

        if signals.has_prior(&FindingType::Typosquatting) {
            findings.push(pattern(
                Severity::High,
                0.8,
                format!(
                    "name resembles a popular package and reputation is {:.2}",
                    signals.reputation.composite
                ),
            ));
        }

        if let Some(metadata) = &signals.metadata {
            if let Some(gap) = Self::dormant_revival_gap(metadata, now) {
                findings.push(pattern(
                    Severity::Medium,
                    0.6,
                    format!("release after {} days of inactivity", gap),
                ));
            }
        }

        findings
    }

    /// Days between the two newest releases when a long-dormant package
    /// published again recently
    fn dormant_revival_gap(metadata: &PackageMetadata, now: DateTime<Utc>) -> Option<i64> {
        let mut published: Vec<DateTime<Utc>> =
            metadata.versions.iter().filter_map(|v| v.published_at).collect();
        published.sort();
        let [.., previous, latest] = published.as_slice() else {
            return None;
        };
        let gap = (*latest - *previous).num_days();
        let recent = (now - *latest).num_days() <= RECENT_RELEASE_DAYS;
        (recent && gap >= DORMANT_GAP_DAYS).then_some(gap)
    }
}

#[async_trait]
impl StageAnalyzer for SupplyChainPatternMatcher {
    fn stage(&self) -> StageName {
        StageName::SupplyChainPattern
    }

    async fn analyze(&self, ctx: &StageContext<'_>) -> Result<StagePayload> {
        let Some(reputation) = ctx.reputation() else {
            return Ok(StagePayload::SupplyChainPattern(PatternPayload::default()));
        };
        let high_risk = TriggerPolicy::high_risk_packages(ctx.results);
        let candidates: Vec<&ReputationScore> = high_risk
            .iter()
            .filter(|key| ctx.graph.contains_key(key))
            .filter_map(|key| reputation.packages.get(key))
            .collect();
        let now = self.clock.now();

        let matches: Vec<BoxFuture<'_, _>> = candidates
            .into_iter()
            .map(|score| async move {
                let metadata =
                    fetch_metadata(self.registry.as_ref(), &score.package, self.call_timeout).await;
                let signals = Signals {
                    package: &score.package,
                    reputation: score,
                    prior: ctx.findings_for(&score.package.key()),
                    metadata,
                };
                (score.package.key(), Self::match_patterns(&signals, now))
            }
            .boxed())
            .collect();
        let packages: BTreeMap<String, Vec<Finding>> = stream::iter(matches)
            .buffer_unordered(self.worker_pool_size)
            .filter(|(_, findings)| futures::future::ready(!findings.is_empty()))
            .collect()
            .await;

        tracing::debug!(matched = packages.len(), "supply-chain pattern stage finished");
        Ok(StagePayload::SupplyChainPattern(PatternPayload { packages }))
    }
}
