use crate::analysis::domain::{
    PackageId, ReputationPayload, StageContext, StageName, StagePayload,
};
use crate::application::services::ReputationScorer;
use crate::ports::outbound::StageAnalyzer;
use crate::shared::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Reputation stage: scores every resolved package in the graph
pub struct ReputationStage {
    scorer: Arc<ReputationScorer>,
}

impl ReputationStage {
    pub fn new(scorer: Arc<ReputationScorer>) -> Self {
        Self { scorer }
    }
}

#[async_trait]
impl StageAnalyzer for ReputationStage {
    fn stage(&self) -> StageName {
        StageName::Reputation
    }

    async fn analyze(&self, ctx: &StageContext<'_>) -> Result<StagePayload> {
        let packages: Vec<PackageId> = ctx.graph.packages().into_iter().cloned().collect();
        let scored = self.scorer.score_all(&packages).await;

        let mut payload = ReputationPayload::default();
        for entry in scored {
            payload.findings.extend(entry.finding);
            payload
                .packages
                .insert(entry.score.package.key(), entry.score);
        }
        tracing::debug!(
            scored = payload.packages.len(),
            low_reputation = payload.findings.len(),
            "reputation stage finished"
        );
        Ok(StagePayload::Reputation(payload))
    }
}
