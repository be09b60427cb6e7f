use crate::analysis::domain::{StageContext, StageName, StagePayload};
use crate::analysis::services::ReportSynthesizer;
use crate::ports::outbound::StageAnalyzer;
use crate::shared::Result;
use async_trait::async_trait;

/// Local synthesis stage: assembles the final report from prior results
#[derive(Debug, Default, Clone, Copy)]
pub struct SynthesisStage;

#[async_trait]
impl StageAnalyzer for SynthesisStage {
    fn stage(&self) -> StageName {
        StageName::Synthesis
    }

    async fn analyze(&self, ctx: &StageContext<'_>) -> Result<StagePayload> {
        Ok(StagePayload::Synthesis(Box::new(ReportSynthesizer::synthesize(ctx))))
    }
}
