use crate::analysis::domain::{StageContext, StageName, StagePayload};
use crate::shared::Result;
use async_trait::async_trait;

/// StageAnalyzer port: one step of the analysis pipeline
///
/// The orchestrator runs analyzers in a fixed order, each under its own
/// time budget. An analyzer returns its typed payload; the orchestrator
/// validates it and substitutes a fallback when the analyzer fails,
/// times out or returns something invalid. A remote reasoning service
/// would implement this same trait.
#[async_trait]
pub trait StageAnalyzer: Send + Sync {
    /// Stage this analyzer implements
    fn stage(&self) -> StageName;

    /// Runs the stage
    ///
    /// # Errors
    /// Any error marks the stage as failed; it never aborts the run
    async fn analyze(&self, ctx: &StageContext<'_>) -> Result<StagePayload>;
}
