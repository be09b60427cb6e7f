use async_trait::async_trait;
use chainsight::analysis::domain::StageContext;
use chainsight::prelude::*;
use std::time::Duration;

enum Behavior {
    Fail(String),
    Hang(Duration),
    Return(StagePayload),
}

/// Mock StageAnalyzer with a scripted outcome
pub struct MockStageAnalyzer {
    stage: StageName,
    behavior: Behavior,
}

impl MockStageAnalyzer {
    /// Errors on every call
    pub fn failing(stage: StageName, reason: &str) -> Self {
        Self {
            stage,
            behavior: Behavior::Fail(reason.to_string()),
        }
    }

    /// Sleeps before answering with an empty payload
    pub fn hanging(stage: StageName, delay: Duration) -> Self {
        Self {
            stage,
            behavior: Behavior::Hang(delay),
        }
    }

    pub fn returning(stage: StageName, payload: StagePayload) -> Self {
        Self {
            stage,
            behavior: Behavior::Return(payload),
        }
    }
}

#[async_trait]
impl StageAnalyzer for MockStageAnalyzer {
    fn stage(&self) -> StageName {
        self.stage
    }

    async fn analyze(&self, _ctx: &StageContext<'_>) -> Result<StagePayload> {
        match &self.behavior {
            Behavior::Fail(reason) => anyhow::bail!("{}", reason),
            Behavior::Hang(delay) => {
                tokio::time::sleep(*delay).await;
                anyhow::bail!("answered after {}ms", delay.as_millis())
            }
            Behavior::Return(payload) => Ok(payload.clone()),
        }
    }
}
