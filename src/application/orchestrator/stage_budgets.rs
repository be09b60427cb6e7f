use crate::analysis::domain::StageName;
use std::time::Duration;

/// Time budget per pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageBudgets {
    pub vulnerability: Duration,
    pub reputation: Duration,
    pub deep_inspection: Duration,
    pub supply_chain_pattern: Duration,
    pub synthesis: Duration,
}

impl StageBudgets {
    pub fn for_stage(&self, stage: StageName) -> Duration {
        match stage {
            StageName::Vulnerability => self.vulnerability,
            StageName::Reputation => self.reputation,
            StageName::DeepInspection => self.deep_inspection,
            StageName::SupplyChainPattern => self.supply_chain_pattern,
            StageName::Synthesis => self.synthesis,
        }
    }

    /// Same budget for every stage
    pub fn uniform(budget: Duration) -> Self {
        Self {
            vulnerability: budget,
            reputation: budget,
            deep_inspection: budget,
            supply_chain_pattern: budget,
            synthesis: budget,
        }
    }
}

impl Default for StageBudgets {
    fn default() -> Self {
        Self {
            vulnerability: Duration::from_secs(60),
            reputation: Duration::from_secs(60),
            deep_inspection: Duration::from_secs(45),
            supply_chain_pattern: Duration::from_secs(30),
            synthesis: Duration::from_secs(15),
        }
    }
}
