pub mod degradation_policy;
pub mod reputation_policy;
pub mod risk_policy;
pub mod trigger_policy;

pub use degradation_policy::DegradationPolicy;
pub use reputation_policy::{ReputationPolicy, HIGH_RISK_THRESHOLD};
pub use risk_policy::RiskPolicy;
pub use trigger_policy::TriggerPolicy;
