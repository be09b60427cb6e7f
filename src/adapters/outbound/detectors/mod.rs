/// Rule-based finding detection
mod rule_based_detector;
mod rule_set;

pub use rule_based_detector::RuleBasedDetector;
pub use rule_set::{Rule, RuleSet, TyposquatSettings};
