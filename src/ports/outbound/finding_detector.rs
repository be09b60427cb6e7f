use crate::analysis::domain::{Finding, PackageId};

/// FindingDetector port for fast, offline rule-based detection
///
/// Detectors run once over every resolved package before the staged
/// pipeline starts; their findings seed the trigger decisions.
pub trait FindingDetector: Send + Sync {
    /// Identifier of the rule set in use (e.g. "builtin@1")
    fn rule_set_version(&self) -> String;

    /// Returns every finding for the given packages
    fn detect(&self, packages: &[PackageId]) -> Vec<Finding>;
}
