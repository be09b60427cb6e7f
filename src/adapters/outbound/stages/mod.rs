//! Stage analyzers for the staged analysis pipeline

mod heuristic_inspector;
mod reputation_stage;
mod supply_chain_patterns;
mod synthesis_stage;

pub use heuristic_inspector::HeuristicInspector;
pub use reputation_stage::ReputationStage;
pub use supply_chain_patterns::SupplyChainPatternMatcher;
pub use synthesis_stage::SynthesisStage;

use crate::analysis::domain::{PackageId, PackageMetadata};
use crate::ports::outbound::RegistryClient;
use std::time::Duration;

/// Fetches metadata for one package under a timeout; failures only lose the signal
async fn fetch_metadata(
    registry: &dyn RegistryClient,
    package: &PackageId,
    timeout: Duration,
) -> Option<PackageMetadata> {
    match tokio::time::timeout(timeout, registry.fetch_metadata(&package.ecosystem, package.name())).await {
        Ok(Ok(metadata)) => Some(metadata),
        Ok(Err(e)) => {
            tracing::debug!(package = %package, error = %e, "metadata unavailable");
            None
        }
        Err(_) => {
            tracing::debug!(package = %package, "metadata lookup timed out");
            None
        }
    }
}
