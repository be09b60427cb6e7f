use crate::application::dto::{AnalysisRequest, AnalysisResponse};
use crate::shared::Result;
use async_trait::async_trait;

/// ProjectAnalysisPort - Inbound port for the supply-chain analysis use case
///
/// This port defines the interface that external adapters (CLI, API, etc.)
/// use to analyze a project. It represents the application's public API.
#[async_trait(?Send)]
pub trait ProjectAnalysisPort {
    /// Analyzes the dependency tree of the requested project
    ///
    /// # Returns
    /// The analysis report plus the packages above the requested risk threshold
    ///
    /// # Errors
    /// Returns an error only when the input is unusable:
    /// - The project directory does not exist or has no supported manifest
    /// - A manifest is malformed (`AnalysisError::ManifestError`)
    ///
    /// Every other failure degrades the report instead of failing the call.
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResponse>;
}
