use crate::analysis::domain::{Ecosystem, PackageMetadata};
use crate::shared::Result;
use async_trait::async_trait;

/// RegistryClient port for fetching package metadata
///
/// This port abstracts the package registry (npm, PyPI, ...) used both to
/// resolve version ranges and to score package reputation.
///
/// # Async Support
/// Methods are async so that resolution and scoring can fan out.
/// Implementations must be `Send + Sync` to support concurrent access.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Fetches metadata for every published version of a package
    ///
    /// # Errors
    /// Returns `AnalysisError::MetadataUnavailable` if:
    /// - The network request fails or times out
    /// - The registry does not know the package
    /// - The response cannot be parsed
    async fn fetch_metadata(&self, ecosystem: &Ecosystem, name: &str) -> Result<PackageMetadata>;
}
