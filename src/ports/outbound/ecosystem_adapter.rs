use crate::analysis::domain::{DeclaredDependency, Ecosystem};
use crate::shared::Result;
use std::path::{Path, PathBuf};

/// EcosystemAdapter port for reading a project's declared dependencies
///
/// One adapter per package ecosystem (npm `package.json`, Python
/// `requirements*.txt`, ...). Adapters only parse manifests; version
/// resolution happens in the dependency graph builder.
pub trait EcosystemAdapter: Send + Sync {
    fn ecosystem(&self) -> Ecosystem;

    /// Finds the manifests this adapter understands under `root`
    ///
    /// # Returns
    /// Manifest paths, empty when the project does not use this ecosystem
    ///
    /// # Errors
    /// Returns an error if the directory cannot be read
    fn detect_manifests(&self, root: &Path) -> Result<Vec<PathBuf>>;

    /// Extracts the flat list of declared dependencies from one manifest
    ///
    /// # Errors
    /// Returns `AnalysisError::ManifestError` when the manifest is malformed
    fn extract_dependencies(&self, manifest: &Path) -> Result<Vec<DeclaredDependency>>;

    /// Project name declared by the manifest, if it declares one
    fn read_project_name(&self, _manifest: &Path) -> Option<String> {
        None
    }
}
