use chainsight::analysis::domain::DeclaredDependency;
use chainsight::prelude::*;
use std::path::{Path, PathBuf};

/// Mock EcosystemAdapter declaring a fixed dependency list for any directory
pub struct MockEcosystemAdapter {
    ecosystem: Ecosystem,
    dependencies: Vec<DeclaredDependency>,
}

impl MockEcosystemAdapter {
    pub fn new(ecosystem: Ecosystem, dependencies: Vec<DeclaredDependency>) -> Self {
        Self {
            ecosystem,
            dependencies,
        }
    }
}

impl EcosystemAdapter for MockEcosystemAdapter {
    fn ecosystem(&self) -> Ecosystem {
        self.ecosystem.clone()
    }

    fn detect_manifests(&self, root: &Path) -> Result<Vec<PathBuf>> {
        Ok(vec![root.join("mock.manifest")])
    }

    fn extract_dependencies(&self, _manifest: &Path) -> Result<Vec<DeclaredDependency>> {
        Ok(self.dependencies.clone())
    }

    fn read_project_name(&self, _manifest: &Path) -> Option<String> {
        Some("demo-app".to_string())
    }
}
