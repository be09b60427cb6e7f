use super::{DeclaredDependency, Ecosystem};
use std::path::PathBuf;

/// Everything an ecosystem adapter extracted from a project directory.
#[derive(Debug, Clone)]
pub struct ProjectManifest {
    pub root: PathBuf,
    pub project_name: String,
    pub ecosystem: Ecosystem,
    pub manifests: Vec<PathBuf>,
    pub dependencies: Vec<DeclaredDependency>,
}

impl ProjectManifest {
    pub fn direct_count(&self) -> usize {
        self.dependencies.len()
    }
}
