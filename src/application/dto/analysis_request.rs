use crate::analysis::domain::Ecosystem;
use std::path::PathBuf;

/// AnalysisRequest - Internal request DTO for the project analysis use case
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Project directory containing the manifests
    pub project_path: PathBuf,
    /// Ecosystem to analyze; `None` picks the first adapter that finds manifests
    pub ecosystem: Option<Ecosystem>,
    /// Whether dev dependencies are part of the graph
    pub include_dev: bool,
    /// Packages with a risk score at or above this are reported as failing
    pub fail_on_risk: Option<f64>,
}

impl AnalysisRequest {
    pub fn new(project_path: PathBuf) -> Self {
        Self {
            project_path,
            ecosystem: None,
            include_dev: true,
            fail_on_risk: None,
        }
    }

    pub fn with_ecosystem(mut self, ecosystem: Ecosystem) -> Self {
        self.ecosystem = Some(ecosystem);
        self
    }

    pub fn with_include_dev(mut self, include_dev: bool) -> Self {
        self.include_dev = include_dev;
        self
    }

    pub fn with_fail_on_risk(mut self, threshold: f64) -> Self {
        self.fail_on_risk = Some(threshold);
        self
    }
}
