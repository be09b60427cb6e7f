//! chainsight - supply-chain risk analysis for project dependency trees
//!
//! This library resolves a project's full dependency graph, then runs a
//! staged analysis (known vulnerabilities, package reputation, heuristic
//! deep inspection, supply-chain attack patterns) and synthesizes a single
//! report. Every stage degrades gracefully: a failed or slow stage is
//! replaced by a fallback and the report records how complete it is.
//!
//! # Architecture
//!
//! The library is organized into the following layers:
//!
//! - **Domain Layer** (`analysis`): Pure models, policies and domain services
//! - **Application Layer** (`application`): Use case, orchestrator, cache and graph services
//! - **Ports** (`ports`): Interface definitions for infrastructure
//! - **Adapters** (`adapters`): Registries, OSV, manifests, stages, cache stores, output
//! - **Shared** (`shared`): Error taxonomy, clock and file helpers
//!
//! # Example
//!
//! ```no_run
//! use chainsight::prelude::*;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<()> {
//! let cache = Arc::new(CacheManager::in_memory(1_000));
//! let registry: Arc<dyn RegistryClient> = Arc::new(CachingRegistryClient::new(
//!     Arc::new(NpmRegistryClient::new(Duration::from_secs(10))?),
//!     cache.clone(),
//! ));
//! let scorer = Arc::new(ReputationScorer::new(registry.clone()));
//!
//! let orchestrator = AnalysisOrchestrator::new(StageBudgets::default())
//!     .with_analyzer(Box::new(ReputationStage::new(scorer)))
//!     .with_analyzer(Box::new(SynthesisStage));
//!
//! let use_case = AnalyzeProjectUseCase::new(
//!     vec![Box::new(NpmManifestAdapter::new())],
//!     DependencyGraphBuilder::new(registry, cache.clone()),
//!     Box::new(RuleBasedDetector::builtin()?),
//!     orchestrator,
//!     cache,
//!     StderrProgressReporter::new(),
//! );
//!
//! let response = use_case.execute(AnalysisRequest::new(PathBuf::from("."))).await?;
//! println!("{}", JsonReportFormatter::new().format(&response.report)?);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod analysis;
pub mod application;
pub mod ports;
pub mod shared;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::adapters::outbound::console::StderrProgressReporter;
    pub use crate::adapters::outbound::detectors::{RuleBasedDetector, RuleSet};
    pub use crate::adapters::outbound::filesystem::{FileSystemWriter, StdoutPresenter};
    pub use crate::adapters::outbound::formatters::JsonReportFormatter;
    pub use crate::adapters::outbound::manifests::{NpmManifestAdapter, PythonRequirementsAdapter};
    pub use crate::adapters::outbound::network::{
        CachingRegistryClient, MultiRegistryClient, NpmRegistryClient, OsvVulnerabilitySource,
        PyPiRegistryClient,
    };
    pub use crate::adapters::outbound::stages::{
        HeuristicInspector, ReputationStage, SupplyChainPatternMatcher, SynthesisStage,
    };
    pub use crate::analysis::domain::{
        AnalysisReport, DegradationLevel, DependencyGraph, Ecosystem, Finding, PackageId,
        ReputationScore, StageName, StagePayload,
    };
    pub use crate::application::dto::{AnalysisRequest, AnalysisResponse};
    pub use crate::application::orchestrator::{AnalysisOrchestrator, StageBudgets};
    pub use crate::application::services::{
        CacheManager, DependencyGraphBuilder, ReputationScorer,
    };
    pub use crate::application::use_cases::AnalyzeProjectUseCase;
    pub use crate::ports::outbound::{
        CacheStore, EcosystemAdapter, FindingDetector, OutputPresenter, ProgressReporter,
        RegistryClient, ReportFormatter, StageAnalyzer,
    };
    pub use crate::shared::Result;
}
