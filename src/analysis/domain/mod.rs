pub mod context;
pub mod dependency_graph;
pub mod finding;
pub mod manifest;
pub mod package;
pub mod package_metadata;
pub mod report;
pub mod reputation;
pub mod stage;
pub mod vulnerability;

pub use context::StageContext;
pub use dependency_graph::{
    Cycle, DependencyGraph, DependencyNode, ResolutionStatus, VersionConflict,
};
pub use finding::{Finding, FindingType};
pub use manifest::ProjectManifest;
pub use package::{DeclaredDependency, DeclaredType, Ecosystem, PackageId, PackageName, Version};
pub use package_metadata::{AuthorInfo, AuthorKind, MaintainerRecord, PackageMetadata, VersionRecord};
pub use report::{
    AnalysisReport, ConflictIssue, Degradation, DegradationLevel, GraphIssues, PackageReport,
    ReportMetadata, ReportSummary, SeverityCounts, SkippedAnalysis, StageSummary,
    UnresolvedIssue,
};
pub use reputation::{FactorScores, ReputationScore, RiskFactor, NEUTRAL_FACTOR};
pub use stage::{
    InspectionPayload, PatternPayload, ReputationPayload, StageError, StageKind, StageName,
    StagePayload, StageResult, VulnerabilityPayload,
};
pub use vulnerability::{CvssScore, PackageVulnerabilities, Severity, Vulnerability};
