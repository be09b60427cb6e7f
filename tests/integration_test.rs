/// Integration tests for the application layer
mod test_utilities;

use chainsight::analysis::domain::{DeclaredDependency, DeclaredType, VulnerabilityPayload};
use chainsight::analysis::policies::reputation_policy::REPUTATION_UNAVAILABLE_FLAG;
use chainsight::prelude::*;
use chainsight::shared::error::AnalysisError;
use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use test_utilities::mocks::*;

fn direct(name: &str, range: &str) -> DeclaredDependency {
    DeclaredDependency::new(name, range, DeclaredType::Direct)
}

fn clean_vulnerabilities() -> Box<dyn StageAnalyzer> {
    Box::new(MockStageAnalyzer::returning(
        StageName::Vulnerability,
        StagePayload::Vulnerability(VulnerabilityPayload {
            packages: BTreeMap::new(),
            source: "mock".to_string(),
        }),
    ))
}

/// express -> body-parser -> bytes, plus a direct lodash
fn web_registry() -> MockRegistryClient {
    MockRegistryClient::new()
        .with_package("express", "4.18.2", &[("body-parser", "^1.20.0")])
        .with_package("body-parser", "1.20.1", &[("bytes", "3.1.2")])
        .with_package("bytes", "3.1.2", &[])
        .with_package("lodash", "4.17.21", &[])
}

struct Harness {
    registry: Arc<MockRegistryClient>,
    cache: Arc<CacheManager>,
    budgets: StageBudgets,
    vulnerability: Option<Box<dyn StageAnalyzer>>,
    reputation: Option<Box<dyn StageAnalyzer>>,
    progress: MockProgressReporter,
}

impl Harness {
    fn new(registry: MockRegistryClient) -> Self {
        Self {
            registry: Arc::new(registry),
            cache: Arc::new(CacheManager::in_memory(1_000)),
            budgets: StageBudgets::uniform(Duration::from_secs(5)),
            vulnerability: None,
            reputation: None,
            progress: MockProgressReporter::new(),
        }
    }

    fn with_cache(mut self, cache: Arc<CacheManager>) -> Self {
        self.cache = cache;
        self
    }

    fn with_vulnerability_stage(mut self, stage: Box<dyn StageAnalyzer>) -> Self {
        self.vulnerability = Some(stage);
        self
    }

    fn with_reputation_stage(mut self, stage: Box<dyn StageAnalyzer>) -> Self {
        self.reputation = Some(stage);
        self
    }

    fn with_budgets(mut self, budgets: StageBudgets) -> Self {
        self.budgets = budgets;
        self
    }

    fn build(
        self,
        adapter: Box<dyn EcosystemAdapter>,
    ) -> AnalyzeProjectUseCase<MockProgressReporter> {
        let registry: Arc<dyn RegistryClient> = Arc::new(CachingRegistryClient::new(
            self.registry.clone(),
            self.cache.clone(),
        ));
        let scorer = Arc::new(ReputationScorer::new(registry.clone()));
        let reputation = self.reputation.unwrap_or_else(|| -> Box<dyn StageAnalyzer> {
            Box::new(ReputationStage::new(scorer))
        });

        let orchestrator = AnalysisOrchestrator::new(self.budgets)
            .with_analyzer(self.vulnerability.unwrap_or_else(clean_vulnerabilities))
            .with_analyzer(reputation)
            .with_analyzer(Box::new(HeuristicInspector::new(
                registry.clone(),
                self.cache.clone(),
                4,
                Duration::from_secs(1),
            )))
            .with_analyzer(Box::new(SupplyChainPatternMatcher::new(
                registry.clone(),
                4,
                Duration::from_secs(1),
            )))
            .with_analyzer(Box::new(SynthesisStage));

        AnalyzeProjectUseCase::new(
            vec![adapter],
            DependencyGraphBuilder::new(registry, self.cache.clone()),
            Box::new(RuleBasedDetector::builtin().unwrap()),
            orchestrator,
            self.cache,
            self.progress,
        )
    }
}

fn npm_adapter(dependencies: Vec<DeclaredDependency>) -> Box<dyn EcosystemAdapter> {
    Box::new(MockEcosystemAdapter::new(Ecosystem::Npm, dependencies))
}

#[tokio::test]
async fn test_analyze_clean_project_is_complete() {
    let project = TempDir::new().unwrap();
    let use_case = Harness::new(web_registry()).build(npm_adapter(vec![
        direct("express", "^4.18.0"),
        direct("lodash", "^4.17.0"),
    ]));

    let response = use_case
        .execute(AnalysisRequest::new(project.path().to_path_buf()))
        .await
        .unwrap();

    assert_eq!(response.graph.package_count(), 4);
    for key in [
        "npm:express:4.18.2",
        "npm:body-parser:1.20.1",
        "npm:bytes:3.1.2",
        "npm:lodash:4.17.21",
    ] {
        assert!(response.report.packages.contains_key(key), "missing {}", key);
    }
    assert_eq!(response.degradation_level(), DegradationLevel::Complete);
    assert!(response.report.degradation.skipped.is_empty());
    assert_eq!(response.report.metadata.root_project, "demo-app");
    assert!(!response.has_risk_above_threshold);

    let bytes = &response.report.packages["npm:bytes:3.1.2"];
    assert!(bytes
        .dependency_paths
        .iter()
        .any(|path| path.iter().any(|step| step.contains("body-parser"))));
}

#[tokio::test]
async fn test_cycle_is_recorded_once() {
    let project = TempDir::new().unwrap();
    let registry = MockRegistryClient::new()
        .with_package("a", "1.0.0", &[("b", "^1.0.0")])
        .with_package("b", "1.0.0", &[("c", "^1.0.0")])
        .with_package("c", "1.0.0", &[("a", "^1.0.0")]);
    let use_case = Harness::new(registry).build(npm_adapter(vec![direct("a", "^1.0.0")]));

    let response = use_case
        .execute(AnalysisRequest::new(project.path().to_path_buf()))
        .await
        .unwrap();

    assert_eq!(response.graph.package_count(), 3);
    assert_eq!(response.graph.cycles().len(), 1);
    assert_eq!(response.report.graph_issues.cycles.len(), 1);
}

#[tokio::test]
async fn test_version_conflict_reported_once_per_name() {
    let project = TempDir::new().unwrap();
    let registry = MockRegistryClient::new()
        .with_package("app-core", "2.0.0", &[("ms", "^2.0.0")])
        .with_package("debug", "2.6.9", &[("ms", "2.0.0")])
        .with_package("ms", "2.0.0", &[])
        .with_package("ms", "2.1.3", &[]);
    let use_case = Harness::new(registry).build(npm_adapter(vec![
        direct("app-core", "^2.0.0"),
        direct("debug", "^2.6.0"),
    ]));

    let response = use_case
        .execute(AnalysisRequest::new(project.path().to_path_buf()))
        .await
        .unwrap();

    assert_eq!(response.graph.conflicts().len(), 1);
    let issues = &response.report.graph_issues.conflicts;
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].name, "ms");
    assert_eq!(issues[0].versions.len(), 2);
}

#[tokio::test]
async fn test_unknown_package_degrades_instead_of_failing() {
    let project = TempDir::new().unwrap();
    let use_case = Harness::new(web_registry()).build(npm_adapter(vec![
        direct("lodash", "^4.17.0"),
        direct("left-padd", "^1.0.0"),
    ]));

    let response = use_case
        .execute(AnalysisRequest::new(project.path().to_path_buf()))
        .await
        .unwrap();

    assert_eq!(response.graph.unresolved().len(), 1);
    assert_eq!(response.report.graph_issues.unresolved.len(), 1);
    assert!(response.report.packages.contains_key("npm:lodash:4.17.21"));
}

#[tokio::test]
async fn test_failing_vulnerability_stage_uses_rule_based_findings() {
    let project = TempDir::new().unwrap();
    let registry = web_registry().with_package("ua-parser-js", "0.7.29", &[]);
    let use_case = Harness::new(registry)
        .with_vulnerability_stage(Box::new(MockStageAnalyzer::failing(
            StageName::Vulnerability,
            "advisory database unreachable",
        )))
        .build(npm_adapter(vec![
            direct("express", "^4.18.0"),
            direct("ua-parser-js", "0.7.29"),
        ]));

    let response = use_case
        .execute(AnalysisRequest::new(project.path().to_path_buf()))
        .await
        .unwrap();

    assert_eq!(response.degradation_level(), DegradationLevel::Minimal);
    let skipped = &response.report.degradation.skipped;
    assert!(skipped
        .iter()
        .any(|s| s.stage == StageName::Vulnerability && s.reason.contains("unreachable")));

    let compromised = &response.report.packages["npm:ua-parser-js:0.7.29"];
    assert!(compromised
        .vulnerabilities
        .iter()
        .any(|v| v.id == "CS-003"));
    assert!(response.report.summary.vulnerable_packages >= 1);
}

#[tokio::test]
async fn test_reputation_timeout_yields_neutral_scores() {
    let project = TempDir::new().unwrap();
    let budgets = StageBudgets {
        reputation: Duration::from_millis(50),
        ..StageBudgets::uniform(Duration::from_secs(5))
    };
    let use_case = Harness::new(web_registry())
        .with_budgets(budgets)
        .with_reputation_stage(Box::new(MockStageAnalyzer::hanging(
            StageName::Reputation,
            Duration::from_secs(2),
        )))
        .build(npm_adapter(vec![direct("lodash", "^4.17.0")]));

    let response = use_case
        .execute(AnalysisRequest::new(project.path().to_path_buf()))
        .await
        .unwrap();

    assert_eq!(response.degradation_level(), DegradationLevel::Minimal);
    let lodash = &response.report.packages["npm:lodash:4.17.21"];
    let score = lodash.reputation.as_ref().unwrap();
    assert!((score.composite - 0.5).abs() < f64::EPSILON);
    assert!(score.has_flag(REPUTATION_UNAVAILABLE_FLAG));
}

#[tokio::test]
async fn test_suspicious_package_triggers_optional_stages() {
    let project = TempDir::new().unwrap();
    let registry = web_registry().with_suspicious_package("fresh-helper", "1.0.1");
    let use_case = Harness::new(registry).build(npm_adapter(vec![
        direct("lodash", "^4.17.0"),
        direct("fresh-helper", "^1.0.0"),
    ]));

    let request = AnalysisRequest::new(project.path().to_path_buf()).with_fail_on_risk(0.4);
    let response = use_case.execute(request).await.unwrap();

    let stages: Vec<StageName> = response
        .report
        .metadata
        .stages
        .iter()
        .map(|s| s.stage)
        .collect();
    assert!(stages.contains(&StageName::DeepInspection));
    assert!(stages.contains(&StageName::SupplyChainPattern));

    let fresh = &response.report.packages["npm:fresh-helper:1.0.1"];
    assert!(fresh.reputation.as_ref().unwrap().composite < 0.3);
    assert!(!fresh.findings.is_empty());

    assert!(response.has_risk_above_threshold);
    assert_eq!(
        response.packages_above_threshold,
        vec!["npm:fresh-helper:1.0.1".to_string()]
    );
    assert_eq!(
        response.report.summary.highest_risk_package.as_deref(),
        Some("npm:fresh-helper:1.0.1")
    );
}

#[tokio::test]
async fn test_cache_does_not_change_results() {
    let deps = || {
        vec![
            direct("express", "^4.18.0"),
            direct("lodash", "^4.17.0"),
            direct("fresh-helper", "^1.0.0"),
        ]
    };
    let registry = || web_registry().with_suspicious_package("fresh-helper", "1.0.1");
    let project = TempDir::new().unwrap();

    let cached = Harness::new(registry())
        .with_cache(Arc::new(CacheManager::in_memory(1_000)))
        .build(npm_adapter(deps()))
        .execute(AnalysisRequest::new(project.path().to_path_buf()))
        .await
        .unwrap();
    let uncached = Harness::new(registry())
        .with_cache(Arc::new(CacheManager::disabled()))
        .build(npm_adapter(deps()))
        .execute(AnalysisRequest::new(project.path().to_path_buf()))
        .await
        .unwrap();

    assert_eq!(
        cached.report.packages.keys().collect::<Vec<_>>(),
        uncached.report.packages.keys().collect::<Vec<_>>()
    );
    for (key, package) in &cached.report.packages {
        let other = &uncached.report.packages[key];
        assert_eq!(
            package.reputation.as_ref().map(|r| r.composite),
            other.reputation.as_ref().map(|r| r.composite),
            "composite differs for {}",
            key
        );
        assert_eq!(package.risk_score, other.risk_score);
    }
}

#[tokio::test]
async fn test_second_run_is_served_from_cache() {
    let project = TempDir::new().unwrap();
    let registry = Arc::new(web_registry());
    let cache = Arc::new(CacheManager::in_memory(1_000));
    let deps = || vec![direct("express", "^4.18.0"), direct("lodash", "^4.17.0")];

    let run = |registry: Arc<MockRegistryClient>| {
        let mut harness = Harness::new(MockRegistryClient::new()).with_cache(cache.clone());
        harness.registry = registry;
        harness.build(npm_adapter(deps()))
    };

    run(registry.clone())
        .execute(AnalysisRequest::new(project.path().to_path_buf()))
        .await
        .unwrap();
    let calls_after_first = registry.call_count();
    assert!(calls_after_first > 0);

    let second = run(registry.clone())
        .execute(AnalysisRequest::new(project.path().to_path_buf()))
        .await
        .unwrap();

    assert_eq!(registry.call_count(), calls_after_first);
    assert!(second.cache_stats.hit_count > 0);
}

#[tokio::test]
async fn test_malformed_manifest_fails_the_run() {
    let project = TempDir::new().unwrap();
    fs::write(project.path().join("package.json"), "{ not json").unwrap();
    let use_case = Harness::new(web_registry()).build(Box::new(NpmManifestAdapter::new()));

    let err = use_case
        .execute(AnalysisRequest::new(project.path().to_path_buf()))
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<AnalysisError>(),
        Some(AnalysisError::ManifestError { .. })
    ));
}

#[tokio::test]
async fn test_requirements_project_end_to_end() {
    let project = TempDir::new().unwrap();
    fs::write(
        project.path().join("requirements.txt"),
        "# runtime\nRequests>=2.30\n",
    )
    .unwrap();
    let registry = MockRegistryClient::new()
        .with_package("requests", "2.31.0", &[("idna", "<4,>=2.5")])
        .with_package("idna", "3.6", &[]);
    let use_case = Harness::new(registry).build(Box::new(PythonRequirementsAdapter::new()));

    let response = use_case
        .execute(AnalysisRequest::new(project.path().to_path_buf()))
        .await
        .unwrap();

    assert_eq!(response.report.metadata.ecosystem, Ecosystem::PyPI);
    assert!(response.report.packages.contains_key("pypi:requests:2.31.0"));
    assert!(response.report.packages.contains_key("pypi:idna:3.6"));
}

#[tokio::test]
async fn test_missing_manifest_is_an_input_error() {
    let project = TempDir::new().unwrap();
    let use_case = Harness::new(web_registry()).build(Box::new(NpmManifestAdapter::new()));

    let err = use_case
        .execute(AnalysisRequest::new(project.path().to_path_buf()))
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<AnalysisError>(),
        Some(AnalysisError::InvalidProjectPath { .. })
    ));
}
