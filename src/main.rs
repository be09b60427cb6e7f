mod cli;
mod config;

use chainsight::adapters::outbound::cache::DiskCacheStore;
use chainsight::adapters::outbound::console::StderrProgressReporter;
use chainsight::adapters::outbound::detectors::{RuleBasedDetector, RuleSet};
use chainsight::adapters::outbound::filesystem::{FileSystemWriter, StdoutPresenter};
use chainsight::adapters::outbound::formatters::JsonReportFormatter;
use chainsight::adapters::outbound::manifests::{NpmManifestAdapter, PythonRequirementsAdapter};
use chainsight::adapters::outbound::network::{
    CachingRegistryClient, MultiRegistryClient, NpmRegistryClient, OsvVulnerabilitySource,
    PyPiRegistryClient,
};
use chainsight::adapters::outbound::stages::{
    HeuristicInspector, ReputationStage, SupplyChainPatternMatcher, SynthesisStage,
};
use chainsight::analysis::domain::Ecosystem;
use chainsight::application::dto::AnalysisRequest;
use chainsight::application::orchestrator::AnalysisOrchestrator;
use chainsight::application::services::{CacheManager, DependencyGraphBuilder, ReputationScorer};
use chainsight::application::use_cases::AnalyzeProjectUseCase;
use chainsight::ports::outbound::{
    EcosystemAdapter, OutputPresenter, RegistryClient, ReportFormatter,
};
use chainsight::shared::error::{AnalysisError, ExitCode};
use chainsight::shared::Result;
use cli::Args;
use config::{discover_config, load_config_from_path, AnalysisSettings, CacheMode, CacheSettings};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = match Args::parse_args() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() {
                ExitCode::InvalidArguments
            } else {
                ExitCode::Success
            };
            let _ = e.print();
            process::exit(code.as_i32());
        }
    };

    init_tracing(args.verbose);

    let outcome = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(anyhow::Error::from)
        .and_then(|runtime| runtime.block_on(run(args)));

    match outcome {
        Ok(code) => process::exit(code.as_i32()),
        Err(e) => {
            eprintln!("\n❌ An error occurred:\n");
            eprintln!("{}", e);

            // Display error chain
            let mut source = e.source();
            while let Some(err) = source {
                eprintln!("\nCaused by: {}", err);
                source = err.source();
            }

            eprintln!();
            process::exit(ExitCode::ApplicationError.as_i32());
        }
    }
}

/// Structured logs go to stderr so stdout carries only the report
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "chainsight=debug"
    } else {
        "chainsight=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn run(args: Args) -> Result<ExitCode> {
    // Validate project directory
    let project_path = PathBuf::from(args.path.as_deref().unwrap_or("."));
    validate_project_path(&project_path)?;

    // Explicit --config wins over auto-discovery
    let config = match args.config.as_deref() {
        Some(path) => load_config_from_path(Path::new(path))?,
        None => discover_config(&project_path)?.unwrap_or_default(),
    };
    let settings = AnalysisSettings::resolve(&args, config, project_path)?;
    tracing::debug!(?settings, "resolved settings");

    // Create adapters (Dependency Injection)
    let cache = Arc::new(build_cache(&settings.cache));
    let timeout = settings.per_package_timeout;
    let workers = settings.worker_pool_size;

    let registries = MultiRegistryClient::new()
        .with_client(Ecosystem::Npm, Arc::new(NpmRegistryClient::new(timeout)?))
        .with_client(Ecosystem::PyPI, Arc::new(PyPiRegistryClient::new(timeout)?));
    let registry: Arc<dyn RegistryClient> = Arc::new(CachingRegistryClient::new(
        Arc::new(registries),
        cache.clone(),
    ));

    let graph_builder = DependencyGraphBuilder::new(registry.clone(), cache.clone())
        .with_worker_pool_size(workers)
        .with_call_timeout(timeout);
    let scorer = Arc::new(
        ReputationScorer::new(registry.clone())
            .with_worker_pool_size(workers)
            .with_call_timeout(timeout),
    );

    let orchestrator = AnalysisOrchestrator::new(settings.budgets)
        .with_analyzer(Box::new(OsvVulnerabilitySource::new(
            cache.clone(),
            timeout,
            workers,
        )?))
        .with_analyzer(Box::new(ReputationStage::new(scorer)))
        .with_analyzer(Box::new(HeuristicInspector::new(
            registry.clone(),
            cache.clone(),
            workers,
            timeout,
        )))
        .with_analyzer(Box::new(SupplyChainPatternMatcher::new(
            registry, workers, timeout,
        )))
        .with_analyzer(Box::new(SynthesisStage));

    let detector = match settings.rules_file.as_deref() {
        Some(path) => RuleBasedDetector::new(RuleSet::load(path)?)?,
        None => RuleBasedDetector::builtin()?,
    };

    let adapters: Vec<Box<dyn EcosystemAdapter>> = vec![
        Box::new(NpmManifestAdapter::new()),
        Box::new(PythonRequirementsAdapter::new()),
    ];

    let use_case = AnalyzeProjectUseCase::new(
        adapters,
        graph_builder,
        Box::new(detector),
        orchestrator,
        cache,
        StderrProgressReporter::new(),
    );

    // Create request
    let mut request = AnalysisRequest::new(settings.project_path.clone())
        .with_include_dev(settings.include_dev);
    if let Some(ecosystem) = settings.ecosystem.clone() {
        request = request.with_ecosystem(ecosystem);
    }
    if let Some(threshold) = settings.fail_on_risk {
        request = request.with_fail_on_risk(threshold);
    }

    // Execute use case
    let response = use_case.execute(request).await?;

    let formatted_output = JsonReportFormatter::new().format(&response.report)?;

    // Present output
    let presenter: Box<dyn OutputPresenter> = match settings.output {
        Some(path) => Box::new(FileSystemWriter::new(path)),
        None => Box::new(StdoutPresenter::new()),
    };
    presenter.present(&formatted_output)?;

    if response.has_risk_above_threshold {
        tracing::warn!(
            packages = ?response.packages_above_threshold,
            "packages at or above the risk threshold"
        );
        return Ok(ExitCode::RiskAboveThreshold);
    }
    Ok(ExitCode::Success)
}

/// An unusable cache directory degrades to the in-memory store
fn build_cache(settings: &CacheSettings) -> CacheManager {
    let cache = match &settings.mode {
        CacheMode::Disabled => CacheManager::disabled(),
        CacheMode::InMemory => CacheManager::in_memory(settings.capacity),
        CacheMode::Disk(directory) => match DiskCacheStore::new(directory.clone()) {
            Ok(store) => CacheManager::new(Arc::new(store), settings.capacity),
            Err(e) => {
                tracing::warn!(error = %e, "disk cache unavailable, using in-memory cache");
                CacheManager::in_memory(settings.capacity)
            }
        },
    };
    let cache = cache.with_default_ttl(settings.ttl);
    let pruned = cache.prune_expired();
    if pruned > 0 {
        tracing::debug!(pruned, "dropped expired cache entries");
    }
    cache
}

fn validate_project_path(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(AnalysisError::InvalidProjectPath {
            path: path.to_path_buf(),
            reason: "Directory does not exist".to_string(),
        }
        .into());
    }

    // Security check: Reject symbolic links for project paths
    let metadata =
        std::fs::symlink_metadata(path).map_err(|e| AnalysisError::InvalidProjectPath {
            path: path.to_path_buf(),
            reason: format!("Failed to read path metadata: {}", e),
        })?;

    if metadata.is_symlink() {
        return Err(AnalysisError::InvalidProjectPath {
            path: path.to_path_buf(),
            reason: "Security: Project path is a symbolic link. For security reasons, symbolic links are not allowed.".to_string(),
        }
        .into());
    }

    if !path.is_dir() {
        return Err(AnalysisError::InvalidProjectPath {
            path: path.to_path_buf(),
            reason: "Not a directory".to_string(),
        }
        .into());
    }

    Ok(())
}
