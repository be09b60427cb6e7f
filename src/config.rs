//! Configuration file support for chainsight.
//!
//! Provides YAML-based configuration through `chainsight.config.yml` files,
//! including the file schema, loading, validation, and the merge of file
//! values with command-line flags into [`AnalysisSettings`].

use anyhow::{bail, Context};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chainsight::analysis::domain::Ecosystem;
use chainsight::application::orchestrator::StageBudgets;
use chainsight::application::services::cache_manager::{DEFAULT_CAPACITY, METADATA_TTL};
use chainsight::shared::error::AnalysisError;
use chainsight::shared::Result;

use crate::cli::{Args, EcosystemArg};

const CONFIG_FILENAME: &str = "chainsight.config.yml";

const DEFAULT_WORKER_POOL_SIZE: usize = 8;
const DEFAULT_PER_PACKAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Top-level configuration file schema.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub cache: Option<CacheConfig>,
    pub stages: Option<StageConfig>,
    pub worker_pool_size: Option<usize>,
    pub fail_on_risk: Option<f64>,
    pub include_dev: Option<bool>,
    /// Relative paths are resolved against the config file's directory.
    pub rules_file: Option<PathBuf>,
    /// Captures unknown fields for warnings.
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_yaml_ng::Value>,
}

/// `cache:` section
#[derive(Debug, Deserialize, Default)]
pub struct CacheConfig {
    pub enabled: Option<bool>,
    pub capacity: Option<usize>,
    pub ttl_hours: Option<u64>,
    pub directory: Option<PathBuf>,
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_yaml_ng::Value>,
}

/// `stages:` section. Every value is in seconds.
#[derive(Debug, Deserialize, Default)]
pub struct StageConfig {
    pub vulnerability_timeout_secs: Option<u64>,
    pub reputation_timeout_secs: Option<u64>,
    pub deep_inspection_timeout_secs: Option<u64>,
    pub supply_chain_timeout_secs: Option<u64>,
    pub synthesis_timeout_secs: Option<u64>,
    pub per_package_timeout_secs: Option<u64>,
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_yaml_ng::Value>,
}

/// Load config from an explicit path. Returns an error if the file is not found.
pub fn load_config_from_path(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path).with_context(|| {
        format!(
            "Failed to read config file: {}\n\n💡 Hint: Check that the file exists and is readable.",
            path.display()
        )
    })?;

    let mut config: ConfigFile = serde_yaml_ng::from_str(&content).with_context(|| {
        format!(
            "Failed to parse config file: {}\n\n💡 Hint: Ensure the file contains valid YAML syntax.",
            path.display()
        )
    })?;

    validate_config(&config)?;
    warn_unknown_fields(&config);

    if let (Some(rules), Some(dir)) = (config.rules_file.as_ref(), path.parent()) {
        if rules.is_relative() {
            config.rules_file = Some(dir.join(rules));
        }
    }

    Ok(config)
}

/// Auto-discover config in a directory. Returns `None` silently if not found.
pub fn discover_config(dir: &Path) -> Result<Option<ConfigFile>> {
    let config_path = dir.join(CONFIG_FILENAME);

    if !config_path.exists() {
        return Ok(None);
    }

    let config = load_config_from_path(&config_path)?;
    Ok(Some(config))
}

/// Validate the loaded configuration.
fn validate_config(config: &ConfigFile) -> Result<()> {
    if config.worker_pool_size == Some(0) {
        bail!(
            "Invalid config: worker_pool_size must be at least 1.\n\n\
             💡 Hint: Remove the field to use the default of {}.",
            DEFAULT_WORKER_POOL_SIZE
        );
    }

    if let Some(threshold) = config.fail_on_risk {
        validate_threshold(threshold)?;
    }

    if let Some(cache) = &config.cache {
        if cache.capacity == Some(0) {
            bail!(
                "Invalid config: cache.capacity must be at least 1.\n\n\
                 💡 Hint: Use `cache.enabled: false` to turn the cache off."
            );
        }
        if cache.ttl_hours == Some(0) {
            bail!(
                "Invalid config: cache.ttl_hours must be at least 1.\n\n\
                 💡 Hint: Use `cache.enabled: false` to turn the cache off."
            );
        }
    }

    if let Some(stages) = &config.stages {
        let timeouts = [
            ("vulnerability_timeout_secs", stages.vulnerability_timeout_secs),
            ("reputation_timeout_secs", stages.reputation_timeout_secs),
            ("deep_inspection_timeout_secs", stages.deep_inspection_timeout_secs),
            ("supply_chain_timeout_secs", stages.supply_chain_timeout_secs),
            ("synthesis_timeout_secs", stages.synthesis_timeout_secs),
            ("per_package_timeout_secs", stages.per_package_timeout_secs),
        ];
        for (name, value) in timeouts {
            if value == Some(0) {
                bail!(
                    "Invalid config: stages.{} must be at least 1 second.\n\n\
                     💡 Hint: Remove the field to use the default budget.",
                    name
                );
            }
        }
    }
    Ok(())
}

/// Risk thresholds are scores in [0, 1]
fn validate_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(AnalysisError::Validation {
            message: format!(
                "fail_on_risk must be between 0.0 and 1.0, got {}\n\n\
                 💡 Hint: Risk scores are normalised, e.g. 0.7 flags high-risk packages.",
                threshold
            ),
        }
        .into());
    }
    Ok(())
}

/// Warn about unknown fields in the config file.
fn warn_unknown_fields(config: &ConfigFile) {
    let nested = config
        .cache
        .iter()
        .flat_map(|c| c.unknown_fields.keys().map(|k| format!("cache.{}", k)))
        .chain(
            config
                .stages
                .iter()
                .flat_map(|s| s.unknown_fields.keys().map(|k| format!("stages.{}", k))),
        );
    for key in config.unknown_fields.keys().cloned().chain(nested) {
        eprintln!("⚠️  Warning: Unknown config field '{}' will be ignored.", key);
    }
}

/// Where cached data lives for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheMode {
    Disabled,
    InMemory,
    Disk(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub mode: CacheMode,
    pub capacity: usize,
    pub ttl: Duration,
}

/// Effective settings for one run: config file values overridden by CLI flags.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub project_path: PathBuf,
    pub output: Option<PathBuf>,
    pub ecosystem: Option<Ecosystem>,
    pub include_dev: bool,
    pub fail_on_risk: Option<f64>,
    pub cache: CacheSettings,
    pub budgets: StageBudgets,
    pub per_package_timeout: Duration,
    pub worker_pool_size: usize,
    pub rules_file: Option<PathBuf>,
}

impl AnalysisSettings {
    pub fn resolve(args: &Args, config: ConfigFile, project_path: PathBuf) -> Result<Self> {
        let fail_on_risk = args.fail_on_risk.or(config.fail_on_risk);
        if let Some(threshold) = fail_on_risk {
            validate_threshold(threshold)?;
        }

        let cache_config = config.cache.unwrap_or_default();
        let directory = args
            .cache_dir
            .as_deref()
            .map(PathBuf::from)
            .or(cache_config.directory);
        let mode = if args.no_cache || cache_config.enabled == Some(false) {
            CacheMode::Disabled
        } else if let Some(dir) = directory {
            CacheMode::Disk(dir)
        } else {
            CacheMode::InMemory
        };
        let cache = CacheSettings {
            mode,
            capacity: cache_config.capacity.unwrap_or(DEFAULT_CAPACITY),
            ttl: cache_config
                .ttl_hours
                .map(|h| Duration::from_secs(h * 60 * 60))
                .unwrap_or(METADATA_TTL),
        };

        let stages = config.stages.unwrap_or_default();
        let defaults = StageBudgets::default();
        let secs = |value: Option<u64>, default: Duration| {
            value.map(Duration::from_secs).unwrap_or(default)
        };
        let budgets = StageBudgets {
            vulnerability: secs(stages.vulnerability_timeout_secs, defaults.vulnerability),
            reputation: secs(stages.reputation_timeout_secs, defaults.reputation),
            deep_inspection: secs(stages.deep_inspection_timeout_secs, defaults.deep_inspection),
            supply_chain_pattern: secs(
                stages.supply_chain_timeout_secs,
                defaults.supply_chain_pattern,
            ),
            synthesis: secs(stages.synthesis_timeout_secs, defaults.synthesis),
        };

        let ecosystem = match args.ecosystem {
            EcosystemArg::Npm => Some(Ecosystem::Npm),
            EcosystemArg::Pypi => Some(Ecosystem::PyPI),
            EcosystemArg::Auto => None,
        };

        Ok(Self {
            project_path,
            output: args.output.as_deref().map(PathBuf::from),
            ecosystem,
            include_dev: !args.no_dev && config.include_dev.unwrap_or(true),
            fail_on_risk,
            cache,
            budgets,
            per_package_timeout: secs(stages.per_package_timeout_secs, DEFAULT_PER_PACKAGE_TIMEOUT),
            worker_pool_size: config.worker_pool_size.unwrap_or(DEFAULT_WORKER_POOL_SIZE),
            rules_file: config.rules_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["chainsight"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    fn write_config(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_valid_config() {
        let dir = TempDir::new().unwrap();
        let config_path = write_config(
            &dir,
            "config.yml",
            r#"
cache:
  capacity: 500
  ttl_hours: 12
  directory: /tmp/chainsight-cache
stages:
  vulnerability_timeout_secs: 20
  per_package_timeout_secs: 3
worker_pool_size: 4
fail_on_risk: 0.7
rules_file: rules.yml
"#,
        );

        let config = load_config_from_path(&config_path).unwrap();
        let cache = config.cache.as_ref().unwrap();
        assert_eq!(cache.capacity, Some(500));
        assert_eq!(cache.ttl_hours, Some(12));
        assert_eq!(
            cache.directory.as_deref(),
            Some(Path::new("/tmp/chainsight-cache"))
        );
        let stages = config.stages.as_ref().unwrap();
        assert_eq!(stages.vulnerability_timeout_secs, Some(20));
        assert_eq!(stages.per_package_timeout_secs, Some(3));
        assert!(stages.reputation_timeout_secs.is_none());
        assert_eq!(config.worker_pool_size, Some(4));
        assert_eq!(config.fail_on_risk, Some(0.7));
        assert_eq!(config.rules_file, Some(dir.path().join("rules.yml")));
    }

    #[test]
    fn test_discover_config_found() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, CONFIG_FILENAME, "worker_pool_size: 2\n");

        let config = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.worker_pool_size, Some(2));
    }

    #[test]
    fn test_discover_config_not_found() {
        let dir = TempDir::new().unwrap();
        assert!(discover_config(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config_from_path(Path::new("/nonexistent/config.yml"));
        let err = format!("{}", result.unwrap_err());
        assert!(err.contains("Failed to read config file"));
    }

    #[test]
    fn test_load_config_parse_error() {
        let dir = TempDir::new().unwrap();
        let config_path = write_config(&dir, "bad.yml", "invalid: yaml: [[[broken");

        let err = format!("{}", load_config_from_path(&config_path).unwrap_err());
        assert!(err.contains("Failed to parse config file"));
    }

    #[test]
    fn test_zero_values_rejected() {
        let dir = TempDir::new().unwrap();
        for (content, needle) in [
            ("worker_pool_size: 0\n", "worker_pool_size"),
            ("cache:\n  capacity: 0\n", "cache.capacity"),
            ("cache:\n  ttl_hours: 0\n", "cache.ttl_hours"),
            ("stages:\n  synthesis_timeout_secs: 0\n", "stages.synthesis_timeout_secs"),
        ] {
            let path = write_config(&dir, "config.yml", content);
            let err = format!("{}", load_config_from_path(&path).unwrap_err());
            assert!(err.contains(needle), "{} not in {}", needle, err);
        }
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "config.yml", "fail_on_risk: 1.5\n");
        let err = format!("{}", load_config_from_path(&path).unwrap_err());
        assert!(err.contains("between 0.0 and 1.0"));
    }

    #[test]
    fn test_unknown_fields_collected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "config.yml",
            r#"
worker_pool_size: 2
unknown_field: true
cache:
  colour: blue
"#,
        );

        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.unknown_fields.len(), 1);
        assert!(config.unknown_fields.contains_key("unknown_field"));
        assert!(config.cache.unwrap().unknown_fields.contains_key("colour"));
    }

    #[test]
    fn test_settings_defaults() {
        let settings =
            AnalysisSettings::resolve(&args(&[]), ConfigFile::default(), PathBuf::from("."))
                .unwrap();
        assert_eq!(settings.cache.mode, CacheMode::InMemory);
        assert_eq!(settings.cache.capacity, DEFAULT_CAPACITY);
        assert_eq!(settings.cache.ttl, METADATA_TTL);
        assert_eq!(settings.budgets, StageBudgets::default());
        assert_eq!(settings.worker_pool_size, DEFAULT_WORKER_POOL_SIZE);
        assert!(settings.ecosystem.is_none());
        assert!(settings.include_dev);
        assert!(settings.fail_on_risk.is_none());
    }

    #[test]
    fn test_cli_overrides_config() {
        let config = ConfigFile {
            fail_on_risk: Some(0.9),
            cache: Some(CacheConfig {
                directory: Some(PathBuf::from("/from/config")),
                ..Default::default()
            }),
            ..Default::default()
        };
        let settings = AnalysisSettings::resolve(
            &args(&["--fail-on-risk", "0.5", "--cache-dir", "/from/cli", "-e", "npm"]),
            config,
            PathBuf::from("."),
        )
        .unwrap();

        assert_eq!(settings.fail_on_risk, Some(0.5));
        assert_eq!(settings.cache.mode, CacheMode::Disk(PathBuf::from("/from/cli")));
        assert_eq!(settings.ecosystem, Some(Ecosystem::Npm));
    }

    #[test]
    fn test_no_cache_wins_over_directory() {
        let config = ConfigFile {
            cache: Some(CacheConfig {
                directory: Some(PathBuf::from("/from/config")),
                ..Default::default()
            }),
            ..Default::default()
        };
        let settings =
            AnalysisSettings::resolve(&args(&["--no-cache"]), config, PathBuf::from(".")).unwrap();
        assert_eq!(settings.cache.mode, CacheMode::Disabled);
    }

    #[test]
    fn test_stage_timeouts_applied() {
        let config = ConfigFile {
            stages: Some(StageConfig {
                reputation_timeout_secs: Some(5),
                per_package_timeout_secs: Some(2),
                ..Default::default()
            }),
            ..Default::default()
        };
        let settings =
            AnalysisSettings::resolve(&args(&[]), config, PathBuf::from(".")).unwrap();
        assert_eq!(settings.budgets.reputation, Duration::from_secs(5));
        assert_eq!(
            settings.budgets.vulnerability,
            StageBudgets::default().vulnerability
        );
        assert_eq!(settings.per_package_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_cli_threshold_validated() {
        let result = AnalysisSettings::resolve(
            &args(&["--fail-on-risk=-0.1"]),
            ConfigFile::default(),
            PathBuf::from("."),
        );
        assert!(result.is_err());
    }
}
