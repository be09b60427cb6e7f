use clap::{Parser, ValueEnum};

/// Ecosystem selection on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EcosystemArg {
    /// package.json
    Npm,
    /// requirements*.txt
    Pypi,
    /// First ecosystem whose manifests are found in the project
    Auto,
}

/// Analyze a project's dependency tree for supply-chain risk
#[derive(Parser, Debug)]
#[command(name = "chainsight")]
#[command(version)]
#[command(
    about = "Analyze a project's dependency tree for vulnerabilities, malicious packages and low-trust packages",
    long_about = None
)]
pub struct Args {
    /// Path to the project directory (defaults to current directory)
    #[arg(short, long)]
    pub path: Option<String>,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Config file path (defaults to chainsight.config.yml in the project directory)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Disable the metadata cache for this run
    #[arg(long)]
    pub no_cache: bool,

    /// Persist the cache in this directory
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<String>,

    /// Ecosystem to analyze
    #[arg(short, long, value_enum, default_value_t = EcosystemArg::Auto)]
    pub ecosystem: EcosystemArg,

    /// Exit with code 1 when any package's risk score reaches this value (0.0-1.0)
    #[arg(long, value_name = "SCORE")]
    pub fail_on_risk: Option<f64>,

    /// Leave dev dependencies out of the graph
    #[arg(long)]
    pub no_dev: bool,

    /// Verbose logging (debug level)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn parse_args() -> Result<Self, clap::Error> {
        Self::try_parse()
    }
}
