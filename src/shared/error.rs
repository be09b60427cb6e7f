use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application.
///
/// These codes allow CI systems to distinguish a risky dependency tree
/// from an analysis that could not run at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Analysis completed and no package exceeded the risk threshold
    Success = 0,
    /// At least one package scored at or above the configured risk threshold
    RiskAboveThreshold = 1,
    /// Invalid command-line arguments (clap parsing errors)
    InvalidArguments = 2,
    /// Application error (unusable manifest, I/O error, invalid config, etc.)
    ApplicationError = 3,
}

impl ExitCode {
    /// Convert to i32 for use with std::process::exit
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitCode::Success => write!(f, "Success (0)"),
            ExitCode::RiskAboveThreshold => write!(f, "Risk Above Threshold (1)"),
            ExitCode::InvalidArguments => write!(f, "Invalid Arguments (2)"),
            ExitCode::ApplicationError => write!(f, "Application Error (3)"),
        }
    }
}

/// Error taxonomy for supply-chain analysis.
///
/// Only [`AnalysisError::ManifestError`] (and the input errors raised by the
/// binary before analysis starts) abort a run. Every other variant is caught
/// where it originates and turned into degraded data plus a recorded flag.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Manifest data is unusable: {manifest}\nDetails: {details}\n\n💡 Hint: Please verify that the manifest declares every dependency with a name and a version range")]
    ManifestError { manifest: String, details: String },

    #[error("Could not resolve {package}@{range}: {reason}")]
    ResolutionError {
        package: String,
        range: String,
        reason: String,
    },

    #[error("Cache backend unavailable: {reason}")]
    CacheUnavailable { reason: String },

    #[error("Registry metadata unavailable for {package}: {reason}")]
    MetadataUnavailable { package: String, reason: String },

    #[error("Stage '{stage}' timed out after {timeout_ms}ms")]
    StageTimeout { stage: String, timeout_ms: u64 },

    #[error("Stage '{stage}' returned a payload that violates its contract: {reason}")]
    StageValidationFailure { stage: String, reason: String },

    #[error("Report synthesis failed: {reason}")]
    SynthesisFailure { reason: String },

    #[error("Invalid project path: {path}\nReason: {reason}\n\n💡 Hint: Please specify a valid project directory")]
    InvalidProjectPath { path: PathBuf, reason: String },

    #[error("Failed to read file: {path}\nDetails: {details}\n\n💡 Hint: Please verify that the file exists and you have read permissions")]
    FileReadError { path: PathBuf, details: String },

    #[error("Failed to write to file: {path}\nDetails: {details}\n\n💡 Hint: Please verify that the directory exists and you have write permissions")]
    FileWriteError { path: PathBuf, details: String },

    #[error("Security violation: {path}\nReason: {reason}\n\n💡 Hint: {hint}")]
    SecurityError {
        path: PathBuf,
        reason: String,
        hint: String,
    },

    /// Validation error for builders and configuration
    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl AnalysisError {
    /// Whether this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AnalysisError::ManifestError { .. }
                | AnalysisError::InvalidProjectPath { .. }
                | AnalysisError::SecurityError { .. }
                | AnalysisError::Validation { .. }
        )
    }
}
