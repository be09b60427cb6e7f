use crate::shared::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length for package names (security limit)
const MAX_PACKAGE_NAME_LENGTH: usize = 214;

/// Maximum length for package versions (security limit)
const MAX_VERSION_LENGTH: usize = 100;

/// Placeholder version carried by nodes whose range could not be resolved
const UNRESOLVED_VERSION: &str = "unresolved";

/// Package ecosystem a dependency belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Ecosystem {
    Npm,
    PyPI,
    Cargo,
    Other(String),
}

impl Ecosystem {
    /// Ecosystem identifier understood by the OSV API
    pub fn osv_name(&self) -> &str {
        match self {
            Ecosystem::Npm => "npm",
            Ecosystem::PyPI => "PyPI",
            Ecosystem::Cargo => "crates.io",
            Ecosystem::Other(name) => name,
        }
    }

    /// Whether package names compare case-insensitively in this ecosystem
    pub fn case_insensitive_names(&self) -> bool {
        matches!(self, Ecosystem::PyPI)
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ecosystem::Npm => write!(f, "npm"),
            Ecosystem::PyPI => write!(f, "pypi"),
            Ecosystem::Cargo => write!(f, "cargo"),
            Ecosystem::Other(name) => write!(f, "{}", name.to_lowercase()),
        }
    }
}

impl FromStr for Ecosystem {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "npm" => Ecosystem::Npm,
            "pypi" => Ecosystem::PyPI,
            "cargo" | "crates.io" => Ecosystem::Cargo,
            other => Ecosystem::Other(other.to_string()),
        })
    }
}

impl From<String> for Ecosystem {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(ecosystem) => ecosystem,
            Err(never) => match never {},
        }
    }
}

impl From<Ecosystem> for String {
    fn from(value: Ecosystem) -> Self {
        value.to_string()
    }
}

/// NewType wrapper for package name with validation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageName(String);

impl PackageName {
    pub fn new(name: String) -> Result<Self> {
        if name.is_empty() {
            anyhow::bail!("Package name cannot be empty");
        }

        // Security: Length limit to prevent DoS
        if name.len() > MAX_PACKAGE_NAME_LENGTH {
            anyhow::bail!(
                "Package name is too long ({} bytes). Maximum allowed: {} bytes",
                name.len(),
                MAX_PACKAGE_NAME_LENGTH
            );
        }

        // '@' and '/' cover npm scoped packages (@scope/name)
        if !name.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@' | '/' | '[' | ']')
        }) {
            anyhow::bail!(
                "Package name '{}' contains invalid characters. Only alphanumeric, hyphens, underscores, dots, '@', '/' and brackets are allowed.",
                name
            );
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for PackageName {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PackageName> for String {
    fn from(value: PackageName) -> Self {
        value.0
    }
}

/// NewType wrapper for a concrete (resolved) package version
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(String);

impl Version {
    pub fn new(version: String) -> Result<Self> {
        if version.is_empty() {
            anyhow::bail!("Package version cannot be empty");
        }

        if version.len() > MAX_VERSION_LENGTH {
            anyhow::bail!(
                "Package version is too long ({} bytes). Maximum allowed: {} bytes",
                version.len(),
                MAX_VERSION_LENGTH
            );
        }

        if !version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+' | '*' | '!'))
        {
            anyhow::bail!(
                "Package version '{}' contains invalid characters. Only alphanumeric, dots, hyphens, plus, '!' and asterisks are allowed.",
                version
            );
        }

        Ok(Self(version))
    }

    /// Version used for nodes whose declared range could not be resolved
    pub fn unresolved() -> Self {
        Self(UNRESOLVED_VERSION.to_string())
    }

    pub fn is_unresolved(&self) -> bool {
        self.0 == UNRESOLVED_VERSION
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Version {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.0
    }
}

/// Identity of a package within one analysis: ecosystem, name and concrete version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageId {
    pub ecosystem: Ecosystem,
    pub name: PackageName,
    pub version: Version,
}

impl PackageId {
    pub fn new(ecosystem: Ecosystem, name: &str, version: &str) -> Result<Self> {
        Ok(Self {
            ecosystem,
            name: PackageName::new(name.to_string())?,
            version: Version::new(version.to_string())?,
        })
    }

    /// Synthetic id for the analyzed project itself (graph root)
    pub fn project_root(ecosystem: Ecosystem, project_name: &str) -> Result<Self> {
        Self::new(ecosystem, project_name, "root")
    }

    /// Stable string key `ecosystem:name:version` used in stage payloads and reports
    pub fn key(&self) -> String {
        format!("{}:{}:{}", self.ecosystem, self.name, self.version)
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn version(&self) -> &str {
        self.version.as_str()
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// How a dependency entered the project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredType {
    Direct,
    Transitive,
    Dev,
}

/// A dependency as declared by a manifest: raw, unvalidated name and range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredDependency {
    pub name: String,
    pub version_range: String,
    pub declared_type: DeclaredType,
}

impl DeclaredDependency {
    pub fn new(name: impl Into<String>, version_range: impl Into<String>, declared_type: DeclaredType) -> Self {
        Self {
            name: name.into(),
            version_range: version_range.into(),
            declared_type,
        }
    }
}
