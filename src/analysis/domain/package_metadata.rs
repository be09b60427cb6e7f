use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Registry metadata for one package, normalised across ecosystems.
///
/// Serializable because the caching registry client stores it verbatim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    pub versions: Vec<VersionRecord>,
    pub first_published: Option<DateTime<Utc>>,
    pub weekly_downloads: Option<u64>,
    pub author: AuthorInfo,
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub maintainers: Vec<MaintainerRecord>,
}

impl PackageMetadata {
    pub fn version(&self, version: &str) -> Option<&VersionRecord> {
        self.versions.iter().find(|v| v.version == version)
    }

    /// Most recently published version; falls back to the last listed one
    /// when the registry gave no timestamps.
    pub fn latest_release(&self) -> Option<&VersionRecord> {
        self.versions
            .iter()
            .filter(|v| v.published_at.is_some())
            .max_by_key(|v| v.published_at)
            .or_else(|| self.versions.last())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version: String,
    pub published_at: Option<DateTime<Utc>>,
    /// Dependency name -> declared range
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    /// Whether the version runs code at install time (npm lifecycle scripts)
    #[serde(default)]
    pub has_install_script: bool,
}

impl VersionRecord {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            published_at: None,
            dependencies: BTreeMap::new(),
            has_install_script: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorKind {
    #[default]
    Unknown,
    Individual,
    Organization,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AuthorInfo {
    pub name: Option<String>,
    pub kind: AuthorKind,
    pub verified: bool,
    /// When this author first appeared on the registry, if known
    pub first_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintainerRecord {
    pub name: String,
    pub added_at: Option<DateTime<Utc>>,
}
