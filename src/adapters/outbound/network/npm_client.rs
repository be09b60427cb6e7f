use super::http::{build_client, get_json_with_retry, validate_url_component};
use crate::analysis::domain::{
    AuthorInfo, AuthorKind, Ecosystem, MaintainerRecord, PackageMetadata, VersionRecord,
};
use crate::ports::outbound::RegistryClient;
use crate::shared::error::AnalysisError;
use crate::shared::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

const INSTALL_HOOKS: [&str; 3] = ["preinstall", "install", "postinstall"];

#[derive(Debug, Deserialize)]
struct NpmDocument {
    name: String,
    #[serde(default)]
    versions: BTreeMap<String, NpmVersion>,
    #[serde(default)]
    time: BTreeMap<String, String>,
    #[serde(default)]
    author: Option<Value>,
    #[serde(default)]
    maintainers: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct NpmVersion {
    #[serde(default)]
    dependencies: BTreeMap<String, Value>,
    #[serde(default)]
    scripts: BTreeMap<String, Value>,
    #[serde(default)]
    maintainers: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct NpmDownloads {
    #[serde(default)]
    downloads: Option<u64>,
}

/// NpmRegistryClient adapter for the public npm registry
///
/// Reads the full package document (every version with its dependencies,
/// publish times and maintainers) plus the last-week download count.
///
/// # Async Support
/// Uses the async reqwest client; concurrent lookups are bounded by callers.
pub struct NpmRegistryClient {
    client: reqwest::Client,
    registry_url: String,
    downloads_url: String,
    max_retries: u32,
}

impl NpmRegistryClient {
    const REGISTRY_URL: &'static str = "https://registry.npmjs.org";
    const DOWNLOADS_URL: &'static str = "https://api.npmjs.org/downloads/point/last-week";

    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            registry_url: Self::REGISTRY_URL.to_string(),
            downloads_url: Self::DOWNLOADS_URL.to_string(),
            max_retries: 3,
        })
    }

    async fn fetch_document(&self, name: &str) -> Result<NpmDocument> {
        validate_url_component(name, true)?;
        // Scoped packages keep '@' but need the slash encoded
        let encoded = name.replace('/', "%2F");
        let url = format!("{}/{}", self.registry_url, encoded);
        get_json_with_retry(&self.client, &url, self.max_retries).await
    }

    /// Download counts are optional; a failure only loses the popularity signal
    async fn fetch_weekly_downloads(&self, name: &str) -> Option<u64> {
        let url = format!("{}/{}", self.downloads_url, name);
        match get_json_with_retry::<NpmDownloads>(&self.client, &url, 1).await {
            Ok(body) => body.downloads,
            Err(e) => {
                tracing::debug!(package = name, error = %e, "npm download count unavailable");
                None
            }
        }
    }

    fn into_metadata(doc: NpmDocument, weekly_downloads: Option<u64>) -> PackageMetadata {
        let published = |version: &str| doc.time.get(version).and_then(|t| parse_time(t));

        let mut versions: Vec<VersionRecord> = doc
            .versions
            .iter()
            .map(|(version, record)| VersionRecord {
                version: version.clone(),
                published_at: published(version),
                dependencies: record
                    .dependencies
                    .iter()
                    .filter_map(|(name, range)| Some((name.clone(), range.as_str()?.to_string())))
                    .collect(),
                has_install_script: INSTALL_HOOKS.iter().any(|h| record.scripts.contains_key(*h)),
            })
            .collect();
        versions.sort_by_key(|v| v.published_at);

        let maintainers = Self::maintainer_history(&doc, &versions);
        let last_update = versions
            .iter()
            .filter_map(|v| v.published_at)
            .max()
            .or_else(|| doc.time.get("modified").and_then(|t| parse_time(t)));
        let author_name = doc
            .author
            .as_ref()
            .and_then(person_name)
            .or_else(|| doc.maintainers.first().and_then(person_name));

        PackageMetadata {
            name: doc.name.clone(),
            first_published: doc.time.get("created").and_then(|t| parse_time(t)),
            weekly_downloads,
            author: AuthorInfo {
                kind: if author_name.is_some() {
                    AuthorKind::Individual
                } else {
                    AuthorKind::Unknown
                },
                name: author_name,
                verified: false,
                first_seen: None,
            },
            last_update,
            maintainers,
            versions,
        }
    }

    /// A maintainer's `added_at` is the publish time of the first version
    /// listing them. Maintainers present from the first dated release have
    /// none: nobody was added before anything was published.
    fn maintainer_history(doc: &NpmDocument, ordered: &[VersionRecord]) -> Vec<MaintainerRecord> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut added: BTreeMap<String, Option<DateTime<Utc>>> = BTreeMap::new();
        let mut earlier_release = false;

        for record in ordered {
            let Some(version) = doc.versions.get(&record.version) else {
                continue;
            };
            for name in version.maintainers.iter().filter_map(person_name) {
                if seen.insert(name.clone()) {
                    let added_at = if earlier_release { record.published_at } else { None };
                    added.insert(name, added_at);
                }
            }
            earlier_release |= record.published_at.is_some();
        }

        doc.maintainers
            .iter()
            .filter_map(person_name)
            .map(|name| MaintainerRecord {
                added_at: added.get(&name).copied().flatten(),
                name,
            })
            .collect()
    }
}

#[async_trait]
impl RegistryClient for NpmRegistryClient {
    async fn fetch_metadata(&self, ecosystem: &Ecosystem, name: &str) -> Result<PackageMetadata> {
        if *ecosystem != Ecosystem::Npm {
            return Err(AnalysisError::MetadataUnavailable {
                package: name.to_string(),
                reason: format!("npm registry cannot serve {} packages", ecosystem),
            }
            .into());
        }
        let doc = self
            .fetch_document(name)
            .await
            .map_err(|e| AnalysisError::MetadataUnavailable {
                package: name.to_string(),
                reason: e.to_string(),
            })?;
        let downloads = self.fetch_weekly_downloads(name).await;
        Ok(Self::into_metadata(doc, downloads))
    }
}

/// npm people are either `"Name <email> (url)"` strings or `{ "name": .. }` objects
fn person_name(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => s.split('<').next().unwrap_or_default().trim().to_string(),
        Value::Object(map) => map.get("name")?.as_str()?.trim().to_string(),
        _ => return None,
    };
    (!raw.is_empty()).then_some(raw)
}

pub(crate) fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
