use super::http::{build_client, get_json_with_retry, validate_url_component};
use super::npm_client::parse_time;
use crate::analysis::domain::{AuthorInfo, AuthorKind, Ecosystem, PackageMetadata, VersionRecord};
use crate::ports::outbound::RegistryClient;
use crate::shared::error::AnalysisError;
use crate::shared::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct PyPiPackageInfo {
    info: PyPiInfo,
    #[serde(default)]
    releases: BTreeMap<String, Vec<PyPiFile>>,
}

#[derive(Debug, Deserialize)]
struct PyPiInfo {
    name: String,
    version: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    author_email: Option<String>,
    #[serde(default)]
    maintainer: Option<String>,
    #[serde(default)]
    requires_dist: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct PyPiFile {
    #[serde(default)]
    upload_time_iso_8601: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecentDownloads {
    data: RecentDownloadsData,
}

#[derive(Debug, Deserialize)]
struct RecentDownloadsData {
    #[serde(default)]
    last_week: Option<u64>,
}

/// PyPiRegistryClient adapter for fetching package metadata from the PyPI JSON API
///
/// The JSON API only exposes `requires_dist` for the latest release, so
/// dependency edges are known for that version alone; older versions
/// resolve as leaves.
///
/// # Async Support
/// Uses async reqwest client for non-blocking HTTP requests.
pub struct PyPiRegistryClient {
    client: reqwest::Client,
    max_retries: u32,
}

impl PyPiRegistryClient {
    const API_URL: &'static str = "https://pypi.org/pypi";
    const STATS_URL: &'static str = "https://pypistats.org/api/packages";

    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            max_retries: 3,
        })
    }

    /// PEP 503 normalisation: lowercase, runs of `-_.` become `-`
    pub fn normalize_name(name: &str) -> String {
        let mut out = String::with_capacity(name.len());
        let mut last_dash = false;
        for c in name.trim().chars() {
            if matches!(c, '-' | '_' | '.') {
                if !last_dash {
                    out.push('-');
                }
                last_dash = true;
            } else {
                out.push(c.to_ascii_lowercase());
                last_dash = false;
            }
        }
        out
    }

    /// Parses one `requires_dist` entry into `(name, range)`.
    /// Requirements only active under an extra are skipped.
    fn parse_requirement(spec: &str) -> Option<(String, String)> {
        let (requirement, marker) = match spec.split_once(';') {
            Some((req, marker)) => (req.trim(), Some(marker)),
            None => (spec.trim(), None),
        };
        if marker.is_some_and(|m| m.contains("extra")) {
            return None;
        }

        let name_end = requirement
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
            .unwrap_or(requirement.len());
        let name = &requirement[..name_end];
        if name.is_empty() {
            return None;
        }

        let mut rest = requirement[name_end..].trim();
        if rest.starts_with('[') {
            rest = rest.split_once(']').map(|(_, r)| r.trim()).unwrap_or_default();
        }
        let range = rest.trim_start_matches('(').trim_end_matches(')').trim();
        let range = if range.is_empty() { "*" } else { range };
        Some((Self::normalize_name(name), range.to_string()))
    }

    fn into_metadata(package: PyPiPackageInfo, weekly_downloads: Option<u64>) -> PackageMetadata {
        let latest = package.info.version.clone();
        let latest_dependencies: BTreeMap<String, String> = package
            .info
            .requires_dist
            .iter()
            .flatten()
            .filter_map(|spec| Self::parse_requirement(spec))
            .collect();

        let mut versions: Vec<VersionRecord> = package
            .releases
            .iter()
            .filter(|(_, files)| !files.is_empty())
            .map(|(version, files)| VersionRecord {
                version: version.clone(),
                published_at: files
                    .iter()
                    .filter_map(|f| f.upload_time_iso_8601.as_deref().and_then(parse_time))
                    .min(),
                dependencies: if *version == latest {
                    latest_dependencies.clone()
                } else {
                    BTreeMap::new()
                },
                has_install_script: false,
            })
            .collect();
        versions.sort_by_key(|v| v.published_at);

        let author_name = [
            &package.info.author,
            &package.info.maintainer,
            &package.info.author_email,
        ]
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(str::to_string);

        PackageMetadata {
            name: Self::normalize_name(&package.info.name),
            first_published: versions.iter().filter_map(|v| v.published_at).min(),
            last_update: versions.iter().filter_map(|v| v.published_at).max(),
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
            maintainers: Vec::new(),
            versions,
        }
    }

    async fn fetch_weekly_downloads(&self, name: &str) -> Option<u64> {
        let url = format!("{}/{}/recent", Self::STATS_URL, name);
        match get_json_with_retry::<RecentDownloads>(&self.client, &url, 1).await {
            Ok(body) => body.data.last_week,
            Err(e) => {
                tracing::debug!(package = name, error = %e, "PyPI download stats unavailable");
                None
            }
        }
    }
}

#[async_trait]
impl RegistryClient for PyPiRegistryClient {
    async fn fetch_metadata(&self, ecosystem: &Ecosystem, name: &str) -> Result<PackageMetadata> {
        let unavailable = |reason: String| AnalysisError::MetadataUnavailable {
            package: name.to_string(),
            reason,
        };
        if *ecosystem != Ecosystem::PyPI {
            return Err(unavailable(format!("PyPI cannot serve {} packages", ecosystem)).into());
        }
        validate_url_component(name, false).map_err(|e| unavailable(e.to_string()))?;

        let normalized = Self::normalize_name(name);
        let url = format!(
            "{}/{}/json",
            Self::API_URL,
            urlencoding::encode(&normalized)
        );
        let package: PyPiPackageInfo = get_json_with_retry(&self.client, &url, self.max_retries)
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        let downloads = self.fetch_weekly_downloads(&normalized).await;
        Ok(Self::into_metadata(package, downloads))
    }
}
