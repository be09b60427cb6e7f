use super::http::build_client;
use crate::analysis::domain::{
    CvssScore, PackageId, PackageVulnerabilities, Severity, StageContext, StageName, StagePayload,
    Vulnerability, VulnerabilityPayload,
};
use crate::application::services::CacheManager;
use crate::ports::outbound::StageAnalyzer;
use crate::shared::Result;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

/// OSV-backed vulnerability stage
///
/// Uses the OSV.dev batch query API to find advisory ids for every resolved
/// package, then fetches each advisory for severity and fix information.
/// Both lookups go through the shared cache.
///
/// # Errors
/// A failed batch query fails the stage (the orchestrator then falls back
/// to rule-based findings). A failed advisory lookup only drops that advisory.
pub struct OsvVulnerabilitySource {
    client: reqwest::Client,
    api_url: String,
    cache: Arc<CacheManager>,
    worker_pool_size: usize,
}

impl OsvVulnerabilitySource {
    const API_URL: &'static str = "https://api.osv.dev/v1";
    const RATE_LIMIT_MS: u64 = 100;
    const MAX_BATCH_SIZE: usize = 100;
    pub const SOURCE: &'static str = "osv.dev";

    pub fn new(cache: Arc<CacheManager>, call_timeout: Duration, worker_pool_size: usize) -> Result<Self> {
        Ok(Self {
            client: build_client(call_timeout)?,
            api_url: Self::API_URL.to_string(),
            cache,
            worker_pool_size: worker_pool_size.max(1),
        })
    }

    fn ids_key(package: &PackageId) -> String {
        format!("osv:query:{}", package.key())
    }

    fn advisory_key(id: &str) -> String {
        format!("osv:vuln:{}", id)
    }

    /// Advisory ids per package, cache first
    async fn advisory_ids(&self, packages: &[&PackageId]) -> Result<BTreeMap<String, Vec<String>>> {
        let mut ids: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut uncached: Vec<&PackageId> = Vec::new();
        for package in packages.iter().copied() {
            match self.cache.get_as::<Vec<String>>(&Self::ids_key(package)) {
                Some(cached) => {
                    ids.insert(package.key(), cached);
                }
                None => uncached.push(package),
            }
        }

        for (index, chunk) in uncached.chunks(Self::MAX_BATCH_SIZE).enumerate() {
            if index > 0 {
                tokio::time::sleep(Duration::from_millis(Self::RATE_LIMIT_MS)).await;
            }
            let results = self.query_batch(chunk).await?;
            for (package, result) in chunk.iter().zip(results) {
                let found: Vec<String> = result.vulns.into_iter().map(|v| v.id).collect();
                self.cache.put_json(&Self::ids_key(package), &found, self.cache.default_ttl());
                ids.insert(package.key(), found);
            }
        }
        Ok(ids)
    }

    async fn query_batch(&self, packages: &[&PackageId]) -> Result<Vec<OsvResult>> {
        let batch = OsvBatchQuery {
            queries: packages
                .iter()
                .map(|p| OsvQuery {
                    package: OsvPackage {
                        name: p.name().to_string(),
                        ecosystem: p.ecosystem.osv_name().to_string(),
                    },
                    version: p.version().to_string(),
                })
                .collect(),
        };

        let url = format!("{}/querybatch", self.api_url);
        let response = self.client.post(&url).json(&batch).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("OSV API returned status code {}", response.status());
        }
        let body: OsvBatchResponse = response.json().await?;
        if body.results.len() != packages.len() {
            anyhow::bail!(
                "OSV API answered {} of {} queries",
                body.results.len(),
                packages.len()
            );
        }
        Ok(body.results)
    }

    async fn advisory(&self, id: &str) -> Option<Vulnerability> {
        let key = Self::advisory_key(id);
        if let Some(cached) = self.cache.get_as::<Vulnerability>(&key) {
            return Some(cached);
        }

        let url = format!("{}/vulns/{}", self.api_url, urlencoding::encode(id));
        let fetched = async {
            let response = self.client.get(&url).send().await?;
            if !response.status().is_success() {
                anyhow::bail!("OSV API returned status code {} for {}", response.status(), id);
            }
            Ok::<OsvVulnerability, anyhow::Error>(response.json().await?)
        }
        .await;

        match fetched.and_then(|osv| convert_to_vulnerability(&osv)) {
            Ok(vulnerability) => {
                self.cache.put_json(&key, &vulnerability, self.cache.default_ttl());
                Some(vulnerability)
            }
            Err(e) => {
                tracing::warn!(advisory = id, error = %e, "failed to fetch advisory details");
                None
            }
        }
    }
}

#[async_trait]
impl StageAnalyzer for OsvVulnerabilitySource {
    fn stage(&self) -> StageName {
        StageName::Vulnerability
    }

    async fn analyze(&self, ctx: &StageContext<'_>) -> Result<StagePayload> {
        let packages = ctx.graph.packages();
        let ids = self.advisory_ids(&packages).await?;

        let unique: BTreeSet<&str> = ids.values().flatten().map(String::as_str).collect();
        let lookups: Vec<BoxFuture<'_, _>> = unique
            .into_iter()
            .map(|id| async move { self.advisory(id).await.map(|v| (id.to_string(), v)) }.boxed())
            .collect();
        let advisories: HashMap<String, Vulnerability> = stream::iter(lookups)
            .buffer_unordered(self.worker_pool_size)
            .filter_map(|found| async move { found })
            .collect()
            .await;

        let packages = ids
            .into_iter()
            .filter_map(|(key, ids)| {
                let vulnerabilities: Vec<Vulnerability> = ids
                    .iter()
                    .filter_map(|id| advisories.get(id).cloned())
                    .collect();
                (!vulnerabilities.is_empty())
                    .then(|| (key, PackageVulnerabilities::new(vulnerabilities)))
            })
            .collect();

        Ok(StagePayload::Vulnerability(VulnerabilityPayload {
            packages,
            source: Self::SOURCE.to_string(),
        }))
    }
}

// OSV API request/response structures

#[derive(Debug, Serialize)]
struct OsvBatchQuery {
    queries: Vec<OsvQuery>,
}

#[derive(Debug, Serialize)]
struct OsvQuery {
    package: OsvPackage,
    version: String,
}

#[derive(Debug, Serialize)]
struct OsvPackage {
    name: String,
    ecosystem: String,
}

#[derive(Debug, Deserialize)]
struct OsvBatchResponse {
    #[serde(default)]
    results: Vec<OsvResult>,
}

#[derive(Debug, Deserialize)]
struct OsvResult {
    #[serde(default)]
    vulns: Vec<OsvVulnerabilityRef>,
}

#[derive(Debug, Deserialize)]
struct OsvVulnerabilityRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct OsvVulnerability {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    severity: Vec<OsvSeverity>,
    #[serde(default)]
    database_specific: Option<DatabaseSpecific>,
    #[serde(default)]
    affected: Vec<OsvAffected>,
}

#[derive(Debug, Deserialize)]
struct OsvSeverity {
    #[serde(rename = "type")]
    severity_type: String,
    score: String,
}

#[derive(Debug, Deserialize)]
struct DatabaseSpecific {
    #[serde(default)]
    severity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OsvAffected {
    #[serde(default)]
    ranges: Vec<OsvRange>,
}

#[derive(Debug, Deserialize)]
struct OsvRange {
    #[serde(default)]
    events: Vec<OsvEvent>,
}

#[derive(Debug, Deserialize)]
struct OsvEvent {
    #[serde(default)]
    fixed: Option<String>,
}

/// Severity comes from the CVSS v3 vector when present, else the
/// advisory database's own label.
fn convert_to_vulnerability(osv: &OsvVulnerability) -> Result<Vulnerability> {
    let cvss_score = osv
        .severity
        .iter()
        .find(|s| s.severity_type == "CVSS_V3")
        .and_then(|s| parse_cvss_score(&s.score));

    let severity = match cvss_score {
        Some(score) => Severity::from_cvss_score(score),
        None => osv
            .database_specific
            .as_ref()
            .and_then(|db| db.severity.as_deref())
            .map(parse_severity_string)
            .unwrap_or(Severity::None),
    };

    let fixed_version = osv
        .affected
        .iter()
        .flat_map(|a| &a.ranges)
        .flat_map(|r| &r.events)
        .find_map(|e| e.fixed.clone());

    Vulnerability::new(
        osv.id.clone(),
        cvss_score,
        severity,
        fixed_version,
        osv.summary.clone(),
    )
}

/// CVSS v3.x base score computed from a vector string
///
/// Example: "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H" -> Some(9.8)
fn parse_cvss_score(vector: &str) -> Option<CvssScore> {
    let metrics: HashMap<&str, &str> = vector
        .split('/')
        .skip(1)
        .filter_map(|part| part.split_once(':'))
        .collect();
    let metric = |name: &str| metrics.get(name).copied();

    let scope_changed = match metric("S")? {
        "U" => false,
        "C" => true,
        _ => return None,
    };
    let attack_vector = match metric("AV")? {
        "N" => 0.85,
        "A" => 0.62,
        "L" => 0.55,
        "P" => 0.2,
        _ => return None,
    };
    let complexity = match metric("AC")? {
        "L" => 0.77,
        "H" => 0.44,
        _ => return None,
    };
    let privileges = match (metric("PR")?, scope_changed) {
        ("N", _) => 0.85,
        ("L", false) => 0.62,
        ("L", true) => 0.68,
        ("H", false) => 0.27,
        ("H", true) => 0.5,
        _ => return None,
    };
    let interaction = match metric("UI")? {
        "N" => 0.85,
        "R" => 0.62,
        _ => return None,
    };
    let impact_of = |name: &str| match metric(name)? {
        "N" => Some(0.0),
        "L" => Some(0.22),
        "H" => Some(0.56),
        _ => None,
    };
    let (c, i, a) = (impact_of("C")?, impact_of("I")?, impact_of("A")?);

    let iss: f64 = 1.0 - (1.0 - c) * (1.0 - i) * (1.0 - a);
    let impact = if scope_changed {
        7.52 * (iss - 0.029) - 3.25 * (iss - 0.02).powi(15)
    } else {
        6.42 * iss
    };
    let exploitability = 8.22 * attack_vector * complexity * privileges * interaction;

    let base = if impact <= 0.0 {
        0.0
    } else if scope_changed {
        f64::min(1.08 * (impact + exploitability), 10.0)
    } else {
        f64::min(impact + exploitability, 10.0)
    };
    CvssScore::new(((base * 10.0).ceil() / 10.0) as f32).ok()
}

/// Maps the OSV `database_specific.severity` label
fn parse_severity_string(severity: &str) -> Severity {
    match severity.to_uppercase().as_str() {
        "CRITICAL" => Severity::Critical,
        "HIGH" => Severity::High,
        "MODERATE" | "MEDIUM" => Severity::Medium,
        "LOW" => Severity::Low,
        _ => Severity::None,
    }
}
