use async_trait::async_trait;
use chainsight::analysis::domain::{
    AuthorInfo, AuthorKind, MaintainerRecord, PackageMetadata, VersionRecord,
};
use chainsight::prelude::*;
use chainsight::shared::error::AnalysisError;
use chrono::{Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Mock RegistryClient serving fixture metadata and counting lookups
#[derive(Default)]
pub struct MockRegistryClient {
    packages: HashMap<String, PackageMetadata>,
    calls: AtomicUsize,
}

impl MockRegistryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one release of an established, popular package
    pub fn with_package(mut self, name: &str, version: &str, dependencies: &[(&str, &str)]) -> Self {
        let metadata = self
            .packages
            .entry(name.to_string())
            .or_insert_with(|| established(name));
        let mut record = VersionRecord::new(version);
        record.published_at = Some(Utc::now() - Duration::days(60));
        record.dependencies = dependencies
            .iter()
            .map(|(n, r)| (n.to_string(), r.to_string()))
            .collect::<BTreeMap<_, _>>();
        metadata.versions.push(record);
        self
    }

    /// Adds a package that looks like a fresh takeover: days old, barely
    /// downloaded, anonymous author, maintainer added with the release
    pub fn with_suspicious_package(mut self, name: &str, version: &str) -> Self {
        let release = Utc::now() - Duration::hours(6);
        // An earlier release published before the new maintainer joined
        let mut earlier = VersionRecord::new("0.0.1");
        earlier.published_at = Some(Utc::now() - Duration::days(2));
        let mut record = VersionRecord::new(version);
        record.published_at = Some(release);
        record.has_install_script = true;
        self.packages.insert(
            name.to_string(),
            PackageMetadata {
                name: name.to_string(),
                versions: vec![earlier, record],
                first_published: Some(Utc::now() - Duration::days(2)),
                weekly_downloads: Some(12),
                author: AuthorInfo::default(),
                last_update: Some(release),
                maintainers: vec![MaintainerRecord {
                    name: "fresh-account".to_string(),
                    added_at: Some(release - Duration::hours(1)),
                }],
            },
        );
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn established(name: &str) -> PackageMetadata {
    PackageMetadata {
        name: name.to_string(),
        versions: Vec::new(),
        first_published: Some(Utc::now() - Duration::days(4 * 365)),
        weekly_downloads: Some(2_000_000),
        author: AuthorInfo {
            name: Some("Example Org".to_string()),
            kind: AuthorKind::Organization,
            verified: true,
            first_seen: Some(Utc::now() - Duration::days(6 * 365)),
        },
        last_update: Some(Utc::now() - Duration::days(60)),
        maintainers: Vec::new(),
    }
}

#[async_trait]
impl RegistryClient for MockRegistryClient {
    async fn fetch_metadata(&self, _ecosystem: &Ecosystem, name: &str) -> Result<PackageMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.packages.get(name).cloned().ok_or_else(|| {
            AnalysisError::MetadataUnavailable {
                package: name.to_string(),
                reason: "not found".to_string(),
            }
            .into()
        })
    }
}
