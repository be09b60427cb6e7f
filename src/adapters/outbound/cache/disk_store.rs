use crate::ports::outbound::{CacheEntry, CacheStore};
use crate::shared::error::AnalysisError;
use crate::shared::Result;
use anyhow::Context;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Cache store persisting one JSON file per entry under a directory.
///
/// File names are the SHA-256 of the key, so arbitrary keys map to safe
/// paths. Entries survive across runs.
#[derive(Debug, Clone)]
pub struct DiskCacheStore {
    directory: PathBuf,
}

impl DiskCacheStore {
    /// Opens (creating if needed) a cache directory
    pub fn new(directory: PathBuf) -> Result<Self> {
        fs::create_dir_all(&directory).map_err(|e| AnalysisError::CacheUnavailable {
            reason: format!(
                "cannot create cache directory {}: {}",
                directory.display(),
                e
            ),
        })?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn key_to_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        let name: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        self.directory.join(format!("{}.json", name))
    }

    fn read_entry(path: &Path) -> Result<CacheEntry> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read cache file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("corrupt cache file {}", path.display()))
    }

    /// Writes through a uniquely named temporary file, then renames it over
    /// the entry so readers never see a partial file
    fn write_entry(&self, entry: &CacheEntry) -> Result<()> {
        let path = self.key_to_path(&entry.key);
        let mut tmp = NamedTempFile::new_in(&self.directory).with_context(|| {
            format!("failed to create temporary file in {}", self.directory.display())
        })?;
        serde_json::to_writer(&mut tmp, entry)?;
        tmp.flush()?;
        tmp.persist(&path)
            .with_context(|| format!("failed to move cache file into {}", path.display()))?;
        Ok(())
    }

    fn entry_paths(&self) -> Result<Vec<PathBuf>> {
        let paths = fs::read_dir(&self.directory)
            .with_context(|| format!("failed to list {}", self.directory.display()))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        Ok(paths)
    }
}

impl CacheStore for DiskCacheStore {
    fn load(&self, key: &str) -> Result<Option<CacheEntry>> {
        let path = self.key_to_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let entry = Self::read_entry(&path)?;
        // Hash collision or foreign file: treat as absent
        if entry.key != key {
            return Ok(None);
        }
        Ok(Some(entry))
    }

    fn save(&self, entry: CacheEntry) -> Result<()> {
        self.write_entry(&entry)
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let path = self.key_to_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
        }
    }

    fn touch(&self, key: &str, accessed_at: DateTime<Utc>, access_seq: u64) -> Result<()> {
        if let Some(mut entry) = self.load(key)? {
            entry.last_accessed = accessed_at;
            entry.access_seq = access_seq;
            entry.hit_count += 1;
            self.write_entry(&entry)?;
        }
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.entry_paths()?.len())
    }

    fn least_recently_used(&self) -> Result<Option<String>> {
        Ok(self
            .entries()?
            .into_iter()
            .min_by_key(|e| e.recency())
            .map(|e| e.key))
    }

    fn entries(&self) -> Result<Vec<CacheEntry>> {
        // Unreadable files are skipped so one corrupt entry cannot poison the cache
        Ok(self
            .entry_paths()?
            .iter()
            .filter_map(|p| Self::read_entry(p).ok())
            .collect())
    }

    fn clear(&self) -> Result<()> {
        for path in self.entry_paths()? {
            let _ = fs::remove_file(path);
        }
        Ok(())
    }
}
