use crate::analysis::domain::{DeclaredDependency, DeclaredType, Ecosystem};
use crate::ports::outbound::EcosystemAdapter;
use crate::shared::error::AnalysisError;
use crate::shared::security::read_manifest_file;
use crate::shared::Result;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

const MANIFEST_NAME: &str = "package.json";

/// NpmManifestAdapter reads `package.json`
///
/// `dependencies` and `optionalDependencies` are direct, `devDependencies`
/// are dev. Ranges are passed through untouched; anything the registry
/// cannot resolve (git URLs, `file:` links) ends up as an unresolved node.
#[derive(Debug, Default, Clone, Copy)]
pub struct NpmManifestAdapter;

impl NpmManifestAdapter {
    pub fn new() -> Self {
        Self
    }

    fn parse(manifest: &Path) -> Result<Map<String, Value>> {
        let content = read_manifest_file(manifest, MANIFEST_NAME)?;
        let malformed = |details: String| AnalysisError::ManifestError {
            manifest: manifest.display().to_string(),
            details,
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(malformed("top level is not a JSON object".to_string()).into()),
            Err(e) => Err(malformed(e.to_string()).into()),
        }
    }

    fn section(
        manifest: &Path,
        document: &Map<String, Value>,
        key: &str,
        declared_type: DeclaredType,
    ) -> Result<Vec<DeclaredDependency>> {
        let Some(section) = document.get(key) else {
            return Ok(Vec::new());
        };
        let Value::Object(entries) = section else {
            return Err(AnalysisError::ManifestError {
                manifest: manifest.display().to_string(),
                details: format!("'{}' must be an object", key),
            }
            .into());
        };

        entries
            .iter()
            .map(|(name, range)| match range.as_str() {
                Some(range) => Ok(DeclaredDependency::new(name.clone(), range.trim(), declared_type)),
                None => Err(AnalysisError::ManifestError {
                    manifest: manifest.display().to_string(),
                    details: format!("range of '{}' in '{}' is not a string", name, key),
                }
                .into()),
            })
            .collect()
    }
}

impl EcosystemAdapter for NpmManifestAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    fn detect_manifests(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let candidate = root.join(MANIFEST_NAME);
        Ok(if candidate.is_file() {
            vec![candidate]
        } else {
            Vec::new()
        })
    }

    fn extract_dependencies(&self, manifest: &Path) -> Result<Vec<DeclaredDependency>> {
        let document = Self::parse(manifest)?;
        let mut dependencies = Self::section(manifest, &document, "dependencies", DeclaredType::Direct)?;
        dependencies.extend(Self::section(
            manifest,
            &document,
            "optionalDependencies",
            DeclaredType::Direct,
        )?);
        dependencies.extend(Self::section(manifest, &document, "devDependencies", DeclaredType::Dev)?);
        Ok(dependencies)
    }

    fn read_project_name(&self, manifest: &Path) -> Option<String> {
        let document = Self::parse(manifest).ok()?;
        document
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project(content: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MANIFEST_NAME), content).unwrap();
        dir
    }

    #[test]
    fn test_detects_package_json() {
        let dir = project("{}");
        let adapter = NpmManifestAdapter::new();
        assert_eq!(adapter.detect_manifests(dir.path()).unwrap().len(), 1);

        let empty = TempDir::new().unwrap();
        assert!(adapter.detect_manifests(empty.path()).unwrap().is_empty());
    }

    #[test]
    fn test_extracts_sections() {
        let dir = project(
            r#"{
                "name": "web-app",
                "dependencies": {"express": "^4.18.0", "lodash": "4.17.21"},
                "optionalDependencies": {"fsevents": "~2.3.0"},
                "devDependencies": {"jest": "^29.0.0"}
            }"#,
        );
        let adapter = NpmManifestAdapter::new();
        let manifest = dir.path().join(MANIFEST_NAME);
        let deps = adapter.extract_dependencies(&manifest).unwrap();

        assert_eq!(deps.len(), 4);
        let jest = deps.iter().find(|d| d.name == "jest").unwrap();
        assert_eq!(jest.declared_type, DeclaredType::Dev);
        let fsevents = deps.iter().find(|d| d.name == "fsevents").unwrap();
        assert_eq!(fsevents.declared_type, DeclaredType::Direct);
        assert_eq!(adapter.read_project_name(&manifest).as_deref(), Some("web-app"));
    }

    #[test]
    fn test_malformed_manifest() {
        let adapter = NpmManifestAdapter::new();

        let dir = project("{ not json");
        let err = adapter
            .extract_dependencies(&dir.path().join(MANIFEST_NAME))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalysisError>(),
            Some(AnalysisError::ManifestError { .. })
        ));

        let dir = project(r#"{"dependencies": {"x": 1}}"#);
        assert!(adapter
            .extract_dependencies(&dir.path().join(MANIFEST_NAME))
            .is_err());
    }

    #[test]
    fn test_missing_name() {
        let dir = project(r#"{"dependencies": {}}"#);
        let adapter = NpmManifestAdapter::new();
        assert!(adapter
            .read_project_name(&dir.path().join(MANIFEST_NAME))
            .is_none());
    }
}
