use crate::adapters::outbound::network::PyPiRegistryClient;
use crate::analysis::domain::{DeclaredDependency, DeclaredType, Ecosystem};
use crate::ports::outbound::EcosystemAdapter;
use crate::shared::error::AnalysisError;
use crate::shared::security::read_manifest_file;
use crate::shared::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// PythonRequirementsAdapter reads `requirements*.txt` files
///
/// Files whose name mentions dev/test/docs declare dev dependencies.
/// Option lines (`-r`, `-e`, `--index-url`) are skipped; names are PEP 503
/// normalised and a bare name resolves as `*`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PythonRequirementsAdapter;

impl PythonRequirementsAdapter {
    pub fn new() -> Self {
        Self
    }

    fn is_requirements_file(file_name: &str) -> bool {
        file_name.starts_with("requirements") && file_name.ends_with(".txt")
    }

    fn declared_type_for(manifest: &Path) -> DeclaredType {
        let file_name = manifest
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if ["dev", "test", "docs", "lint"]
            .iter()
            .any(|marker| file_name.contains(marker))
        {
            DeclaredType::Dev
        } else {
            DeclaredType::Direct
        }
    }

    /// Parses one requirement line into `(name, range)`; `None` for lines to skip
    fn parse_line(line: &str) -> Option<std::result::Result<(String, String), String>> {
        let line = line.split(" #").next().unwrap_or_default().trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
            return None;
        }
        let requirement = line.split(';').next().unwrap_or_default().trim();

        let name_end = requirement
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
            .unwrap_or(requirement.len());
        let name = &requirement[..name_end];
        if name.is_empty() {
            return Some(Err(format!("cannot read a package name from '{}'", line)));
        }

        let mut rest = requirement[name_end..].trim();
        if rest.starts_with('[') {
            rest = rest.split_once(']').map(|(_, r)| r.trim()).unwrap_or_default();
        }
        let range = if rest.is_empty() { "*" } else { rest };
        Some(Ok((PyPiRegistryClient::normalize_name(name), range.to_string())))
    }
}

impl EcosystemAdapter for PythonRequirementsAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::PyPI
    }

    fn detect_manifests(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(root).map_err(|e| AnalysisError::InvalidProjectPath {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;
        let mut manifests: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(Self::is_requirements_file)
            })
            .collect();
        manifests.sort();
        Ok(manifests)
    }

    fn extract_dependencies(&self, manifest: &Path) -> Result<Vec<DeclaredDependency>> {
        let content = read_manifest_file(manifest, "requirements file")?;
        let declared_type = Self::declared_type_for(manifest);

        content
            .lines()
            .enumerate()
            .filter_map(|(index, line)| Some((index, Self::parse_line(line)?)))
            .map(|(index, parsed)| match parsed {
                Ok((name, range)) => Ok(DeclaredDependency::new(name, range, declared_type)),
                Err(details) => Err(AnalysisError::ManifestError {
                    manifest: manifest.display().to_string(),
                    details: format!("line {}: {}", index + 1, details),
                }
                .into()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detects_requirement_files_sorted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("requirements.txt"), "").unwrap();
        fs::write(dir.path().join("requirements-dev.txt"), "").unwrap();
        fs::write(dir.path().join("setup.py"), "").unwrap();

        let manifests = PythonRequirementsAdapter::new()
            .detect_manifests(dir.path())
            .unwrap();
        let names: Vec<String> = manifests
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["requirements-dev.txt", "requirements.txt"]);
    }

    #[test]
    fn test_parse_lines() {
        let parse = |line| PythonRequirementsAdapter::parse_line(line).map(|r| r.unwrap());
        assert_eq!(parse("Flask_Login>=0.6"), Some(("flask-login".into(), ">=0.6".into())));
        assert_eq!(parse("requests"), Some(("requests".into(), "*".into())));
        assert_eq!(
            parse("uvicorn[standard]==0.23.2 ; python_version >= '3.8'  # server"),
            Some(("uvicorn".into(), "==0.23.2".into()))
        );
        assert_eq!(parse("# comment"), None);
        assert_eq!(parse("-r base.txt"), None);
        assert_eq!(parse("   "), None);
        assert!(PythonRequirementsAdapter::parse_line(">=1.0").unwrap().is_err());
    }

    #[test]
    fn test_extract_with_declared_type() {
        let dir = TempDir::new().unwrap();
        let dev = dir.path().join("requirements-dev.txt");
        fs::write(&dev, "pytest>=7\n# tools\nblack\n").unwrap();

        let deps = PythonRequirementsAdapter::new().extract_dependencies(&dev).unwrap();
        assert_eq!(deps.len(), 2);
        assert!(deps.iter().all(|d| d.declared_type == DeclaredType::Dev));
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("requirements.txt");
        fs::write(&manifest, "requests\n==2.0\n").unwrap();

        let err = PythonRequirementsAdapter::new()
            .extract_dependencies(&manifest)
            .unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
