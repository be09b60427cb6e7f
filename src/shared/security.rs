use crate::shared::error::AnalysisError;
use crate::shared::Result;
use std::fs;
use std::path::Path;

/// Maximum manifest size (10 MB); larger inputs are rejected before parsing
pub const MAX_MANIFEST_SIZE: u64 = 10 * 1024 * 1024;

/// Reads a manifest file after checking it is a regular, reasonably sized file.
///
/// # Security
/// Symbolic links are refused (checked with `symlink_metadata`, not `metadata`,
/// so the link itself is inspected rather than its target).
///
/// # Arguments
/// * `path` - Manifest location reported by an ecosystem adapter
/// * `description` - Human name of the file for error messages (e.g. "package.json")
pub fn read_manifest_file(path: &Path, description: &str) -> Result<String> {
    let metadata = fs::symlink_metadata(path).map_err(|e| AnalysisError::FileReadError {
        path: path.to_path_buf(),
        details: format!("Failed to read {} metadata: {}", description, e),
    })?;

    if metadata.is_symlink() {
        return Err(AnalysisError::SecurityError {
            path: path.to_path_buf(),
            reason: format!("{} is a symbolic link", description),
            hint: "Point the analysis at the real manifest file instead of a link".to_string(),
        }
        .into());
    }

    if !metadata.is_file() {
        return Err(AnalysisError::FileReadError {
            path: path.to_path_buf(),
            details: format!("{} is not a regular file", description),
        }
        .into());
    }

    if metadata.len() > MAX_MANIFEST_SIZE {
        return Err(AnalysisError::SecurityError {
            path: path.to_path_buf(),
            reason: format!(
                "{} is too large ({} bytes, limit {} bytes)",
                description,
                metadata.len(),
                MAX_MANIFEST_SIZE
            ),
            hint: "Manifests of this size are not supported".to_string(),
        }
        .into());
    }

    fs::read_to_string(path).map_err(|e| {
        AnalysisError::FileReadError {
            path: path.to_path_buf(),
            details: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_regular_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("package.json");
        fs::write(&file_path, "{}").unwrap();

        let content = read_manifest_file(&file_path, "package.json").unwrap();
        assert_eq!(content, "{}");
    }

    #[test]
    fn test_read_directory_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let result = read_manifest_file(temp_dir.path(), "package.json");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("not a regular file"));
    }

    #[test]
    fn test_read_missing_file() {
        let result = read_manifest_file(Path::new("/nonexistent/package.json"), "package.json");
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_read_symlink_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("real.txt");
        let link = temp_dir.path().join("requirements.txt");
        fs::write(&target, "requests==2.31.0").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let result = read_manifest_file(&link, "requirements.txt");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("symbolic link"));
    }
}
