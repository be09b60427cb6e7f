/// End-to-end tests for the CLI
///
/// Projects here declare no registry dependencies, so runs stay offline.
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn project_with(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

fn empty_npm_project() -> TempDir {
    project_with(&[(
        "package.json",
        r#"{"name": "offline-app", "version": "1.0.0", "dependencies": {}}"#,
    )])
}

fn path_arg(dir: &Path) -> String {
    dir.to_string_lossy().to_string()
}

// Exit code tests for CLI
mod exit_code_tests {
    use super::*;

    /// Exit code 0: Success - normal execution
    #[test]
    fn test_exit_code_success() {
        let project = empty_npm_project();
        cargo_bin_cmd!("chainsight")
            .args(["-p", &path_arg(project.path()), "--no-cache"])
            .assert()
            .code(0);
    }

    /// Exit code 0: --help should return success
    #[test]
    fn test_exit_code_help() {
        cargo_bin_cmd!("chainsight")
            .arg("--help")
            .assert()
            .code(0)
            .stdout(predicate::str::contains("dependency tree"));
    }

    /// Exit code 0: --version should return success
    #[test]
    fn test_exit_code_version() {
        cargo_bin_cmd!("chainsight").arg("--version").assert().code(0);
    }

    /// Exit code 2: Invalid arguments
    #[test]
    fn test_exit_code_invalid_argument() {
        cargo_bin_cmd!("chainsight")
            .arg("--invalid-option")
            .assert()
            .code(2);
    }

    /// Exit code 2: Invalid ecosystem value
    #[test]
    fn test_exit_code_invalid_ecosystem() {
        cargo_bin_cmd!("chainsight")
            .args(["--ecosystem", "maven"])
            .assert()
            .code(2);
    }

    /// Exit code 3: Application error - non-existent project path
    #[test]
    fn test_exit_code_application_error_nonexistent_path() {
        cargo_bin_cmd!("chainsight")
            .args(["-p", "/nonexistent/path/that/does/not/exist"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("Directory does not exist"));
    }

    /// Exit code 3: Application error - path is a file, not a directory
    #[test]
    fn test_exit_code_application_error_file_not_directory() {
        let project = empty_npm_project();
        let file = project.path().join("package.json");
        cargo_bin_cmd!("chainsight")
            .args(["-p", &path_arg(&file)])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("Not a directory"));
    }

    /// Exit code 3: Application error - no supported manifest
    #[test]
    fn test_exit_code_application_error_no_manifest() {
        let project = project_with(&[("README.md", "# nothing here")]);
        cargo_bin_cmd!("chainsight")
            .args(["-p", &path_arg(project.path())])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("no supported manifest found"));
    }

    /// Exit code 3: Application error - malformed manifest
    #[test]
    fn test_exit_code_application_error_malformed_manifest() {
        let project = project_with(&[("package.json", "{ \"dependencies\": [1, 2] ")]);
        cargo_bin_cmd!("chainsight")
            .args(["-p", &path_arg(project.path()), "--no-cache"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("Manifest data is unusable"));
    }

    /// Exit code 3: Application error - threshold outside [0, 1]
    #[test]
    fn test_exit_code_application_error_threshold_out_of_range() {
        let project = empty_npm_project();
        cargo_bin_cmd!("chainsight")
            .args(["-p", &path_arg(project.path()), "--fail-on-risk", "1.5"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("between 0.0 and 1.0"));
    }
}

mod report_tests {
    use super::*;

    #[test]
    fn test_report_written_to_stdout() {
        let project = empty_npm_project();
        cargo_bin_cmd!("chainsight")
            .args(["-p", &path_arg(project.path()), "--no-cache"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"degradation\""))
            .stdout(predicate::str::contains("offline-app"));
    }

    #[test]
    fn test_report_written_to_file() {
        let project = empty_npm_project();
        let output = project.path().join("report.json");
        cargo_bin_cmd!("chainsight")
            .args([
                "-p",
                &path_arg(project.path()),
                "--no-cache",
                "-o",
                &path_arg(&output),
            ])
            .assert()
            .success();

        let content = fs::read_to_string(&output).unwrap();
        let report: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(report["metadata"]["root_project"], "offline-app");
        assert_eq!(report["summary"]["total_packages"], 0);
    }

    #[test]
    fn test_disk_cache_directory_created() {
        let project = empty_npm_project();
        let cache_dir = project.path().join(".chainsight-cache");
        cargo_bin_cmd!("chainsight")
            .args([
                "-p",
                &path_arg(project.path()),
                "--cache-dir",
                &path_arg(&cache_dir),
            ])
            .assert()
            .success();
        assert!(cache_dir.is_dir());
    }
}

mod config_file_tests {
    use super::*;

    /// Auto-discovered config with an invalid value aborts before analysis
    #[test]
    fn test_invalid_discovered_config() {
        let project = project_with(&[
            ("package.json", r#"{"name": "offline-app"}"#),
            ("chainsight.config.yml", "worker_pool_size: 0\n"),
        ]);
        cargo_bin_cmd!("chainsight")
            .args(["-p", &path_arg(project.path())])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("worker_pool_size"));
    }

    #[test]
    fn test_explicit_config_path() {
        let project = empty_npm_project();
        let config_dir = TempDir::new().unwrap();
        let config = config_dir.path().join("custom.yml");
        fs::write(&config, "cache:\n  enabled: false\nfail_on_risk: 0.9\n").unwrap();
        cargo_bin_cmd!("chainsight")
            .args([
                "-p",
                &path_arg(project.path()),
                "--config",
                &path_arg(&config),
            ])
            .assert()
            .success();
    }

    #[test]
    fn test_missing_explicit_config() {
        let project = empty_npm_project();
        cargo_bin_cmd!("chainsight")
            .args([
                "-p",
                &path_arg(project.path()),
                "--config",
                "/nonexistent/chainsight.yml",
            ])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("Failed to read config file"));
    }

    #[test]
    fn test_unknown_config_field_warns() {
        let project = project_with(&[
            ("package.json", r#"{"name": "offline-app"}"#),
            ("chainsight.config.yml", "colour: blue\n"),
        ]);
        cargo_bin_cmd!("chainsight")
            .args(["-p", &path_arg(project.path()), "--no-cache"])
            .assert()
            .success()
            .stderr(predicate::str::contains("Unknown config field 'colour'"));
    }

    #[test]
    fn test_custom_rules_file() {
        let project = project_with(&[
            ("package.json", r#"{"name": "offline-app"}"#),
            (
                "rules.yml",
                "version: custom@1\nrules:\n  - id: LOCAL-1\n    description: blocked\n    name_pattern: '^blocked$'\n    finding_type: malicious_code\n    severity: high\n",
            ),
            ("chainsight.config.yml", "rules_file: rules.yml\n"),
        ]);
        cargo_bin_cmd!("chainsight")
            .args(["-p", &path_arg(project.path()), "--no-cache"])
            .assert()
            .success();
    }
}
