//! Integration tests for the repolens CLI.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to create a repolens Command isolated from the caller's environment
fn repolens() -> Command {
    let mut cmd = cargo_bin_cmd!("repolens");
    cmd.env_remove("REPOLENS_ACCESS_TOKEN")
        .env_remove("REPOLENS_API_URL")
        .env_remove("RUST_LOG");
    cmd
}

fn create_temp_project() -> TempDir {
    TempDir::new().unwrap()
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_repolens_help() {
        repolens()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("chat"))
            .stdout(predicate::str::contains("map"));
    }

    #[test]
    fn test_repolens_version() {
        repolens()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_map_requires_project_or_input() {
        let dir = create_temp_project();
        repolens()
            .current_dir(dir.path())
            .arg("map")
            .assert()
            .failure();
    }
}

// =============================================================================
// Config Tests
// =============================================================================

mod config {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = create_temp_project();

        repolens()
            .current_dir(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No repolens.toml found"))
            .stdout(predicate::str::contains("http://localhost:8000"))
            .stdout(predicate::str::contains("sibling_spacing = 120"));
    }

    #[test]
    fn test_config_init_creates_toml() {
        let dir = create_temp_project();

        repolens()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created repolens.toml"));

        let path = dir.path().join(".repolens/repolens.toml");
        assert!(path.exists());
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("[layout]"));
        assert!(content.contains("base_url"));
    }

    #[test]
    fn test_config_init_does_not_overwrite() {
        let dir = create_temp_project();
        fs::create_dir_all(dir.path().join(".repolens")).unwrap();
        fs::write(
            dir.path().join(".repolens/repolens.toml"),
            "[api]\nbase_url = \"https://lens.example.com\"\n",
        )
        .unwrap();

        repolens()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));

        let content = fs::read_to_string(dir.path().join(".repolens/repolens.toml")).unwrap();
        assert!(content.contains("lens.example.com"));
    }

    #[test]
    fn test_config_validate_no_config() {
        let dir = create_temp_project();

        repolens()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Using defaults (valid)"));
    }

    #[test]
    fn test_config_validate_reports_warnings() {
        let dir = create_temp_project();
        fs::create_dir_all(dir.path().join(".repolens")).unwrap();
        fs::write(
            dir.path().join(".repolens/repolens.toml"),
            r#"
[api]
base_url = "ftp://nope"

[viewport]
min_zoom = 4.0
max_zoom = 3.0
"#,
        )
        .unwrap();

        repolens()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration warnings"))
            .stdout(predicate::str::contains("ftp://nope"))
            .stdout(predicate::str::contains("zoom bounds"));
    }

    #[test]
    fn test_config_show_respects_project_dir_and_env() {
        let dir = create_temp_project();

        repolens()
            .args(["config", "show", "--project-dir"])
            .arg(dir.path())
            .env("REPOLENS_API_URL", "https://env.example.com/")
            .assert()
            .success()
            .stdout(predicate::str::contains("api_url = \"https://env.example.com\""));
    }
}

// =============================================================================
// Map Tests
// =============================================================================

mod map {
    use super::*;

    #[test]
    fn test_map_from_file_writes_svg() {
        let dir = create_temp_project();
        let out = dir.path().join("map.svg");

        repolens()
            .current_dir(dir.path())
            .args(["map", "--no-jitter", "--input"])
            .arg(fixture("structure.json"))
            .arg("--out")
            .arg(&out)
            .assert()
            .success()
            .stderr(predicate::str::contains("Wrote 7 nodes across 4 levels"));

        let svg = fs::read_to_string(&out).unwrap();
        assert!(svg.starts_with("<svg"));
        // One link points at a file that is not in the node list.
        assert_eq!(svg.matches("<line ").count(), 6);
        assert!(svg.contains(">acme-web<"));
        // Files are only labelled while hovered.
        assert!(!svg.contains(">auth.ts<"));
    }

    #[test]
    fn test_map_to_stdout_with_hover() {
        let dir = create_temp_project();

        repolens()
            .current_dir(dir.path())
            .args(["map", "--no-jitter", "--hover", "src/lib/auth.ts", "--input"])
            .arg(fixture("structure.json"))
            .assert()
            .success()
            .stdout(predicate::str::starts_with("<svg"))
            .stdout(predicate::str::contains(">auth.ts<"))
            .stdout(predicate::str::contains("stroke=\"#4F8BFF\" stroke-width=\"2\""));
    }

    #[test]
    fn test_map_hover_unknown_node_fails() {
        let dir = create_temp_project();

        repolens()
            .current_dir(dir.path())
            .args(["map", "--hover", "nope", "--input"])
            .arg(fixture("structure.json"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("No node with id 'nope'"));
    }

    #[test]
    fn test_map_empty_structure_fails() {
        let dir = create_temp_project();
        let input = dir.path().join("empty.json");
        fs::write(&input, r#"{"nodes": [], "links": []}"#).unwrap();

        repolens()
            .current_dir(dir.path())
            .args(["map", "--input"])
            .arg(&input)
            .assert()
            .failure()
            .stderr(predicate::str::contains("contains no nodes"));
    }

    #[test]
    fn test_map_project_without_token_fails() {
        let dir = create_temp_project();

        repolens()
            .current_dir(dir.path())
            .args(["map", "proj-1", "--api-url", "http://127.0.0.1:9"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No access token configured"));
    }
}

// =============================================================================
// Project Tests
// =============================================================================

mod projects {
    use super::*;

    #[test]
    fn test_projects_without_token_fails() {
        let dir = create_temp_project();

        repolens()
            .current_dir(dir.path())
            .arg("projects")
            .assert()
            .failure()
            .stderr(predicate::str::contains("REPOLENS_ACCESS_TOKEN"));
    }

    #[test]
    fn test_add_rejects_empty_url() {
        let dir = create_temp_project();

        repolens()
            .current_dir(dir.path())
            .args(["add", "  ", "--token", "tok"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("cannot be empty"));
    }

    #[test]
    fn test_invalid_api_url_is_reported() {
        let dir = create_temp_project();

        repolens()
            .current_dir(dir.path())
            .args(["projects", "--token", "tok", "--api-url", "localhost:8000"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Cannot use API base URL"));
    }
}
