//! Integration tests for the osb CLI
//!
//! These tests require a running S3-compatible server and an existing bucket.
//!
//! Run with:
//! ```bash
//! # Start RustFS container
//! docker run -d --name rustfs -p 9000:9000 \
//!     -e RUSTFS_ACCESS_KEY=accesskey \
//!     -e RUSTFS_SECRET_KEY=secretkey \
//!     rustfs/rustfs:1.0.0-alpha.81
//!
//! # Run tests
//! TEST_S3_ENDPOINT=http://localhost:9000 TEST_S3_ACCESS_KEY=accesskey \
//!     TEST_S3_SECRET_KEY=secretkey TEST_S3_BUCKET=osb-test \
//!     cargo test --features integration
//! ```

#![cfg(feature = "integration")]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// S3 connection details from the environment
struct TestConfig {
    endpoint: String,
    access_key: String,
    secret_key: String,
    bucket: String,
}

fn get_test_config() -> Option<TestConfig> {
    Some(TestConfig {
        endpoint: std::env::var("TEST_S3_ENDPOINT").ok()?,
        access_key: std::env::var("TEST_S3_ACCESS_KEY").ok()?,
        secret_key: std::env::var("TEST_S3_SECRET_KEY").ok()?,
        bucket: std::env::var("TEST_S3_BUCKET").ok()?,
    })
}

/// Write a config file whose default profile points at the test server
fn setup_config(config: &TestConfig, key_prefix: &str) -> TempDir {
    let config_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let content = format!(
        r#"
schema_version = 1

[[profiles]]
name = "DEFAULT"
namespace = "test"
region = "us-east-1"
endpoint = "{}"
access_key = "{}"
secret_key = "{}"
bucket = "{}"
key_prefix = "{}"
"#,
        config.endpoint, config.access_key, config.secret_key, config.bucket, key_prefix
    );
    std::fs::write(config_dir.path().join("config.toml"), content).expect("write config");
    config_dir
}

fn run_osb(args: &[&str], config_dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_osb"))
        .args(args)
        .env("OSB_CONFIG_DIR", config_dir)
        .env_remove("OSB_ACCESS_KEY")
        .env_remove("OSB_SECRET_KEY")
        .output()
        .expect("Failed to execute osb")
}

/// Generate unique suffix for test resources
fn uuid_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{:x}", duration.as_nanos() % 0xFFFFFFFF)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Build a small tree to upload
fn sample_tree() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let root = dir.path().join("tree");
    std::fs::create_dir_all(root.join("nested")).unwrap();
    std::fs::write(root.join("a.txt"), b"alpha").unwrap();
    std::fs::write(root.join(".hidden"), b"hidden").unwrap();
    std::fs::write(root.join("nested/b.bin"), vec![7u8; 4096]).unwrap();
    let root = std::fs::canonicalize(root).unwrap();
    (dir, root)
}

mod transfers {
    use super::*;

    #[test]
    fn test_upload_list_download_delete() {
        let Some(config) = get_test_config() else {
            eprintln!("Skipping: S3 test config not available");
            return;
        };
        let prefix = format!("run-{}", uuid_suffix());
        let config_dir = setup_config(&config, &prefix);
        let (_tree_dir, root) = sample_tree();

        let output = run_osb(&["-a", "upload", "-s", root.to_str().unwrap()], config_dir.path());
        assert!(output.status.success(), "upload failed: {}", stdout(&output));
        assert!(stdout(&output).contains("All transfers succeeded"));

        let remote_root = format!("{prefix}{}", root.display());
        let output = run_osb(&["-a", "list", "-s", &remote_root], config_dir.path());
        assert!(output.status.success());
        let listing = stdout(&output);
        assert!(listing.contains(&format!("             5 - {remote_root}/a.txt")));
        assert!(listing.contains(&format!("         4,096 - {remote_root}/nested/b.bin")));
        assert!(listing.contains(".hidden"));

        let download_dir = tempfile::tempdir().unwrap();
        let output = run_osb(
            &[
                "-a",
                "download",
                "-s",
                &remote_root,
                "-d",
                download_dir.path().to_str().unwrap(),
            ],
            config_dir.path(),
        );
        assert!(output.status.success(), "download failed: {}", stdout(&output));
        assert_eq!(
            std::fs::read(download_dir.path().join("a.txt")).unwrap(),
            b"alpha"
        );
        assert_eq!(
            std::fs::read(download_dir.path().join("nested/b.bin")).unwrap(),
            vec![7u8; 4096]
        );

        let output = run_osb(&["-a", "delete", "-s", &remote_root], config_dir.path());
        assert!(output.status.success());

        let output = run_osb(&["-a", "list", "-s", &remote_root, "--json"], config_dir.path());
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["total_objects"], 0);
    }

    #[test]
    fn test_upload_json_summary() {
        let Some(config) = get_test_config() else {
            eprintln!("Skipping: S3 test config not available");
            return;
        };
        let prefix = format!("json-{}", uuid_suffix());
        let config_dir = setup_config(&config, &prefix);
        let (_tree_dir, root) = sample_tree();

        let output = run_osb(
            &["-a", "upload", "-s", root.to_str().unwrap(), "--json", "-n", "2"],
            config_dir.path(),
        );
        assert!(output.status.success());
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["action"], "upload");
        assert_eq!(json["succeeded"], 3);
        assert_eq!(json["failed"], 0);

        let remote_root = format!("{prefix}{}", root.display());
        let _ = run_osb(&["-a", "delete", "-s", &remote_root], config_dir.path());
    }

    #[test]
    fn test_missing_bucket_is_fatal() {
        let Some(config) = get_test_config() else {
            eprintln!("Skipping: S3 test config not available");
            return;
        };
        let config_dir = setup_config(&config, "");
        let bucket = format!("missing-{}", uuid_suffix());

        let output = run_osb(&["-a", "list", "-b", &bucket], config_dir.path());
        assert!(!output.status.success());
        assert_ne!(output.status.code(), Some(1));
    }
}
