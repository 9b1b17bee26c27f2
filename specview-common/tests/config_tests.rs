//! Configuration loading tests
//!
//! Covers:
//! - Partial TOML files fall back to defaults field by field
//! - Invalid values are rejected
//! - Config file resolution priority (CLI argument, environment variable)
//! - Missing files degrade to compiled defaults
//!
//! Tests that manipulate SPECVIEW_CONFIG are marked #[serial] so they do not
//! race each other.

use serial_test::serial;
use specview_common::config::{ServiceConfig, CONFIG_ENV_VAR};
use specview_common::Error;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_partial_toml_keeps_defaults() {
    let config = ServiceConfig::from_toml_str(
        r#"
        port = 8080

        [spectrogram]
        n_fft = 1024
        "#,
    )
    .unwrap();

    assert_eq!(config.port, 8080);
    assert_eq!(config.bind_address, "127.0.0.1");
    assert_eq!(config.spectrogram.n_fft, 1024);
    assert_eq!(config.spectrogram.hop_length, 512);
    assert_eq!(config.spectrogram.top_db, Some(80.0));
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.allowed_extensions, vec!["wav", "mp3"]);
}

#[test]
fn test_full_toml() {
    let config = ServiceConfig::from_toml_str(
        r#"
        bind_address = "0.0.0.0"
        port = 9000
        static_root = "/srv/specview"
        allowed_extensions = ["wav"]
        max_upload_bytes = 1024

        [spectrogram]
        analysis_sample_rate = 0
        n_fft = 512
        hop_length = 128
        top_db = 60.0
        max_duration_secs = 30.0
        width = 800
        height = 400
        label_font = "/fonts/sans.ttf"

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    assert_eq!(config.listen_address(), "0.0.0.0:9000");
    assert_eq!(config.static_root, PathBuf::from("/srv/specview"));
    assert_eq!(config.max_upload_bytes, 1024);
    assert_eq!(config.spectrogram.analysis_sample_rate, 0);
    assert_eq!(config.spectrogram.width, 800);
    assert_eq!(config.spectrogram.max_duration_secs, 30.0);
    assert_eq!(
        config.spectrogram.label_font,
        Some(PathBuf::from("/fonts/sans.ttf"))
    );
    assert_eq!(config.logging.level, "debug");
    assert!(!config.upload_policy().has_allowed_extension("a.mp3"));
}

#[test]
fn test_invalid_values_rejected() {
    let cases = [
        "[spectrogram]\nn_fft = 0",
        "[spectrogram]\nn_fft = 2",
        "[spectrogram]\nhop_length = 0",
        "[spectrogram]\ntop_db = -5.0",
        "[spectrogram]\nwidth = 10",
        "[spectrogram]\nmax_duration_secs = 0.0",
        "[spectrogram]\nmax_duration_secs = -1.0",
        "allowed_extensions = []",
        "allowed_extensions = [\"txt\"]",
        "allowed_extensions = [\"wav\", \"png\"]",
        "max_upload_bytes = 0",
    ];
    for content in cases {
        let result = ServiceConfig::from_toml_str(content);
        assert!(
            matches!(result, Err(Error::Config(_))),
            "expected config error for {content:?}, got {result:?}"
        );
    }
}

#[test]
fn test_malformed_toml_rejected() {
    let result = ServiceConfig::from_toml_str("port = \"not a number\"");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_cli_path_takes_priority_over_env() {
    let dir = TempDir::new().unwrap();
    let cli_file = dir.path().join("cli.toml");
    let env_file = dir.path().join("env.toml");
    std::fs::write(&cli_file, "port = 1111").unwrap();
    std::fs::write(&env_file, "port = 2222").unwrap();

    env::set_var(CONFIG_ENV_VAR, &env_file);
    let (config, source) = ServiceConfig::load(Some(&cli_file)).unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(config.port, 1111);
    assert_eq!(source, Some(cli_file));
}

#[test]
#[serial]
fn test_env_path_used_without_cli() {
    let dir = TempDir::new().unwrap();
    let env_file = dir.path().join("env.toml");
    std::fs::write(&env_file, "port = 2222").unwrap();

    env::set_var(CONFIG_ENV_VAR, &env_file);
    let (config, source) = ServiceConfig::load(None).unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(config.port, 2222);
    assert_eq!(source, Some(env_file));
}

#[test]
#[serial]
fn test_missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist.toml");

    let (config, source) = ServiceConfig::load(Some(&missing)).unwrap();

    assert_eq!(config, ServiceConfig::default());
    assert!(source.is_none());
}

#[test]
#[serial]
fn test_invalid_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let bad = dir.path().join("bad.toml");
    std::fs::write(&bad, "[spectrogram]\nhop_length = 0").unwrap();

    let result = ServiceConfig::load(Some(&bad));
    assert!(matches!(result, Err(Error::Config(_))));
}
