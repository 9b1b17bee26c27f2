//! Test Helper Utilities
//!
//! Shared utilities for testing specview-web

#![allow(dead_code)]

pub mod audio_generator;
pub mod mp3_generator;
pub mod multipart;

pub use audio_generator::{generate_test_wav, wav_bytes, AudioConfig};
pub use mp3_generator::{mp3_tone_bytes, TONE_FRAMES};
pub use multipart::{multipart_body, upload_request, BOUNDARY};

use std::path::{Path, PathBuf};

use axum::{body::Body, http::Response, Router};
use http_body_util::BodyExt;
use specview_common::config::ServiceConfig;
use specview_web::AppState;
use tempfile::TempDir;

/// Path of a file under `tests/fixtures`
pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Router plus the temporary static root backing it
pub struct TestApp {
    pub dir: TempDir,
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn uploads_dir(&self) -> &Path {
        self.state.storage.uploads.root()
    }

    pub fn results_dir(&self) -> &Path {
        self.state.storage.results.root()
    }
}

/// Configuration rooted in `static_root`, with a small image for speed
pub fn test_config(static_root: &Path) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.static_root = static_root.to_path_buf();
    config.spectrogram.width = 400;
    config.spectrogram.height = 240;
    config
}

pub fn create_test_app() -> TestApp {
    create_test_app_with(|_| {})
}

/// Build an app after letting the caller adjust the configuration
pub fn create_test_app_with(adjust: impl FnOnce(&mut ServiceConfig)) -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut config = test_config(dir.path());
    adjust(&mut config);

    let state = AppState::new(config);
    state
        .storage
        .ensure_exists()
        .expect("Failed to create storage directories");
    let router = specview_web::build_router(state.clone());

    TestApp { dir, state, router }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("Body is not JSON")
}

/// Names of the regular files in `dir`
pub fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("Failed to read dir")
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
