//! # specview common library
//!
//! Shared building blocks for the specview service:
//! - Configuration loading (TOML file with compiled defaults)
//! - Filename validation and sanitization
//! - Filesystem storage areas for uploads and rendered results
//! - Common error type

pub mod config;
pub mod error;
pub mod filename;
pub mod storage;

pub use error::{Error, Result};
pub use filename::{AudioFormat, FilenamePolicy, FilenameRejection, SanitizedFilename};
pub use storage::{Storage, StorageArea, UploadedAsset};
