//! Common error types for specview

use thiserror::Error;

use crate::filename::FilenameRejection;

/// Common result type for specview operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the specview crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested file not present in a storage area
    #[error("Not found: {0}")]
    NotFound(String),

    /// Filename refused by a [`crate::FilenamePolicy`]
    #[error("Invalid filename: {0}")]
    InvalidFilename(#[from] FilenameRejection),
}
