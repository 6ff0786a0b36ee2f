//! Error types for b2u-core
//!
//! Provides a unified error type that can be converted to an exit code.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for b2u-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for b2u-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid invocation parameters
    #[error("Usage error: {0}")]
    Usage(String),

    /// Settings or credentials file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Archive path does not resolve to an existing regular file
    #[error("Archive not found: {}", .0.display())]
    ArchiveNotFound(PathBuf),

    /// Archive exists but cannot be read
    #[error("Archive not readable: {}: {reason}", path.display())]
    ArchiveUnreadable { path: PathBuf, reason: String },

    /// Container runtime executable cannot be reached
    #[error("Container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// A delegated operation exited unsuccessfully
    #[error("{operation} failed:\n{detail}")]
    Delegated {
        operation: &'static str,
        detail: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Credentials file parsing error
    #[error("Credentials file error: {0}")]
    Dotenv(#[from] dotenvy::Error),
}

impl Error {
    /// Get the exit code for this error
    ///
    /// Every failure category exits with 1; callers distinguish categories
    /// through the message on stderr.
    pub const fn exit_code(&self) -> i32 {
        1
    }
}
