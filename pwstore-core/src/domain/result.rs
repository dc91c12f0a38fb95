//! Result and error types for the core library

use std::path::PathBuf;

use thiserror::Error;

/// Core library error type
///
/// Messages never include record contents or the passphrase. A malformed
/// line is reported by number only, since the line itself holds a password.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed record on line {line}: expected account, username and password")]
    MalformedRecord { line: usize },

    #[error("{operation} failed (exit status {status}): {diagnostics}")]
    BackendFailure {
        operation: &'static str,
        status: String,
        diagnostics: String,
    },

    #[error("Encryption reported success but produced no output at {}", .0.display())]
    StagingFileMissing(PathBuf),

    #[error("{count} records match; narrow the filter with a username")]
    AmbiguousMatch { count: usize },

    #[error("Database must be loaded before it can be saved")]
    NotLoaded,

    #[error("Database is in use by another process: {}", .0.display())]
    Locked(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a backend failure from a process exit status and its stderr
    pub fn backend(
        operation: &'static str,
        status: impl ToString,
        diagnostics: impl Into<String>,
    ) -> Self {
        Self::BackendFailure {
            operation,
            status: status.to_string(),
            diagnostics: diagnostics.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the failure leaves the database usable (the caller may report
    /// it and carry on) rather than aborting the run
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::AmbiguousMatch { .. })
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
