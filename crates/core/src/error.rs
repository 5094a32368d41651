//! Error types for osb-core
//!
//! `Error` covers failures that abort a run before or instead of any transfer.
//! Per-file failures during a run are reported as [`TransferError`] values
//! inside each task's outcome and never abort sibling tasks.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result type alias for osb-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for osb-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Profile not found in the configuration file
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Namespace or bucket could not be resolved; nothing has been transferred
    #[error("Error connecting to object storage: {0}")]
    Connectivity(String),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network error (retryable)
    #[error("Network error: {0}")]
    Network(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) => 2,                          // UsageError
            Error::Config(_) | Error::TomlParse(_) => 2,         // UsageError
            Error::InvalidUrl(_) => 2,                           // UsageError
            Error::Network(_) | Error::Connectivity(_) => 3,     // NetworkError
            Error::Auth(_) => 4,                                 // AuthError
            Error::NotFound(_) | Error::ProfileNotFound(_) => 5, // NotFound
            _ => 1,                                              // GeneralError
        }
    }
}

/// Category of a single failed transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferErrorKind {
    /// Local file could not be read or written due to permissions
    PermissionDenied,
    /// Local file vanished between enumeration and transfer
    NotFound,
    /// Any other local I/O failure
    OsFailure,
    /// A remote call made while uploading failed
    Remote,
    /// The object could not be fetched for download
    RemoteFetch,
    /// The object could not be deleted
    Delete,
    /// The object key cannot be mapped to a safe local path
    InvalidKey,
}

impl TransferErrorKind {
    /// Short human-readable reason used in per-file log lines
    pub const fn reason(self) -> &'static str {
        match self {
            Self::PermissionDenied => "Unable to read local file",
            Self::NotFound => "File Not Found",
            Self::OsFailure => "OS error",
            Self::Remote => "Remote call failed",
            Self::RemoteFetch => "Unable to fetch object",
            Self::Delete => "Unable to delete object",
            Self::InvalidKey => "Object key escapes destination",
        }
    }
}

impl fmt::Display for TransferErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// A tagged per-file failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferError {
    pub kind: TransferErrorKind,
    pub detail: String,
}

impl TransferError {
    pub fn new(kind: TransferErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Classify a local I/O error
    pub fn from_io(err: &std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::PermissionDenied => TransferErrorKind::PermissionDenied,
            std::io::ErrorKind::NotFound => TransferErrorKind::NotFound,
            _ => TransferErrorKind::OsFailure,
        };
        Self::new(kind, err.to_string())
    }

    /// Classify an error returned by the object store while uploading
    pub fn remote(err: &Error) -> Self {
        match err {
            Error::Io(io) => Self::from_io(io),
            other => Self::new(TransferErrorKind::Remote, other.to_string()),
        }
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.kind, self.detail)
    }
}

impl std::error::Error for TransferError {}
