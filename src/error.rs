//! Error types for shadowsync.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=host, 3=not_found, 4=validation, etc.)
//! - Retryability flags for scripted callers
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::http::HttpFailure;

/// Result type alias for shadowsync operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Host (exit 2)
    TransportError,
    HostRejected,
    RateLimited,

    // Not Found (exit 3)
    FileNotFound,

    // Validation (exit 4)
    InvalidArgument,

    // Protocol (exit 5)
    StructuralFailure,
    NonFastForward,

    // Sync (exit 6)
    PartialSync,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::TransportError => "TRANSPORT_ERROR",
            Self::HostRejected => "HOST_REJECTED",
            Self::RateLimited => "RATE_LIMITED",
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::StructuralFailure => "STRUCTURAL_FAILURE",
            Self::NonFastForward => "NON_FAST_FORWARD",
            Self::PartialSync => "PARTIAL_SYNC",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::TransportError | Self::HostRejected | Self::RateLimited => 2,
            Self::FileNotFound => 3,
            Self::InvalidArgument => 4,
            Self::StructuralFailure | Self::NonFastForward => 5,
            Self::PartialSync => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether re-running the same command later may succeed.
    ///
    /// True for transport hiccups, rate limits and partial runs (the
    /// engine is idempotent, so a re-run only records what is missing).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransportError | Self::RateLimited | Self::PartialSync
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in shadowsync operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] HttpFailure),

    #[error("Structural failure: {0}")]
    Structural(String),

    #[error("Ref {reference} rejected a non-fast-forward update to {sha}")]
    NonFastForward { reference: String, sha: String },

    #[error("Sync incomplete: {} of {total} repositories failed", .failed.len())]
    PartialSync { failed: Vec<String>, total: usize },

    #[error("File not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Http(failure) => match failure.status() {
                None => ErrorCode::TransportError,
                Some(429) => ErrorCode::RateLimited,
                Some(_) => ErrorCode::HostRejected,
            },
            Self::Structural(_) => ErrorCode::StructuralFailure,
            Self::NonFastForward { .. } => ErrorCode::NonFastForward,
            Self::PartialSync { .. } => ErrorCode::PartialSync,
            Self::FileNotFound { .. } => ErrorCode::FileNotFound,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Http(failure) => match failure.status() {
                Some(401 | 403) => Some(
                    "Check the token / app password and its scopes. \
                     GitHub needs `repo`, Bitbucket needs `repository:read`."
                        .to_string(),
                ),
                Some(404) => Some(
                    "Check the workspace, organization, project and owner names.".to_string(),
                ),
                Some(429) => Some("Rate limited by the host; wait and re-run.".to_string()),
                _ => None,
            },

            Self::NonFastForward { reference, .. } => Some(format!(
                "{reference} moved while syncing. Something else is writing to the \
                 shadow repository; investigate before re-running."
            )),

            Self::PartialSync { failed, .. } => Some(format!(
                "Re-run to retry {}; already recorded commits are skipped.",
                failed.join(", ")
            )),

            Self::FileNotFound { path } => Some(format!(
                "Create it with `shadowsync pull <source> --output {}`",
                path.display()
            )),

            Self::Config(_) => Some(format!(
                "Set the value with a flag, an environment variable, or in {}",
                crate::config::config_path().map_or_else(
                    || "~/.shadowsync/config.json".to_string(),
                    |p| p.display().to_string()
                )
            )),

            Self::Structural(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::InvalidArgument(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
