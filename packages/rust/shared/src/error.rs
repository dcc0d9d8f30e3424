//! Error types for SiteSync.
//!
//! Library crates use [`SiteSyncError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type for all SiteSync operations.
#[derive(Debug, thiserror::Error)]
pub enum SiteSyncError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level HTTP failure (connect, timeout, body read).
    #[error("network error: {0}")]
    Network(String),

    /// A remote API answered with an unexpected status code.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// A remote response could not be decoded into its typed form.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The crawl collaborator failed or returned an unusable run.
    #[error("crawl error: {0}")]
    Crawl(String),

    /// Remote project creation did not report success.
    #[error("failed to create project (status {status})")]
    Provision { status: u16 },

    /// A page-status listing could not be retrieved while waiting for indexing.
    #[error("failed to retrieve page listing {page} (status {status})")]
    Fetch { page: u32, status: u16 },

    /// Indexing did not settle within the configured bound.
    #[error("indexing did not finish after {polls} polls ({elapsed:?})")]
    IndexingTimeout { polls: u32, elapsed: Duration },

    /// Pages reached the `failed` index status under the abort policy.
    #[error("indexing failed for {} page(s): {}", page_ids.len(), page_ids.join(", "))]
    IndexingFailed { page_ids: Vec<String> },

    /// Conversation creation did not report success.
    #[error("failed to create conversation (status {status})")]
    Conversation { status: u16 },

    /// Sending the prompt did not report success.
    #[error("failed to send prompt (status {status})")]
    Query { status: u16 },

    /// The operator aborted the run.
    #[error("operation cancelled")]
    Cancelled,

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error (bad URL, empty prompt, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SiteSyncError>;

impl SiteSyncError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Remote status code carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. }
            | Self::Provision { status }
            | Self::Fetch { status, .. }
            | Self::Conversation { status }
            | Self::Query { status } => Some(*status),
            _ => None,
        }
    }
}
