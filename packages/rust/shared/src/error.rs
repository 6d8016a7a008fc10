//! Error types for SeoPress.
//!
//! Library crates use [`SeoPressError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all SeoPress operations.
#[derive(Debug, thiserror::Error)]
pub enum SeoPressError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport failure talking to a remote endpoint (connect, timeout, body read).
    #[error("network error: {0}")]
    Network(String),

    /// The text-generation endpoint answered with a non-success status.
    #[error("generation endpoint returned HTTP {status}: {message}")]
    Generation { status: u16, message: String },

    /// Keyword table read/write error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (duplicate keyword, bad input, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Malformed table row, front matter, or response body.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A compare-and-swap status transition found an unexpected status.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The keyword table is locked by another writer.
    #[error("keyword store is busy: {0}")]
    Busy(String),

    /// An assembly stage failed; the whole document is discarded.
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: String,
        #[source]
        source: Box<SeoPressError>,
    },

    /// A controller run failed after the keyword was claimed.
    #[error("pipeline failed for '{keyword}': {source}")]
    Pipeline {
        keyword: String,
        #[source]
        source: Box<SeoPressError>,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SeoPressError>;

impl SeoPressError {
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

    /// Tag an error with the assembly stage it came from.
    pub fn in_stage(self, stage: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, unwrapping stage and pipeline context.
    pub fn root(&self) -> &SeoPressError {
        match self {
            Self::Stage { source, .. } | Self::Pipeline { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error came from another writer holding the table.
    pub fn is_contention(&self) -> bool {
        matches!(self.root(), Self::Conflict(_) | Self::Busy(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = SeoPressError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = SeoPressError::Generation {
            status: 500,
            message: "upstream exploded".into(),
        };
        assert!(err.to_string().contains("HTTP 500"));
    }

    #[test]
    fn root_unwraps_nested_context() {
        let err = SeoPressError::Generation {
            status: 502,
            message: "bad gateway".into(),
        }
        .in_stage("sections");
        let err = SeoPressError::Pipeline {
            keyword: "office interior design".into(),
            source: Box::new(err),
        };

        assert!(matches!(err.root(), SeoPressError::Generation { status: 502, .. }));
        assert!(err.to_string().contains("office interior design"));
        assert!(!err.is_contention());
    }

    #[test]
    fn contention_detection() {
        assert!(SeoPressError::Busy("locked".into()).is_contention());
        assert!(SeoPressError::Conflict("status changed".into()).is_contention());
        assert!(!SeoPressError::validation("nope").is_contention());
    }
}
