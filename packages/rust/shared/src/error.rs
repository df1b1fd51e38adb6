//! Error types for MindCite.
//!
//! Library crates use [`MindCiteError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics. Every variant
//! maps to a stable status class via [`MindCiteError::status_class`], which is
//! what external callers see next to the human-readable message.

use std::path::PathBuf;

/// Top-level error type for all MindCite operations.
#[derive(Debug, thiserror::Error)]
pub enum MindCiteError {
    /// Missing or malformed required input to an operation.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Required credential or configuration for the generative service is absent.
    #[error("missing configuration: {message}")]
    MissingConfiguration { message: String },

    /// Document bytes could not be parsed as a valid document.
    #[error("extraction failed: {message}")]
    Extraction { message: String },

    /// Document parsed but yielded no extractable text.
    #[error("document parsed but contains no extractable text")]
    EmptyExtraction,

    /// The generative service responded without any usable output text.
    #[error("generative service returned an empty response")]
    UpstreamEmpty,

    /// Generative output could not be coerced to the expected JSON shape
    /// by either the strict or the lenient rule.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Network/HTTP error talking to the generative service.
    #[error("network error: {0}")]
    Network(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Anything uncaught.
    #[error("unexpected failure: {0}")]
    Unknown(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MindCiteError>;

impl MindCiteError {
    /// Create an invalid-request error from any displayable message.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: msg.into(),
        }
    }

    /// Create a missing-configuration error from any displayable message.
    pub fn missing_configuration(msg: impl Into<String>) -> Self {
        Self::MissingConfiguration {
            message: msg.into(),
        }
    }

    /// Create an extraction error from any displayable message.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
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

    /// Stable status class label reported to external callers.
    pub fn status_class(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::MissingConfiguration { .. } => "missing_configuration",
            Self::Extraction { .. } => "extraction_failure",
            Self::EmptyExtraction => "empty_extraction",
            Self::UpstreamEmpty => "upstream_empty_response",
            Self::Parse { .. } => "parse_error",
            Self::Network(_) | Self::Io { .. } | Self::Unknown(_) => "unknown_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = MindCiteError::missing_configuration("OPENAI_API_KEY not set");
        assert_eq!(
            err.to_string(),
            "missing configuration: OPENAI_API_KEY not set"
        );

        let err = MindCiteError::invalid_request("node is missing an id");
        assert!(err.to_string().contains("missing an id"));
    }

    #[test]
    fn status_classes_are_stable() {
        assert_eq!(
            MindCiteError::invalid_request("x").status_class(),
            "invalid_request"
        );
        assert_eq!(
            MindCiteError::EmptyExtraction.status_class(),
            "empty_extraction"
        );
        assert_eq!(
            MindCiteError::UpstreamEmpty.status_class(),
            "upstream_empty_response"
        );
        assert_eq!(MindCiteError::parse("x").status_class(), "parse_error");
        assert_eq!(
            MindCiteError::Network("timeout".into()).status_class(),
            "unknown_failure"
        );
        assert_eq!(
            MindCiteError::Unknown("boom".into()).status_class(),
            "unknown_failure"
        );
    }
}
