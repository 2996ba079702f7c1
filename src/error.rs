//! Error taxonomy — spec §7.
//!
//! One flat `thiserror` enum, grounded on the teacher's `IndexError`
//! (single enum, `recovery_suggestions()` helper) but with the named
//! kinds spec §7 requires instead of the teacher's storage-era variants.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidParameters,
    NotReady,
    NotFound,
    OutOfRange,
    Cancelled,
    Timeout,
    InternalPanic,
    ExternalFailure,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParameters => "invalid_parameters",
            Self::NotReady => "not_ready",
            Self::NotFound => "not_found",
            Self::OutOfRange => "out_of_range",
            Self::Cancelled => "cancelled",
            Self::Timeout => "timeout",
            Self::InternalPanic => "internal_panic",
            Self::ExternalFailure => "external_failure",
        }
    }
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("invalid parameters: {reason}")]
    InvalidParameters { reason: String },

    #[error("indexing in progress")]
    NotReady { index_stats_hint: bool },

    #[error("{what} not found: {query}")]
    NotFound { what: &'static str, query: String },

    #[error("'{value}' is not a valid {field}; expected one of: {valid}")]
    OutOfRange {
        field: &'static str,
        value: String,
        valid: String,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("timed out waiting for {what} after {elapsed_ms}ms")]
    Timeout { what: &'static str, elapsed_ms: u64 },

    #[error("internal error recovered from panic: {message}")]
    InternalPanic { message: String },

    #[error("external operation '{operation}' failed: {reason}")]
    ExternalFailure { operation: String, reason: String },

    #[error("failed to read '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {language} file '{path}': {reason}")]
    ParseFailure {
        path: PathBuf,
        language: String,
        reason: String,
    },
}

impl ToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameters { .. } => ErrorKind::InvalidParameters,
            Self::NotReady { .. } => ErrorKind::NotReady,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::InternalPanic { .. } => ErrorKind::InternalPanic,
            Self::ExternalFailure { .. } => ErrorKind::ExternalFailure,
            Self::FileRead { .. } => ErrorKind::ExternalFailure,
            Self::ParseFailure { .. } => ErrorKind::ExternalFailure,
        }
    }

    /// One actionable suggestion per kind, mirrors the teacher's
    /// `recovery_suggestions()` but returns a single string — every call
    /// site in this crate wants at most one.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotReady { .. } => {
                Some("wait for indexing to complete or call index_stats with mode=progress")
            }
            Self::NotFound { .. } => Some("use search to list known symbols by name"),
            Self::OutOfRange { .. } => Some("retry with one of the listed valid values"),
            Self::Timeout { .. } => Some("retry after indexing finishes, or raise the timeout"),
            Self::InternalPanic { .. } => Some("this is a bug; the server remains usable"),
            _ => None,
        }
    }
}

/// Opaque ID decode failures map to `NotFound`, not `InvalidParameters`
/// (spec §7) — clients only ever hold ids previously issued by this
/// server, so an undecodable token means "that symbol isn't here",
/// not "you sent a malformed request".
pub fn opaque_id_not_found(token: &str) -> ToolError {
    ToolError::NotFound {
        what: "symbol",
        query: token.to_string(),
    }
}

pub type ToolResult<T> = Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let err = ToolError::NotReady {
            index_stats_hint: true,
        };
        assert_eq!(err.kind(), ErrorKind::NotReady);
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn opaque_id_failure_is_not_found_not_invalid() {
        let err = opaque_id_not_found("!!!");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
