//! Error taxonomy for CNAE access.

use crate::types::Level;
use serde::{Deserialize, Serialize};

/// Result type for CNAE operations.
pub type CnaeResult<T> = Result<T, CnaeError>;

/// Failure kinds surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    InvalidInput,
    InvalidCode,
    NotFound,
    UpstreamUnavailable,
    UpstreamMalformed,
    Cancelled,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidInput => "invalid-input",
            ErrorKind::InvalidCode => "invalid-code",
            ErrorKind::NotFound => "not-found",
            ErrorKind::UpstreamUnavailable => "upstream-unavailable",
            ErrorKind::UpstreamMalformed => "upstream-malformed",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Errors produced by the CNAE access layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CnaeError {
    /// Caller supplied unusable input (e.g. an empty search query).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Code does not have the shape required by its level.
    #[error("Invalid {level} code: {code:?}")]
    InvalidCode { level: Level, code: String },

    /// Well-formed code with no matching entity.
    #[error("{level} {code:?} not found")]
    NotFound { level: Level, code: String },

    /// Network failure, 5xx or timeout after retries.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Upstream answered with something the normalizer cannot interpret.
    #[error("Upstream returned a malformed response: {0}")]
    UpstreamMalformed(String),

    /// Caller aborted the operation.
    #[error("Operation cancelled")]
    Cancelled,
}

impl CnaeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::InvalidCode { .. } => ErrorKind::InvalidCode,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            Self::UpstreamMalformed(_) => ErrorKind::UpstreamMalformed,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Only upstream availability failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable(_))
    }

    pub fn not_found(level: Level, code: impl Into<String>) -> Self {
        Self::NotFound {
            level,
            code: code.into(),
        }
    }

    pub fn invalid_code(level: Level, code: impl Into<String>) -> Self {
        Self::InvalidCode {
            level,
            code: code.into(),
        }
    }
}
