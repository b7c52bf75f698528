//! Shared error type across tagscope crates.

use thiserror::Error;

/// Stable error codes, usable in logs and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bucket boundaries could not be generated or validated.
    InvalidBucketSpec,
    /// Configuration failed to parse or validate.
    InvalidConfig,
    /// Anything else (I/O while loading config, etc).
    Internal,
}

impl ErrorKind {
    /// String representation used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidBucketSpec => "INVALID_BUCKET_SPEC",
            ErrorKind::InvalidConfig => "INVALID_CONFIG",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, TagScopeError>;

/// Unified error type used by core and backends.
///
/// Only construction paths fail. Emitting a metric never returns an error.
#[derive(Debug, Error)]
pub enum TagScopeError {
    #[error("invalid bucket spec: {0}")]
    InvalidBucketSpec(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl TagScopeError {
    /// Map the error to its stable code.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TagScopeError::InvalidBucketSpec(_) => ErrorKind::InvalidBucketSpec,
            TagScopeError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            TagScopeError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn bucket_spec(msg: impl Into<String>) -> Self {
        TagScopeError::InvalidBucketSpec(msg.into())
    }
}
