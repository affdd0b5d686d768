//! Application-wide error types.
//!
//! Every failure surfaced by the accounting core collapses into one of these
//! kinds. Module errors in `contab-core` convert into `AppError` so callers only
//! have to render a kind and a message.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// Malformed or missing data (unbalanced entry, zero amount, date outside period).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Duplicate code/description, deleting a used node, reopening an open period.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unknown id, or an id that belongs to another organization or period.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Inflation calculation hit a gap in the index table.
    #[error("Missing inflation index: {0}")]
    MissingIndex(String),

    /// Mutation against a finalized period or a confirmed date.
    #[error("Frozen: {0}")]
    Frozen(String),

    /// Record was modified by someone else since it was read.
    #[error("Version conflict: {0}")]
    VersionConflict(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code a transport layer should use for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::NotFound(_) => 404,
            Self::Conflict(_) | Self::VersionConflict(_) => 409,
            Self::MissingIndex(_) | Self::Frozen(_) => 422,
            Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Conflict(_) => "CONFLICT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::MissingIndex(_) => "MISSING_INDEX",
            Self::Frozen(_) => "FROZEN",
            Self::VersionConflict(_) => "VERSION_CONFLICT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if the caller may retry the operation after re-reading.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionConflict(_))
    }

    /// Returns the human readable message without the kind prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput(msg)
            | Self::Conflict(msg)
            | Self::NotFound(msg)
            | Self::MissingIndex(msg)
            | Self::Frozen(msg)
            | Self::VersionConflict(msg)
            | Self::Internal(msg) => msg,
        }
    }
}
