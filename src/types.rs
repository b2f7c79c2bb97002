//! Error taxonomy shared across the service
//!
//! Every failure surfaces with a stable kind (machine-readable code) and a
//! human-readable message. `NotificationFailed` is the one non-fatal kind:
//! account mutations commit even when the credential email cannot be sent.

use hyper::StatusCode;
use thiserror::Error;

/// Service-wide error type
#[derive(Debug, Error)]
pub enum ScribeError {
    /// A referenced User, College, or portfolio item does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// A supplied foreign id resolves to the wrong role, an unknown section
    /// tag, or nothing at all
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// The authorization predicate rejected the actor
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// Duplicate email on account creation
    #[error("conflict: {0}")]
    Conflict(String),

    /// No Faculty available to take a new Student
    #[error("no capacity: {0}")]
    NoCapacity(String),

    /// Credential/reset email could not be delivered (non-fatal)
    #[error("notification failed: {0}")]
    NotificationFailed(String),

    /// Underlying store failure
    #[error("database error: {0}")]
    Database(String),

    /// Token or password-hash failure
    #[error("authentication error: {0}")]
    Auth(String),

    /// Invalid or missing configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl ScribeError {
    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            ScribeError::NotFound(_) => "NOT_FOUND",
            ScribeError::InvalidReference(_) => "INVALID_REFERENCE",
            ScribeError::Unauthorized(_) => "UNAUTHORIZED",
            ScribeError::Conflict(_) => "CONFLICT",
            ScribeError::NoCapacity(_) => "NO_CAPACITY",
            ScribeError::NotificationFailed(_) => "NOTIFICATION_FAILED",
            ScribeError::Database(_) => "DB_ERROR",
            ScribeError::Auth(_) => "AUTH_ERROR",
            ScribeError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// HTTP status the kind maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            ScribeError::NotFound(_) => StatusCode::NOT_FOUND,
            ScribeError::InvalidReference(_) => StatusCode::BAD_REQUEST,
            ScribeError::Unauthorized(_) => StatusCode::FORBIDDEN,
            ScribeError::Conflict(_) | ScribeError::NoCapacity(_) => StatusCode::CONFLICT,
            ScribeError::NotificationFailed(_)
            | ScribeError::Database(_)
            | ScribeError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ScribeError::Auth(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, ScribeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ScribeError::NotFound("user".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ScribeError::Unauthorized("review".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ScribeError::InvalidReference("section".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ScribeError::Conflict("email".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ScribeError::NoCapacity("x".into()).code(), "NO_CAPACITY");
        assert_eq!(
            ScribeError::NotificationFailed("x".into()).code(),
            "NOTIFICATION_FAILED"
        );
    }
}
