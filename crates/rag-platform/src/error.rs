//! Platform error types.

use thiserror::Error;

/// Errors raised by upstream platform calls and tenant record access.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Resource or endpoint does not exist (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Plan or scope does not allow this resource (HTTP 403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Credential rejected (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Request timed out")]
    Timeout,

    /// Any other transport or status failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Tenant record store failure
    #[error("Tenant directory error: {0}")]
    Directory(String),
}

impl PlatformError {
    /// True for errors that mean "this store has no access to the feature".
    pub fn is_feature_unavailable(&self) -> bool {
        matches!(self, PlatformError::NotFound(_) | PlatformError::Forbidden(_))
    }
}

impl From<reqwest::Error> for PlatformError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PlatformError::Timeout
        } else if e.is_decode() {
            PlatformError::Decode(e.to_string())
        } else {
            PlatformError::Http(e.to_string())
        }
    }
}
