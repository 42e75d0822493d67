//! Error taxonomy for remote directory operations

use thiserror::Error;

/// Result type for directory adapter calls
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors surfaced by a remote directory adapter.
///
/// Adapters map their transport errors into this taxonomy so the
/// reconciliation core only ever branches on these classes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// The addressed entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The relationship or entity already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The request was rejected as malformed, e.g. an invalid object reference
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Credentials were rejected or lack permission
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The directory throttled the caller
    #[error("Throttled by directory (retry after {retry_after_secs:?}s)")]
    Throttled { retry_after_secs: Option<u64> },

    /// Network failure or server-side error
    #[error("Transient failure: {0}")]
    Transient(String),

    /// The credential reference or provider block cannot be used
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested capability is not implemented
    #[error("Not supported: {0}")]
    Unsupported(String),

    /// Any other error response
    #[error("Directory error {status} {code}: {message}")]
    Remote {
        status: u16,
        code: String,
        message: String,
    },
}

impl DirectoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DirectoryError::NotFound(_))
    }

    /// Errors that retrying with the same spec cannot fix
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DirectoryError::Configuration(_) | DirectoryError::Unsupported(_)
        )
    }

    /// Responses tolerated when adding a relationship edge: only an edge
    /// that is already present. Rejected references are real failures.
    pub fn is_tolerated_on_add(&self) -> bool {
        matches!(self, DirectoryError::AlreadyExists(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(DirectoryError::NotFound("app".into()).is_not_found());
        assert!(DirectoryError::Unsupported("wi".into()).is_configuration());
        assert!(DirectoryError::AlreadyExists("u1".into()).is_tolerated_on_add());
        assert!(!DirectoryError::Transient("503".into()).is_tolerated_on_add());
        assert!(!DirectoryError::BadRequest("Invalid object identifier 'x'.".into())
            .is_tolerated_on_add());
    }
}
