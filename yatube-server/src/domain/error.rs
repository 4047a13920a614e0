use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum DomainError {
    #[error("validation failed for '{field}': {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },

    #[error("resource not found: {0}")]
    NotFound(String),

    /// The requester's account is gone, though their token still verifies.
    #[error("author does not exist: {0}")]
    UnknownAuthor(i64),

    #[error("resource already exists: {0}")]
    AlreadyExists(String),

    #[error("unexpected domain error: {0}")]
    Unexpected(String),
}
