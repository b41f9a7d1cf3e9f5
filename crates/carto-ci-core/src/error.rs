//! Error types for carto-ci.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No credentialed client exists for a required host.
    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("build failed: {0}")]
    BuildFailed(String),

    /// Release creation or artifact upload failed.
    #[error("publish failed: {0}")]
    PublishFailed(String),

    #[error("status report failed: {0}")]
    StatusFailed(String),

    #[error("malformed event: {0}")]
    MalformedEvent(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
