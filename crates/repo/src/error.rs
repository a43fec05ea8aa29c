use thiserror::Error;

/// Errors surfaced by the remote repository adapter.
#[derive(Debug, Error)]
pub enum RepoError {
    /// The owner's credential was rejected, or a session could not be
    /// created.
    #[error("authentication with the remote repository failed")]
    AuthenticationFailed,

    /// The requested record or blob does not exist. Remote "record not
    /// found" responses are normalized to this variant regardless of their
    /// exact wording.
    #[error("not found: {0}")]
    NotFound(String),

    /// An HTTP-level transport error occurred.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A response body could not be parsed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Any other failure reported by the remote repository.
    #[error("remote repository error: {0}")]
    Remote(String),
}

impl RepoError {
    /// Whether this error means the addressed entity does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
