use thiserror::Error;

use strand_core::{KeyError, OwnerId};
use strand_repo::RepoError;

/// Errors surfaced by the mapping engine.
///
/// Cache failures never appear here: the cache layer swallows them and the
/// engine falls back to the authoritative store. Authoritative-store errors
/// are never suppressed.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The mapping key failed validation. Never retried.
    #[error("invalid key: {0}")]
    InvalidKey(#[from] KeyError),

    /// The owner's credential was rejected by the remote repository.
    #[error("authentication with the remote repository failed")]
    AuthenticationFailed,

    /// No mapping record (or blob) exists for the key.
    #[error("no blob mapped to key {0:?}")]
    BlobNotFound(String),

    /// The record exists but has no such archived version.
    #[error("key {key:?} has no version {version:?}")]
    VersionNotFound { key: String, version: String },

    /// A public read was requested for an owner that has not provisioned a
    /// read delegation.
    #[error("owner {0} has no read delegation for public access")]
    NoReadDelegation(OwnerId),

    /// Any unclassified remote repository failure.
    #[error("remote repository error: {0}")]
    Remote(String),
}

impl From<RepoError> for EngineError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::AuthenticationFailed => Self::AuthenticationFailed,
            RepoError::NotFound(what) => Self::BlobNotFound(what),
            RepoError::Http(e) => Self::Remote(e.to_string()),
            RepoError::Serialization(msg) | RepoError::Remote(msg) => Self::Remote(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_not_found_maps_to_blob_not_found() {
        let err: EngineError = RepoError::NotFound("blob xyz".into()).into();
        assert!(matches!(err, EngineError::BlobNotFound(_)));
    }

    #[test]
    fn repo_auth_maps_to_auth() {
        let err: EngineError = RepoError::AuthenticationFailed.into();
        assert!(matches!(err, EngineError::AuthenticationFailed));
    }

    #[test]
    fn repo_remote_maps_to_remote() {
        let err: EngineError = RepoError::Remote("500".into()).into();
        assert!(matches!(err, EngineError::Remote(_)));
    }
}
