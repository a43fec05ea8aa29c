use thiserror::Error;

use strand_cache::CacheError;
use strand_core::DomainError;

/// Errors surfaced by the domain registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The domain name failed validation. Never retried.
    #[error("invalid domain: {0}")]
    InvalidDomain(#[from] DomainError),

    /// No mapping exists for the domain.
    #[error("domain {0:?} is not registered")]
    DomainNotFound(String),

    /// The domain is already registered, possibly by another owner.
    #[error("domain {0:?} is already registered")]
    DomainAlreadyRegistered(String),

    /// The backing store failed. The registry has no authoritative
    /// fallback, so this surfaces instead of degrading.
    #[error(transparent)]
    Store(#[from] CacheError),

    /// A stored mapping could not be parsed.
    #[error("stored domain mapping is malformed: {0}")]
    Serialization(String),
}
