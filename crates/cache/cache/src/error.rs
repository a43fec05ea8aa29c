use thiserror::Error;

/// Errors surfaced by cache store backends.
///
/// Cache entries are ephemeral projections of authoritative state, so the
/// engine treats every variant here as a cache miss and falls back to the
/// remote repository. The domain registry, which has no richer backing
/// store, is the one caller that surfaces these.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend could not be reached or a connection could not be
    /// obtained from the pool.
    #[error("cache connection error: {0}")]
    Connection(String),

    /// The backend reached but the operation failed.
    #[error("cache backend error: {0}")]
    Backend(String),

    /// A stored value could not be parsed.
    #[error("cache serialization error: {0}")]
    Serialization(String),
}
