use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;
use crate::key::CacheKey;

/// Trait for the remote key-value cache store.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
/// Every entry is a rebuildable projection of authoritative state: backends
/// may evict at will and callers must tolerate any entry vanishing.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get the value for a key. Returns `None` if not found or expired.
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError>;

    /// Set a value with an optional TTL, overwriting any previous value.
    async fn set(
        &self,
        key: &CacheKey,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError>;

    /// Overwrite a value while preserving the key's remaining TTL.
    ///
    /// On a key with no TTL (or no prior value) this behaves like an
    /// unexpiring `set`.
    async fn set_keep_ttl(&self, key: &CacheKey, value: &str) -> Result<(), CacheError>;

    /// Check if a key exists; if not, set it atomically with an optional
    /// TTL. Returns `true` if the key was newly set, `false` if it already
    /// existed.
    async fn check_and_set(
        &self,
        key: &CacheKey,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError>;

    /// Delete a key. Returns `true` if the key existed.
    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError>;

    /// Add a member to a set-valued entry, creating the set if absent.
    /// Returns `true` if the member was newly added. A `ttl` refreshes the
    /// whole set's expiry; `None` leaves it untouched.
    async fn add_to_set(
        &self,
        key: &CacheKey,
        member: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError>;

    /// Remove a member from a set-valued entry. Returns `true` if the
    /// member was present.
    async fn remove_from_set(&self, key: &CacheKey, member: &str) -> Result<bool, CacheError>;

    /// All members of a set-valued entry; empty if the set does not exist.
    /// Order is unspecified.
    async fn set_members(&self, key: &CacheKey) -> Result<Vec<String>, CacheError>;
}
