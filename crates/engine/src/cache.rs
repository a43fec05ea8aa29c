use std::sync::Arc;

use tracing::{debug, warn};

use strand_cache::{CacheKey, CacheKind, CacheStore};
use strand_core::{BlobInfo, MappingRecord, OwnerId};

use crate::config::EngineConfig;

/// Which path served a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Served from the cache store.
    Cache,
    /// Served from the authoritative remote repository.
    Authoritative,
}

/// A value plus the path that produced it, so callers and tests can tell a
/// cache hit from an authoritative read.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub source: Source,
    pub value: T,
}

/// Cache-aside layer over the cache store, scoped per owner and key.
///
/// Three namespaces, each with its own TTL: mapping records, current-blob
/// metadata, and the per-owner key-set used only to drive bulk
/// invalidation. Every operation here swallows backend failures: a broken
/// cache must never block correctness, so errors degrade to a logged miss
/// or no-op and the caller falls back to the adapter.
pub struct MappingCache {
    store: Arc<dyn CacheStore>,
    config: EngineConfig,
}

/// Member id under which an owner's key-set is stored.
const KEY_SET_ID: &str = "keys";

impl MappingCache {
    pub fn new(store: Arc<dyn CacheStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    fn record_key(owner: &OwnerId, key: &str) -> CacheKey {
        CacheKey::owner_scoped(CacheKind::MappingRecord, owner, key)
    }

    fn meta_key(owner: &OwnerId, key: &str) -> CacheKey {
        CacheKey::owner_scoped(CacheKind::BlobMeta, owner, key)
    }

    fn key_set(owner: &OwnerId) -> CacheKey {
        CacheKey::owner_scoped(CacheKind::OwnerKeys, owner, KEY_SET_ID)
    }

    /// Cached mapping record for (owner, key), if present and parseable.
    pub async fn get_record(&self, owner: &OwnerId, key: &str) -> Option<MappingRecord> {
        let cache_key = Self::record_key(owner, key);
        match self.store.get(&cache_key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(record) => {
                    debug!(%owner, key, "mapping record cache hit");
                    Some(record)
                }
                Err(e) => {
                    warn!(%owner, key, error = %e, "dropping unparseable cached record");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(%owner, key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Write-through a mapping record and register the key in the owner's
    /// key-set. Failures are logged and swallowed.
    pub async fn put_record(&self, owner: &OwnerId, key: &str, record: &MappingRecord) {
        let Ok(raw) = serde_json::to_string(record) else {
            warn!(%owner, key, "mapping record did not serialize for caching");
            return;
        };
        let cache_key = Self::record_key(owner, key);
        if let Err(e) = self
            .store
            .set(&cache_key, &raw, Some(self.config.mapping_ttl))
            .await
        {
            warn!(%owner, key, error = %e, "failed to cache mapping record");
        }
        if let Err(e) = self
            .store
            .add_to_set(&Self::key_set(owner), key, Some(self.config.owner_keys_ttl))
            .await
        {
            warn!(%owner, key, error = %e, "failed to index key for bulk invalidation");
        }
    }

    /// Cached metadata of the blob currently served for (owner, key).
    pub async fn get_blob_meta(&self, owner: &OwnerId, key: &str) -> Option<BlobInfo> {
        let cache_key = Self::meta_key(owner, key);
        match self.store.get(&cache_key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(%owner, key, error = %e, "blob metadata cache read failed");
                None
            }
        }
    }

    /// Write-through current-blob metadata. Failures are logged and
    /// swallowed.
    pub async fn put_blob_meta(&self, owner: &OwnerId, key: &str, info: &BlobInfo) {
        let Ok(raw) = serde_json::to_string(info) else {
            return;
        };
        let cache_key = Self::meta_key(owner, key);
        if let Err(e) = self
            .store
            .set(&cache_key, &raw, Some(self.config.blob_meta_ttl))
            .await
        {
            warn!(%owner, key, error = %e, "failed to cache blob metadata");
        }
    }

    /// Drop the mapping-record and blob-metadata entries for one key.
    pub async fn invalidate_key(&self, owner: &OwnerId, key: &str) {
        for cache_key in [Self::record_key(owner, key), Self::meta_key(owner, key)] {
            if let Err(e) = self.store.delete(&cache_key).await {
                warn!(%owner, key, error = %e, "cache invalidation failed");
            }
        }
    }

    /// Invalidate one key and remove it from the owner's key-set (full
    /// delete of the mapping).
    pub async fn remove_key(&self, owner: &OwnerId, key: &str) {
        self.invalidate_key(owner, key).await;
        if let Err(e) = self
            .store
            .remove_from_set(&Self::key_set(owner), key)
            .await
        {
            warn!(%owner, key, error = %e, "failed to drop key from invalidation set");
        }
    }

    /// Remove every cache entry for every key in the owner's key-set, then
    /// the key-set itself. The only path that reclaims entries missed by
    /// individual invalidation before natural TTL expiry.
    pub async fn invalidate_owner(&self, owner: &OwnerId) {
        let key_set = Self::key_set(owner);
        let members = match self.store.set_members(&key_set).await {
            Ok(members) => members,
            Err(e) => {
                warn!(%owner, error = %e, "could not enumerate owner keys for bulk invalidation");
                return;
            }
        };
        debug!(%owner, count = members.len(), "bulk-invalidating owner cache entries");
        for key in &members {
            self.invalidate_key(owner, key).await;
        }
        if let Err(e) = self.store.delete(&key_set).await {
            warn!(%owner, error = %e, "failed to drop owner key-set");
        }
    }
}
