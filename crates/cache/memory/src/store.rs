use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use strand_cache::error::CacheError;
use strand_cache::key::CacheKey;
use strand_cache::store::CacheStore;

/// What a single entry holds: a plain string or a member set.
#[derive(Debug, Clone)]
enum Payload {
    Value(String),
    Set(HashSet<String>),
}

/// A single entry in the in-memory store.
#[derive(Debug, Clone)]
struct Entry {
    payload: Payload,
    expires_at: Option<Instant>,
}

impl Entry {
    /// Returns `true` if this entry has passed its TTL deadline.
    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Compute the expiry instant from an optional TTL duration.
fn expiry_from_ttl(ttl: Option<Duration>) -> Option<Instant> {
    ttl.map(|d| Instant::now() + d)
}

fn wrong_type(key: &CacheKey) -> CacheError {
    CacheError::Backend(format!("wrong entry type for key {key}"))
}

/// In-memory [`CacheStore`] backed by a [`DashMap`].
///
/// Entries are lazily evicted on read when their TTL has elapsed. This
/// implementation is fully synchronous internally; the async trait methods
/// return immediately.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    data: DashMap<String, Entry>,
}

impl MemoryCacheStore {
    /// Create a new, empty in-memory cache store.
    pub fn new() -> Self {
        Self::default()
    }

    fn render_key(key: &CacheKey) -> String {
        key.canonical()
    }

    /// Drop the entry if it has expired, so it reads as missing.
    fn evict_if_expired(&self, rendered: &str) {
        self.data.remove_if(rendered, |_, entry| entry.is_expired());
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        let rendered = Self::render_key(key);
        self.evict_if_expired(&rendered);

        match self.data.get(&rendered) {
            Some(entry) => match &entry.payload {
                Payload::Value(v) => Ok(Some(v.clone())),
                Payload::Set(_) => Err(wrong_type(key)),
            },
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let rendered = Self::render_key(key);
        self.data.insert(
            rendered,
            Entry {
                payload: Payload::Value(value.to_owned()),
                expires_at: expiry_from_ttl(ttl),
            },
        );
        Ok(())
    }

    async fn set_keep_ttl(&self, key: &CacheKey, value: &str) -> Result<(), CacheError> {
        let rendered = Self::render_key(key);
        self.evict_if_expired(&rendered);

        self.data
            .entry(rendered)
            .and_modify(|entry| {
                entry.payload = Payload::Value(value.to_owned());
                // expires_at deliberately untouched
            })
            .or_insert_with(|| Entry {
                payload: Payload::Value(value.to_owned()),
                expires_at: None,
            });
        Ok(())
    }

    async fn check_and_set(
        &self,
        key: &CacheKey,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        let rendered = Self::render_key(key);
        self.evict_if_expired(&rendered);

        // `entry` API for atomicity: only insert if vacant.
        let was_inserted = match self.data.entry(rendered) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(Entry {
                    payload: Payload::Value(value.to_owned()),
                    expires_at: expiry_from_ttl(ttl),
                });
                true
            }
        };
        Ok(was_inserted)
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let rendered = Self::render_key(key);
        match self.data.remove(&rendered) {
            Some((_, entry)) => Ok(!entry.is_expired()),
            None => Ok(false),
        }
    }

    async fn add_to_set(
        &self,
        key: &CacheKey,
        member: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        let rendered = Self::render_key(key);
        self.evict_if_expired(&rendered);

        let mut entry = self.data.entry(rendered).or_insert_with(|| Entry {
            payload: Payload::Set(HashSet::new()),
            expires_at: None,
        });
        if let Some(deadline) = expiry_from_ttl(ttl) {
            entry.expires_at = Some(deadline);
        }
        match &mut entry.payload {
            Payload::Set(members) => Ok(members.insert(member.to_owned())),
            Payload::Value(_) => Err(wrong_type(key)),
        }
    }

    async fn remove_from_set(&self, key: &CacheKey, member: &str) -> Result<bool, CacheError> {
        let rendered = Self::render_key(key);
        self.evict_if_expired(&rendered);

        let Some(mut entry) = self.data.get_mut(&rendered) else {
            return Ok(false);
        };
        match &mut entry.payload {
            Payload::Set(members) => Ok(members.remove(member)),
            Payload::Value(_) => Err(wrong_type(key)),
        }
    }

    async fn set_members(&self, key: &CacheKey) -> Result<Vec<String>, CacheError> {
        let rendered = Self::render_key(key);
        self.evict_if_expired(&rendered);

        match self.data.get(&rendered) {
            Some(entry) => match &entry.payload {
                Payload::Set(members) => Ok(members.iter().cloned().collect()),
                Payload::Value(_) => Err(wrong_type(key)),
            },
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use strand_cache::key::{CacheKey, CacheKind};
    use strand_cache::testing::run_cache_conformance_tests;
    use strand_core::OwnerId;

    use super::*;

    fn test_key(kind: CacheKind, id: &str) -> CacheKey {
        CacheKey::owner_scoped(kind, &OwnerId::from("did:plc:test"), id)
    }

    #[tokio::test]
    async fn conformance() {
        let store = MemoryCacheStore::new();
        run_cache_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_expiry_via_get() {
        let store = MemoryCacheStore::new();
        let key = test_key(CacheKind::MappingRecord, "ttl-expire");

        store
            .set(&key, "short-lived", Some(Duration::from_secs(5)))
            .await
            .unwrap();

        let val = store.get(&key).await.unwrap();
        assert_eq!(val.as_deref(), Some("short-lived"));

        tokio::time::advance(Duration::from_secs(6)).await;

        // Lazy eviction: get should return None.
        let val = store.get(&key).await.unwrap();
        assert!(val.is_none(), "value should be expired");
    }

    #[tokio::test(start_paused = true)]
    async fn set_keep_ttl_preserves_deadline() {
        let store = MemoryCacheStore::new();
        let key = test_key(CacheKind::Domain, "keep-ttl");

        store
            .set(&key, "v1", Some(Duration::from_secs(10)))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(5)).await;
        store.set_keep_ttl(&key, "v2").await.unwrap();

        // Still alive at t=9 with the new value.
        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("v2"));

        // Original deadline (t=10) still applies.
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn check_and_set_after_expiry() {
        let store = MemoryCacheStore::new();
        let key = test_key(CacheKind::Domain, "cas-ttl");

        let created = store
            .check_and_set(&key, "v1", Some(Duration::from_secs(3)))
            .await
            .unwrap();
        assert!(created);

        let created = store.check_and_set(&key, "v2", None).await.unwrap();
        assert!(!created);

        tokio::time::advance(Duration::from_secs(4)).await;

        let created = store.check_and_set(&key, "v2", None).await.unwrap();
        assert!(created, "should re-create after expiry");
        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn wrong_type_errors() {
        let store = MemoryCacheStore::new();
        let key = test_key(CacheKind::OwnerKeys, "typed");

        store.add_to_set(&key, "a", None).await.unwrap();
        assert!(store.get(&key).await.is_err());

        let string_key = test_key(CacheKind::MappingRecord, "typed");
        store.set(&string_key, "v", None).await.unwrap();
        assert!(store.add_to_set(&string_key, "a", None).await.is_err());
    }
}
