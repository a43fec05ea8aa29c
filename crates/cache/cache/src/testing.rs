use crate::error::CacheError;
use crate::key::{CacheKey, CacheKind};
use crate::store::CacheStore;

use strand_core::OwnerId;

fn test_key(kind: CacheKind, id: &str) -> CacheKey {
    CacheKey::owner_scoped(kind, &OwnerId::from("did:plc:conformance"), id)
}

/// Run the full cache store conformance test suite.
///
/// Call this from your backend's test module with a fresh store instance.
/// TTL expiry is deliberately not covered here: backends verify it with
/// their own clock-control mechanism.
///
/// # Errors
///
/// Returns an error if any conformance test fails.
pub async fn run_cache_conformance_tests(store: &dyn CacheStore) -> Result<(), CacheError> {
    test_get_missing(store).await?;
    test_set_and_get(store).await?;
    test_set_overwrites(store).await?;
    test_set_keep_ttl(store).await?;
    test_check_and_set(store).await?;
    test_delete(store).await?;
    test_set_membership(store).await?;
    Ok(())
}

async fn test_get_missing(store: &dyn CacheStore) -> Result<(), CacheError> {
    let key = test_key(CacheKind::MappingRecord, "missing");
    let val = store.get(&key).await?;
    assert!(val.is_none(), "get on missing key should return None");
    Ok(())
}

async fn test_set_and_get(store: &dyn CacheStore) -> Result<(), CacheError> {
    let key = test_key(CacheKind::MappingRecord, "set-get");
    store.set(&key, "hello", None).await?;
    let val = store.get(&key).await?;
    assert_eq!(val.as_deref(), Some("hello"));
    Ok(())
}

async fn test_set_overwrites(store: &dyn CacheStore) -> Result<(), CacheError> {
    let key = test_key(CacheKind::MappingRecord, "overwrite");
    store.set(&key, "v1", None).await?;
    store.set(&key, "v2", None).await?;
    let val = store.get(&key).await?;
    assert_eq!(val.as_deref(), Some("v2"));
    Ok(())
}

async fn test_set_keep_ttl(store: &dyn CacheStore) -> Result<(), CacheError> {
    let key = test_key(CacheKind::Domain, "keep-ttl");
    store.set(&key, "v1", None).await?;
    store.set_keep_ttl(&key, "v2").await?;
    let val = store.get(&key).await?;
    assert_eq!(val.as_deref(), Some("v2"), "value should be replaced");

    // Also valid on a key that does not exist yet.
    let fresh = test_key(CacheKind::Domain, "keep-ttl-fresh");
    store.set_keep_ttl(&fresh, "v1").await?;
    let val = store.get(&fresh).await?;
    assert_eq!(val.as_deref(), Some("v1"));
    Ok(())
}

async fn test_check_and_set(store: &dyn CacheStore) -> Result<(), CacheError> {
    let key = test_key(CacheKind::Domain, "cas");
    let created = store.check_and_set(&key, "v1", None).await?;
    assert!(created, "check_and_set on new key should return true");

    let created = store.check_and_set(&key, "v2", None).await?;
    assert!(!created, "check_and_set on existing key should return false");

    let val = store.get(&key).await?;
    assert_eq!(val.as_deref(), Some("v1"), "original value should remain");
    Ok(())
}

async fn test_delete(store: &dyn CacheStore) -> Result<(), CacheError> {
    let key = test_key(CacheKind::MappingRecord, "to-delete");
    store.set(&key, "bye", None).await?;
    let existed = store.delete(&key).await?;
    assert!(existed, "delete should return true for existing key");
    let val = store.get(&key).await?;
    assert!(val.is_none(), "get after delete should return None");

    let existed = store.delete(&key).await?;
    assert!(!existed, "delete on missing key should return false");
    Ok(())
}

async fn test_set_membership(store: &dyn CacheStore) -> Result<(), CacheError> {
    let key = test_key(CacheKind::OwnerKeys, "members");

    let members = store.set_members(&key).await?;
    assert!(members.is_empty(), "missing set should have no members");

    let added = store.add_to_set(&key, "a", None).await?;
    assert!(added, "first add should report a new member");
    let added = store.add_to_set(&key, "a", None).await?;
    assert!(!added, "duplicate add should report no change");
    store.add_to_set(&key, "b", None).await?;

    let mut members = store.set_members(&key).await?;
    members.sort();
    assert_eq!(members, vec!["a", "b"]);

    let removed = store.remove_from_set(&key, "a").await?;
    assert!(removed);
    let removed = store.remove_from_set(&key, "a").await?;
    assert!(!removed, "removing an absent member should report false");

    let members = store.set_members(&key).await?;
    assert_eq!(members, vec!["b"]);

    // Deleting the set entry removes all members at once.
    store.delete(&key).await?;
    let members = store.set_members(&key).await?;
    assert!(members.is_empty());
    Ok(())
}
