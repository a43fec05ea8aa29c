use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument, warn};

use strand_cache::{CacheKey, CacheKind, CacheStore};
use strand_core::{
    DomainMapping, DomainSettings, DomainStatus, OwnerHandle, OwnerId, pds_endpoint_for,
    validate_domain,
};

use crate::config::RegistryConfig;
use crate::error::RegistryError;

/// Member id under which an owner's domain-set is stored.
const OWNER_DOMAINS_ID: &str = "domains";
/// Id of the single global domain-set entry.
const GLOBAL_DOMAINS_ID: &str = "all";

/// Mutable fields of a domain mapping; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct DomainUpdate {
    pub status: Option<DomainStatus>,
    pub settings: Option<DomainSettings>,
}

/// Registry of public domains and the principals that serve them.
pub struct DomainRegistry {
    store: Arc<dyn CacheStore>,
    config: RegistryConfig,
}

impl DomainRegistry {
    pub fn new(store: Arc<dyn CacheStore>, config: RegistryConfig) -> Self {
        Self { store, config }
    }

    fn domain_key(domain: &str) -> CacheKey {
        CacheKey::global(CacheKind::Domain, domain)
    }

    fn owner_set(owner: &OwnerId) -> CacheKey {
        CacheKey::owner_scoped(CacheKind::OwnerDomains, owner, OWNER_DOMAINS_ID)
    }

    fn global_set() -> CacheKey {
        CacheKey::global(CacheKind::GlobalDomains, GLOBAL_DOMAINS_ID)
    }

    fn encode(mapping: &DomainMapping) -> Result<String, RegistryError> {
        serde_json::to_string(mapping).map_err(|e| RegistryError::Serialization(e.to_string()))
    }

    fn decode(raw: &str) -> Result<DomainMapping, RegistryError> {
        serde_json::from_str(raw).map_err(|e| RegistryError::Serialization(e.to_string()))
    }

    /// Register a domain for an owner.
    ///
    /// The mapping entry, the owner's domain-set and the global domain-set
    /// are applied together or not at all from the caller's perspective:
    /// the entry is created atomically (rejecting duplicates), and a
    /// failure to update either set rolls back whatever was applied. A
    /// domain is never resolvable without appearing in its owner's set, or
    /// vice versa.
    #[instrument(name = "registry.register", skip_all, fields(domain))]
    pub async fn register(
        &self,
        domain: &str,
        owner_handle: OwnerHandle,
        owner_id: OwnerId,
        settings: DomainSettings,
    ) -> Result<DomainMapping, RegistryError> {
        validate_domain(domain)?;

        let now = Utc::now();
        let mapping = DomainMapping {
            domain: domain.to_owned(),
            owner_handle,
            owner_id: owner_id.clone(),
            status: DomainStatus::Active,
            settings,
            created_at: now,
            updated_at: now,
        };
        let raw = Self::encode(&mapping)?;

        let created = self
            .store
            .check_and_set(&Self::domain_key(domain), &raw, Some(self.config.domain_ttl))
            .await?;
        if !created {
            return Err(RegistryError::DomainAlreadyRegistered(domain.to_owned()));
        }

        if let Err(e) = self
            .store
            .add_to_set(&Self::owner_set(&owner_id), domain, None)
            .await
        {
            // Compensate: the domain must not resolve without set entries.
            let _ = self.store.delete(&Self::domain_key(domain)).await;
            return Err(e.into());
        }
        if let Err(e) = self
            .store
            .add_to_set(&Self::global_set(), domain, None)
            .await
        {
            let _ = self
                .store
                .remove_from_set(&Self::owner_set(&owner_id), domain)
                .await;
            let _ = self.store.delete(&Self::domain_key(domain)).await;
            return Err(e.into());
        }

        debug!(domain, owner = %owner_id, "domain registered");
        Ok(mapping)
    }

    /// Look up the mapping for a domain. Direct lookup only; no secondary
    /// search.
    pub async fn resolve(&self, domain: &str) -> Result<Option<DomainMapping>, RegistryError> {
        match self.store.get(&Self::domain_key(domain)).await? {
            Some(raw) => Ok(Some(Self::decode(&raw)?)),
            None => Ok(None),
        }
    }

    /// Replace a mapping's mutable fields, preserving its remaining TTL.
    #[instrument(name = "registry.update", skip_all, fields(domain))]
    pub async fn update(
        &self,
        domain: &str,
        changes: DomainUpdate,
    ) -> Result<DomainMapping, RegistryError> {
        let mut mapping = self
            .resolve(domain)
            .await?
            .ok_or_else(|| RegistryError::DomainNotFound(domain.to_owned()))?;

        if let Some(status) = changes.status {
            mapping.status = status;
        }
        if let Some(settings) = changes.settings {
            mapping.settings = settings;
        }
        mapping.updated_at = Utc::now();

        let raw = Self::encode(&mapping)?;
        self.store
            .set_keep_ttl(&Self::domain_key(domain), &raw)
            .await?;
        Ok(mapping)
    }

    /// Remove a domain mapping.
    ///
    /// The owner's and global sets are cleaned up best-effort and
    /// sequentially: a dangling global-set entry affects only
    /// administrative enumeration, never access control, because access
    /// always goes through [`resolve`](Self::resolve).
    #[instrument(name = "registry.delete", skip_all, fields(domain))]
    pub async fn delete(&self, domain: &str) -> Result<(), RegistryError> {
        let mapping = self
            .resolve(domain)
            .await?
            .ok_or_else(|| RegistryError::DomainNotFound(domain.to_owned()))?;

        self.store.delete(&Self::domain_key(domain)).await?;

        if let Err(e) = self
            .store
            .remove_from_set(&Self::owner_set(&mapping.owner_id), domain)
            .await
        {
            warn!(domain, error = %e, "failed to drop domain from owner set");
        }
        if let Err(e) = self
            .store
            .remove_from_set(&Self::global_set(), domain)
            .await
        {
            warn!(domain, error = %e, "failed to drop domain from global set");
        }
        Ok(())
    }

    /// All mappings registered by one owner. Set members whose mapping has
    /// lapsed are skipped.
    pub async fn list_owner_domains(
        &self,
        owner_id: &OwnerId,
    ) -> Result<Vec<DomainMapping>, RegistryError> {
        let mut domains = self.store.set_members(&Self::owner_set(owner_id)).await?;
        domains.sort();

        let mut mappings = Vec::with_capacity(domains.len());
        for domain in domains {
            if let Some(mapping) = self.resolve(&domain).await? {
                mappings.push(mapping);
            }
        }
        Ok(mappings)
    }

    /// Every registered domain name, for administrative enumeration.
    pub async fn list_all_domains(&self) -> Result<Vec<String>, RegistryError> {
        let mut domains = self.store.set_members(&Self::global_set()).await?;
        domains.sort();
        Ok(domains)
    }

    /// The PDS endpoint that should serve requests for this handle.
    #[must_use]
    pub fn resolve_pds_endpoint(&self, handle: &OwnerHandle) -> String {
        pds_endpoint_for(handle, &self.config.default_endpoint)
    }
}

#[cfg(test)]
mod tests {
    use strand_cache_memory::MemoryCacheStore;

    use super::*;

    fn registry() -> DomainRegistry {
        DomainRegistry::new(Arc::new(MemoryCacheStore::new()), RegistryConfig::default())
    }

    fn owner(n: u32) -> (OwnerHandle, OwnerId) {
        (
            OwnerHandle::new(format!("owner{n}.example.com")),
            OwnerId::new(format!("did:plc:owner{n}")),
        )
    }

    #[tokio::test]
    async fn register_and_resolve() {
        let registry = registry();
        let (handle, id) = owner(1);

        let mapping = registry
            .register("files.example.com", handle, id.clone(), DomainSettings::default())
            .await
            .unwrap();
        assert_eq!(mapping.status, DomainStatus::Active);

        let resolved = registry
            .resolve("files.example.com")
            .await
            .unwrap()
            .expect("registered");
        assert_eq!(resolved.owner_id, id);

        let all = registry.list_all_domains().await.unwrap();
        assert_eq!(all, vec!["files.example.com"]);
        let owned = registry.list_owner_domains(&id).await.unwrap();
        assert_eq!(owned.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected_and_first_owner_wins() {
        let registry = registry();
        let (handle1, id1) = owner(1);
        let (handle2, id2) = owner(2);

        registry
            .register("files.example.com", handle1, id1.clone(), DomainSettings::default())
            .await
            .unwrap();

        let err = registry
            .register("files.example.com", handle2, id2, DomainSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::DomainAlreadyRegistered(_)));

        // The original owner still holds the domain.
        let resolved = registry
            .resolve("files.example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.owner_id, id1);
    }

    #[tokio::test]
    async fn resolve_unknown_is_none() {
        let registry = registry();
        assert!(registry.resolve("nope.example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalid_domain_is_rejected() {
        let registry = registry();
        let (handle, id) = owner(1);
        let err = registry
            .register("not a domain", handle, id, DomainSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidDomain(_)));
    }

    #[tokio::test]
    async fn update_replaces_mutable_fields() {
        let registry = registry();
        let (handle, id) = owner(1);
        let created = registry
            .register("files.example.com", handle, id, DomainSettings::default())
            .await
            .unwrap();

        let updated = registry
            .update(
                "files.example.com",
                DomainUpdate {
                    status: Some(DomainStatus::Suspended),
                    settings: Some(DomainSettings {
                        public_access: false,
                        allowed_mime_types: Some(vec!["image/png".into()]),
                        max_file_size: Some(1024),
                    }),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, DomainStatus::Suspended);
        assert!(!updated.settings.public_access);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.created_at, created.created_at);

        let resolved = registry
            .resolve("files.example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.status, DomainStatus::Suspended);
    }

    #[tokio::test]
    async fn update_unknown_is_not_found() {
        let registry = registry();
        let err = registry
            .update("nope.example.com", DomainUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::DomainNotFound(_)));
    }

    #[tokio::test]
    async fn delete_removes_mapping_and_set_entries() {
        let registry = registry();
        let (handle, id) = owner(1);
        registry
            .register("files.example.com", handle, id.clone(), DomainSettings::default())
            .await
            .unwrap();

        registry.delete("files.example.com").await.unwrap();

        assert!(registry.resolve("files.example.com").await.unwrap().is_none());
        assert!(registry.list_all_domains().await.unwrap().is_empty());
        assert!(registry.list_owner_domains(&id).await.unwrap().is_empty());

        let err = registry.delete("files.example.com").await.unwrap_err();
        assert!(matches!(err, RegistryError::DomainNotFound(_)));
    }

    #[tokio::test]
    async fn owner_listing_is_scoped() {
        let registry = registry();
        let (handle1, id1) = owner(1);
        let (handle2, id2) = owner(2);

        registry
            .register("one.example.com", handle1, id1.clone(), DomainSettings::default())
            .await
            .unwrap();
        registry
            .register("two.example.com", handle2, id2.clone(), DomainSettings::default())
            .await
            .unwrap();

        let owned = registry.list_owner_domains(&id1).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].domain, "one.example.com");

        let all = registry.list_all_domains().await.unwrap();
        assert_eq!(all, vec!["one.example.com", "two.example.com"]);
    }

    #[tokio::test]
    async fn pds_endpoint_heuristic() {
        let registry = registry();
        assert_eq!(
            registry.resolve_pds_endpoint(&OwnerHandle::new("alice.pds.example.com")),
            "https://example.com"
        );
        assert_eq!(
            registry.resolve_pds_endpoint(&OwnerHandle::new("alice")),
            "https://bsky.social"
        );
    }
}
