use serde::{Deserialize, Serialize};

use strand_core::OwnerId;

/// The kind of entry being cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKind {
    /// A serialized mapping record.
    MappingRecord,
    /// Metadata of the blob currently served for a key.
    BlobMeta,
    /// Set of cached mapping keys per owner, used for bulk invalidation.
    OwnerKeys,
    /// A serialized domain mapping (registry, authoritative).
    Domain,
    /// Set of domains registered by one owner.
    OwnerDomains,
    /// Set of all registered domains, for administrative enumeration.
    GlobalDomains,
    Custom(String),
}

impl CacheKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::MappingRecord => "mapping",
            Self::BlobMeta => "blob_meta",
            Self::OwnerKeys => "owner_keys",
            Self::Domain => "domain",
            Self::OwnerDomains => "owner_domains",
            Self::GlobalDomains => "global_domains",
            Self::Custom(s) => s.as_str(),
        }
    }
}

impl std::fmt::Display for CacheKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whose data a cache entry belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Entry scoped to a single owner.
    Owner(OwnerId),
    /// Entry shared across all owners (registry state).
    Global,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Owner(id) => f.write_str(id.as_str()),
            Self::Global => f.write_str("global"),
        }
    }
}

/// Key used to address entries in the cache store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub kind: CacheKind,
    pub scope: Scope,
    pub id: String,
}

impl CacheKey {
    /// Create a key scoped to one owner.
    #[must_use]
    pub fn owner_scoped(kind: CacheKind, owner: &OwnerId, id: impl Into<String>) -> Self {
        Self {
            kind,
            scope: Scope::Owner(owner.clone()),
            id: id.into(),
        }
    }

    /// Create a globally scoped key.
    #[must_use]
    pub fn global(kind: CacheKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            scope: Scope::Global,
            id: id.into(),
        }
    }

    /// Canonical string representation: `kind:scope:id`.
    #[must_use]
    pub fn canonical(&self) -> String {
        format!("{}:{}:{}", self.kind, self.scope, self.id)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}
