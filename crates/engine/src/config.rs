use std::time::Duration;

/// Configuration for the mapping engine and its cache-aside layer.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Collection NSID under which mapping records are stored in each
    /// owner's repository.
    pub collection: String,

    /// TTL for cached mapping records.
    pub mapping_ttl: Duration,

    /// TTL for cached current-blob metadata.
    pub blob_meta_ttl: Duration,

    /// TTL for the per-owner key-set that drives bulk invalidation.
    pub owner_keys_ttl: Duration,

    /// Default page size for `list` when the caller gives none.
    pub default_list_limit: u32,
}

/// Hard upper bound on `list` page size.
pub const MAX_LIST_LIMIT: u32 = 100;

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            collection: String::from("dev.strand.mapping"),
            mapping_ttl: Duration::from_secs(60 * 60),
            blob_meta_ttl: Duration::from_secs(30 * 60),
            owner_keys_ttl: Duration::from_secs(5 * 60),
            default_list_limit: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.collection, "dev.strand.mapping");
        assert_eq!(cfg.mapping_ttl, Duration::from_secs(3600));
        assert_eq!(cfg.blob_meta_ttl, Duration::from_secs(1800));
        assert_eq!(cfg.owner_keys_ttl, Duration::from_secs(300));
        assert_eq!(cfg.default_list_limit, 50);
    }
}
