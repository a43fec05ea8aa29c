use strand_cache::CacheKey;

/// Render a [`CacheKey`] into a Redis key string with the given prefix.
///
/// The format is `prefix:kind:scope:id`.
pub fn render_key(prefix: &str, key: &CacheKey) -> String {
    format!("{}:{}", prefix, key.canonical())
}

#[cfg(test)]
mod tests {
    use strand_cache::CacheKind;
    use strand_core::OwnerId;

    use super::*;

    #[test]
    fn renders_owner_scoped_key() {
        let owner = OwnerId::from("did:plc:abc");
        let key = CacheKey::owner_scoped(CacheKind::MappingRecord, &owner, "logo");
        assert_eq!(render_key("strand", &key), "strand:mapping:did:plc:abc:logo");
    }

    #[test]
    fn renders_global_key() {
        let key = CacheKey::global(CacheKind::GlobalDomains, "all");
        assert_eq!(render_key("pfx", &key), "pfx:global_domains:global:all");
    }
}
