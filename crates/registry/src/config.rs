use std::time::Duration;

/// Configuration for the domain registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Safety TTL on domain mappings. Long enough to never expire in
    /// normal operation; a lapsed deployment eventually reclaims its
    /// entries instead of leaking them forever.
    pub domain_ttl: Duration,

    /// Endpoint reported for handles that do not imply one.
    pub default_endpoint: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            domain_ttl: Duration::from_secs(365 * 24 * 60 * 60),
            default_endpoint: String::from("https://bsky.social"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = RegistryConfig::default();
        assert_eq!(cfg.domain_ttl, Duration::from_secs(31_536_000));
        assert_eq!(cfg.default_endpoint, "https://bsky.social");
    }
}
