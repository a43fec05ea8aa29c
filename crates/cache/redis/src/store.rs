use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;

use strand_cache::error::CacheError;
use strand_cache::key::CacheKey;
use strand_cache::store::CacheStore;

use crate::config::RedisConfig;
use crate::key_render::render_key;

/// Redis-backed implementation of [`CacheStore`].
///
/// Plain entries are stored as Redis strings with `PX` TTLs; set-valued
/// entries use native Redis sets. `set_keep_ttl` relies on `SET ... KEEPTTL`
/// (Redis 6+).
pub struct RedisCacheStore {
    pool: Pool,
    prefix: String,
}

impl RedisCacheStore {
    /// Create a new `RedisCacheStore` from the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Connection`] if the pool cannot be created.
    pub fn new(config: &RedisConfig) -> Result<Self, CacheError> {
        let cfg = Config::from_url(&config.url);
        let pool = cfg
            .builder()
            .map(|b| {
                b.max_size(config.pool_size)
                    .wait_timeout(Some(config.connection_timeout))
                    .runtime(Runtime::Tokio1)
                    .build()
            })
            .map_err(|e| CacheError::Connection(e.to_string()))?
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            prefix: config.prefix.clone(),
        })
    }

    fn redis_key(&self, key: &CacheKey) -> String {
        render_key(&self.prefix, key)
    }

    /// Obtain a connection from the pool.
    async fn conn(&self) -> Result<deadpool_redis::Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))
    }
}

fn ttl_ms(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        let redis_key = self.redis_key(key);
        let mut conn = self.conn().await?;

        let val: Option<String> = conn
            .get(&redis_key)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(val)
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let redis_key = self.redis_key(key);
        let mut conn = self.conn().await?;

        let mut cmd = redis::cmd("SET");
        cmd.arg(&redis_key).arg(value);
        if let Some(d) = ttl {
            cmd.arg("PX").arg(ttl_ms(d));
        }
        cmd.query_async::<()>(&mut conn)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn set_keep_ttl(&self, key: &CacheKey, value: &str) -> Result<(), CacheError> {
        let redis_key = self.redis_key(key);
        let mut conn = self.conn().await?;

        redis::cmd("SET")
            .arg(&redis_key)
            .arg(value)
            .arg("KEEPTTL")
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn check_and_set(
        &self,
        key: &CacheKey,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        let redis_key = self.redis_key(key);
        let mut conn = self.conn().await?;

        // SET NX is atomic: returns OK when set, nil when already present.
        let mut cmd = redis::cmd("SET");
        cmd.arg(&redis_key).arg(value).arg("NX");
        if let Some(d) = ttl {
            cmd.arg("PX").arg(ttl_ms(d));
        }
        let result: Option<String> = cmd
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(result.is_some())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let redis_key = self.redis_key(key);
        let mut conn = self.conn().await?;

        let deleted: i64 = conn
            .del(&redis_key)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(deleted > 0)
    }

    async fn add_to_set(
        &self,
        key: &CacheKey,
        member: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        let redis_key = self.redis_key(key);
        let mut conn = self.conn().await?;

        let added: i64 = conn
            .sadd(&redis_key, member)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        if let Some(d) = ttl {
            let () = conn
                .pexpire(&redis_key, ttl_ms(d))
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;
        }
        Ok(added > 0)
    }

    async fn remove_from_set(&self, key: &CacheKey, member: &str) -> Result<bool, CacheError> {
        let redis_key = self.redis_key(key);
        let mut conn = self.conn().await?;

        let removed: i64 = conn
            .srem(&redis_key, member)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(removed > 0)
    }

    async fn set_members(&self, key: &CacheKey) -> Result<Vec<String>, CacheError> {
        let redis_key = self.redis_key(key);
        let mut conn = self.conn().await?;

        let members: Vec<String> = conn
            .smembers(&redis_key)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(members)
    }
}

#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use super::*;
    use crate::config::RedisConfig;

    fn test_config() -> RedisConfig {
        RedisConfig {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            prefix: format!("strand-test-{}", uuid::Uuid::new_v4()),
            ..RedisConfig::default()
        }
    }

    #[tokio::test]
    async fn store_conformance() {
        let config = test_config();
        let store = RedisCacheStore::new(&config).expect("pool creation should succeed");
        strand_cache::testing::run_cache_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }
}
