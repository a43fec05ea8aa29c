//! Redis [`CacheStore`](strand_cache::CacheStore) backend over a
//! `deadpool-redis` connection pool.

mod config;
mod key_render;
mod store;

pub use config::RedisConfig;
pub use store::RedisCacheStore;
