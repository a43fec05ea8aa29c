//! In-memory [`CacheStore`](strand_cache::CacheStore) backend.
//!
//! Intended for tests and single-node deployments; entries are lazily
//! evicted on read when their TTL has elapsed.

mod store;

pub use store::MemoryCacheStore;
