//! Mapping & Versioning Engine.
//!
//! Orchestrates the remote repository adapter and the cache-aside layer to
//! resolve human-memorable keys to versioned, immutable blobs. The remote
//! repository is the only source of truth; every cache entry is a
//! rebuildable projection and every cache failure degrades to a logged
//! no-op.

pub mod cache;
pub mod config;
pub mod delegate;
pub mod engine;
pub mod error;

pub use cache::{MappingCache, Resolved, Source};
pub use config::EngineConfig;
pub use delegate::{AccessContext, ReadDelegate, StaticDelegation};
pub use engine::{
    MappingEngine, MappingPage, ResolvedBlob, UploadOutcome, UploadRequest, VersionEntry,
};
pub use error::EngineError;
