//! Domain Registry: maps public domain names to the owning principal and
//! the endpoint that should serve them.
//!
//! Backed by the cache store, but treated as authoritative because no
//! richer backing store exists. Unlike the engine's cache-aside layer,
//! store failures here surface to the caller.

pub mod config;
pub mod error;
pub mod registry;

pub use config::RegistryConfig;
pub use error::RegistryError;
pub use registry::{DomainRegistry, DomainUpdate};
