//! Remote Repository Adapter: the only durable system of record.
//!
//! Each owner's records and blobs live in their own authoritative personal
//! data server (PDS). This crate defines the [`RepoClient`] contract, the
//! XRPC implementation [`PdsClient`], and a `DashMap`-backed
//! [`MemoryRepo`](testing::MemoryRepo) test double that reproduces the
//! remote store's last-write-wins semantics.

pub mod client;
pub mod error;
pub mod pds;
pub mod session;
pub mod testing;

pub use client::{ListedRecord, RecordLocator, RecordPage, RepoClient};
pub use error::RepoError;
pub use pds::{PdsClient, PdsConfig};
pub use session::{Session, SessionStore};
