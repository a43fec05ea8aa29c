use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use strand_core::{BlobInfo, OwnerCredential};

use crate::error::RepoError;

/// Where a written record landed in the remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLocator {
    /// Full record URI.
    pub uri: String,
    /// Content id of the record commit.
    pub cid: String,
}

/// One record returned by an enumeration call.
#[derive(Debug, Clone)]
pub struct ListedRecord {
    /// The sanitized record key within its collection.
    pub rkey: String,
    /// The record body.
    pub value: Value,
}

/// A page of records plus the cursor for the next page, if any.
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    pub records: Vec<ListedRecord>,
    pub cursor: Option<String>,
}

/// Contract for the remote, per-owner authoritative repository.
///
/// Every operation authenticates as the supplied owner; implementations may
/// reuse a session across calls for the same owner within one process
/// lifetime and must recreate it when absent or rejected.
///
/// Record keys are sanitized deterministically before use (see
/// [`strand_core::sanitize_record_key`]); distinct input keys may collide on
/// the same stored key, which the remote store resolves last-write-wins.
#[async_trait]
pub trait RepoClient: Send + Sync {
    /// Create or replace the record at `key` within `collection`.
    async fn put_record(
        &self,
        cred: &OwnerCredential,
        key: &str,
        collection: &str,
        value: &Value,
    ) -> Result<RecordLocator, RepoError>;

    /// Fetch the record at `key`. Not-found is normalized to `None`.
    async fn get_record(
        &self,
        cred: &OwnerCredential,
        key: &str,
        collection: &str,
    ) -> Result<Option<Value>, RepoError>;

    /// Delete the record at `key`.
    async fn delete_record(
        &self,
        cred: &OwnerCredential,
        key: &str,
        collection: &str,
    ) -> Result<(), RepoError>;

    /// Enumerate records in `collection`, paginated by an opaque cursor.
    async fn list_records(
        &self,
        cred: &OwnerCredential,
        collection: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<RecordPage, RepoError>;

    /// Upload a blob; the server assigns the content id and the size.
    async fn upload_blob(
        &self,
        cred: &OwnerCredential,
        bytes: Bytes,
        mime_type: &str,
    ) -> Result<BlobInfo, RepoError>;

    /// Download a blob from the authenticated owner's repository.
    async fn download_blob(
        &self,
        cred: &OwnerCredential,
        content_id: &str,
    ) -> Result<Bytes, RepoError>;
}
