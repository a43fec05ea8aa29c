//! Test double for the remote repository.
//!
//! [`MemoryRepo`] reproduces the semantics the engine depends on: per-owner
//! record scoping, deterministic key sanitization with last-write-wins
//! collisions, server-assigned content ids, and not-found normalization.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use sha2::{Digest, Sha256};

use strand_core::{BlobInfo, OwnerCredential, sanitize_record_key};

use crate::client::{ListedRecord, RecordLocator, RecordPage, RepoClient};
use crate::error::RepoError;

/// In-memory [`RepoClient`] backed by `DashMap`s.
///
/// Blobs are content-addressed with SHA-256 so repeated uploads of the same
/// bytes yield the same content id, as the real store guarantees.
#[derive(Debug, Default)]
pub struct MemoryRepo {
    /// `identifier/collection/rkey` → record body.
    records: DashMap<String, Value>,
    /// content id → (mime type, bytes).
    blobs: DashMap<String, (String, Bytes)>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_path(cred: &OwnerCredential, collection: &str, rkey: &str) -> String {
        format!("{}/{collection}/{rkey}", cred.identifier)
    }

    /// Number of records currently stored, across all owners.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Number of distinct blobs currently stored.
    #[must_use]
    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }
}

fn content_id_for(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("bafk{}", hex::encode(&digest[..16]))
}

#[async_trait]
impl RepoClient for MemoryRepo {
    async fn put_record(
        &self,
        cred: &OwnerCredential,
        key: &str,
        collection: &str,
        value: &Value,
    ) -> Result<RecordLocator, RepoError> {
        let rkey = sanitize_record_key(key);
        let path = Self::record_path(cred, collection, &rkey);
        // Last write wins, including sanitized-key collisions.
        self.records.insert(path, value.clone());
        Ok(RecordLocator {
            uri: format!("at://{}/{collection}/{rkey}", cred.identifier),
            cid: content_id_for(value.to_string().as_bytes()),
        })
    }

    async fn get_record(
        &self,
        cred: &OwnerCredential,
        key: &str,
        collection: &str,
    ) -> Result<Option<Value>, RepoError> {
        let rkey = sanitize_record_key(key);
        let path = Self::record_path(cred, collection, &rkey);
        Ok(self.records.get(&path).map(|r| r.clone()))
    }

    async fn delete_record(
        &self,
        cred: &OwnerCredential,
        key: &str,
        collection: &str,
    ) -> Result<(), RepoError> {
        let rkey = sanitize_record_key(key);
        let path = Self::record_path(cred, collection, &rkey);
        self.records.remove(&path);
        Ok(())
    }

    async fn list_records(
        &self,
        cred: &OwnerCredential,
        collection: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<RecordPage, RepoError> {
        let prefix = format!("{}/{collection}/", cred.identifier);
        let mut entries: Vec<(String, Value)> = self
            .records
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .map(|entry| {
                let rkey = entry.key()[prefix.len()..].to_owned();
                (rkey, entry.value().clone())
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        // Cursor is the last rkey of the previous page.
        let start = match cursor {
            Some(c) => entries.iter().position(|(rkey, _)| rkey.as_str() > c).unwrap_or(entries.len()),
            None => 0,
        };
        let page: Vec<ListedRecord> = entries
            .into_iter()
            .skip(start)
            .take(limit as usize)
            .map(|(rkey, value)| ListedRecord { rkey, value })
            .collect();

        let cursor = (page.len() == limit as usize)
            .then(|| page.last().map(|r| r.rkey.clone()))
            .flatten();
        Ok(RecordPage {
            records: page,
            cursor,
        })
    }

    async fn upload_blob(
        &self,
        _cred: &OwnerCredential,
        bytes: Bytes,
        mime_type: &str,
    ) -> Result<BlobInfo, RepoError> {
        let content_id = content_id_for(&bytes);
        let size = bytes.len() as u64;
        self.blobs
            .insert(content_id.clone(), (mime_type.to_owned(), bytes));
        Ok(BlobInfo {
            content_id,
            mime_type: mime_type.to_owned(),
            size,
            uploaded_at: Utc::now(),
        })
    }

    async fn download_blob(
        &self,
        _cred: &OwnerCredential,
        content_id: &str,
    ) -> Result<Bytes, RepoError> {
        self.blobs
            .get(content_id)
            .map(|entry| entry.value().1.clone())
            .ok_or_else(|| RepoError::NotFound(format!("blob {content_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cred() -> OwnerCredential {
        OwnerCredential::new("alice.example.com", "app-password")
    }

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let repo = MemoryRepo::new();
        let value = serde_json::json!({"key": "logo"});

        repo.put_record(&cred(), "logo", "dev.strand.mapping", &value)
            .await
            .unwrap();
        let got = repo
            .get_record(&cred(), "logo", "dev.strand.mapping")
            .await
            .unwrap();
        assert_eq!(got, Some(value));

        repo.delete_record(&cred(), "logo", "dev.strand.mapping")
            .await
            .unwrap();
        let got = repo
            .get_record(&cred(), "logo", "dev.strand.mapping")
            .await
            .unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn sanitized_collision_is_last_write_wins() {
        let repo = MemoryRepo::new();
        let first = serde_json::json!({"v": 1});
        let second = serde_json::json!({"v": 2});

        repo.put_record(&cred(), "MyFile.TXT", "c", &first)
            .await
            .unwrap();
        repo.put_record(&cred(), "myfile.txt", "c", &second)
            .await
            .unwrap();

        let got = repo.get_record(&cred(), "MyFile.TXT", "c").await.unwrap();
        assert_eq!(got, Some(second));
        assert_eq!(repo.record_count(), 1);
    }

    #[tokio::test]
    async fn blob_upload_is_content_addressed() {
        let repo = MemoryRepo::new();
        let bytes = Bytes::from_static(b"same bytes");

        let a = repo
            .upload_blob(&cred(), bytes.clone(), "text/plain")
            .await
            .unwrap();
        let b = repo
            .upload_blob(&cred(), bytes.clone(), "text/plain")
            .await
            .unwrap();
        assert_eq!(a.content_id, b.content_id);
        assert_eq!(a.size, 10);
        assert_eq!(repo.blob_count(), 1);

        let downloaded = repo.download_blob(&cred(), &a.content_id).await.unwrap();
        assert_eq!(downloaded, bytes);
    }

    #[tokio::test]
    async fn download_missing_blob_is_not_found() {
        let repo = MemoryRepo::new();
        let err = repo.download_blob(&cred(), "bafkmissing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn list_records_paginates() {
        let repo = MemoryRepo::new();
        for i in 0..5 {
            let value = serde_json::json!({"i": i});
            repo.put_record(&cred(), &format!("key-{i}"), "c", &value)
                .await
                .unwrap();
        }

        let page1 = repo.list_records(&cred(), "c", 2, None).await.unwrap();
        assert_eq!(page1.records.len(), 2);
        let cursor = page1.cursor.expect("more pages");

        let page2 = repo
            .list_records(&cred(), "c", 2, Some(&cursor))
            .await
            .unwrap();
        assert_eq!(page2.records.len(), 2);
        assert_ne!(page1.records[0].rkey, page2.records[0].rkey);

        let cursor = page2.cursor.expect("more pages");
        let page3 = repo
            .list_records(&cred(), "c", 2, Some(&cursor))
            .await
            .unwrap();
        assert_eq!(page3.records.len(), 1);
        assert!(page3.cursor.is_none());
    }
}
