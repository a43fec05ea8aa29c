use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use tracing::{debug, instrument, warn};

use strand_cache::CacheStore;
use strand_core::{
    BlobInfo, BlobVersion, MappingRecord, OwnerCredential, OwnerId, validate_mapping_key,
};
use strand_repo::RepoClient;

use crate::cache::{MappingCache, Resolved, Source};
use crate::config::{EngineConfig, MAX_LIST_LIMIT};
use crate::delegate::{AccessContext, ReadDelegate};
use crate::error::EngineError;

/// One upload: the bytes, how to label them, and whether to start
/// archiving.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub key: String,
    pub bytes: Bytes,
    pub mime_type: String,
    /// Free-form note attached to the version archived by this upload.
    pub comment: Option<String>,
    /// Turn versioning on for this key. `None` keeps the record's current
    /// setting; versioning, once enabled, stays enabled.
    pub enable_versioning: Option<bool>,
}

impl UploadRequest {
    pub fn new(key: impl Into<String>, bytes: Bytes, mime_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            bytes,
            mime_type: mime_type.into(),
            comment: None,
            enable_versioning: None,
        }
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    #[must_use]
    pub fn with_versioning(mut self, enabled: bool) -> Self {
        self.enable_versioning = Some(enabled);
        self
    }
}

/// What an accepted upload produced.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub key: String,
    pub content_id: String,
    pub size: u64,
    pub mime_type: String,
    /// Version id under which the previous blob was archived, when this
    /// upload superseded a versioned record.
    pub version_id: Option<String>,
    /// Whether this upload created the mapping (vs. updating an existing
    /// one). Purely a response distinction.
    pub created: bool,
}

/// A blob resolved for serving: content, metadata, and which path produced
/// the lookup.
#[derive(Debug, Clone)]
pub struct ResolvedBlob {
    pub info: BlobInfo,
    pub bytes: Bytes,
    pub source: Source,
}

/// One row of a version listing.
#[derive(Debug, Clone)]
pub struct VersionEntry {
    pub blob: BlobInfo,
    /// `None` for the current blob.
    pub version_id: Option<String>,
    pub comment: Option<String>,
    pub current: bool,
}

/// A page of an owner's mappings.
#[derive(Debug, Clone, Default)]
pub struct MappingPage {
    pub mappings: Vec<MappingRecord>,
    pub cursor: Option<String>,
}

/// The Mapping & Versioning Engine.
///
/// Stateless per request: collaborators are injected once at construction
/// and shared. There is deliberately no per-(owner, key) mutual exclusion;
/// two concurrent uploads to the same key can both archive the same current
/// blob, and the remote store's last-write-wins record semantics keep
/// whichever write lands last. That loses one archived version, never
/// stored bytes.
pub struct MappingEngine {
    repo: Arc<dyn RepoClient>,
    cache: MappingCache,
    config: EngineConfig,
    delegate: Option<Arc<dyn ReadDelegate>>,
}

impl MappingEngine {
    pub fn new(
        repo: Arc<dyn RepoClient>,
        cache_store: Arc<dyn CacheStore>,
        config: EngineConfig,
    ) -> Self {
        let cache = MappingCache::new(cache_store, config.clone());
        Self {
            repo,
            cache,
            config,
            delegate: None,
        }
    }

    /// Attach the read-delegation source used for public access.
    #[must_use]
    pub fn with_delegate(mut self, delegate: Arc<dyn ReadDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// Resolve the credential an access context may read with.
    fn credential_for(&self, access: &AccessContext) -> Result<OwnerCredential, EngineError> {
        match access {
            AccessContext::Owner { credential, .. } => Ok(credential.clone()),
            AccessContext::Public { owner } => self
                .delegate
                .as_ref()
                .and_then(|d| d.delegation_for(owner))
                .ok_or_else(|| EngineError::NoReadDelegation(owner.clone())),
        }
    }

    /// Cache-aside read of the mapping record for (owner, key).
    async fn read_record(
        &self,
        cred: &OwnerCredential,
        owner: &OwnerId,
        key: &str,
    ) -> Result<Option<Resolved<MappingRecord>>, EngineError> {
        if let Some(record) = self.cache.get_record(owner, key).await {
            return Ok(Some(Resolved {
                source: Source::Cache,
                value: record,
            }));
        }

        let Some(value) = self
            .repo
            .get_record(cred, key, &self.config.collection)
            .await?
        else {
            return Ok(None);
        };

        let record: MappingRecord = serde_json::from_value(value)
            .map_err(|e| EngineError::Remote(format!("malformed mapping record: {e}")))?;
        self.cache.put_record(owner, key, &record).await;
        Ok(Some(Resolved {
            source: Source::Authoritative,
            value: record,
        }))
    }

    /// Persist a record and refresh its cache entries. The cache refresh
    /// happens before success is reported, so this node never serves the
    /// superseded state afterwards.
    async fn store_record(
        &self,
        cred: &OwnerCredential,
        owner: &OwnerId,
        record: &MappingRecord,
    ) -> Result<(), EngineError> {
        let value = serde_json::to_value(record)
            .map_err(|e| EngineError::Remote(format!("mapping record serialization: {e}")))?;
        self.repo
            .put_record(cred, &record.key, &self.config.collection, &value)
            .await?;
        self.cache.put_record(owner, &record.key, record).await;
        self.cache
            .put_blob_meta(owner, &record.key, &record.current)
            .await;
        Ok(())
    }

    /// Upload bytes under a key, creating or updating its mapping record.
    #[instrument(name = "engine.upload", skip_all, fields(%owner, key = %request.key))]
    pub async fn upload(
        &self,
        cred: &OwnerCredential,
        owner: &OwnerId,
        request: UploadRequest,
    ) -> Result<UploadOutcome, EngineError> {
        validate_mapping_key(&request.key)?;

        let existing = self
            .read_record(cred, owner, &request.key)
            .await?
            .map(|resolved| resolved.value);
        let should_version = request.enable_versioning.unwrap_or(false)
            || existing.as_ref().is_some_and(|r| r.versioning_enabled);

        let blob = self
            .repo
            .upload_blob(cred, request.bytes, &request.mime_type)
            .await?;
        debug!(content_id = %blob.content_id, size = blob.size, "blob uploaded");

        let now = Utc::now();
        let (record, version_id, created) = match existing {
            None => (
                MappingRecord::new(request.key.clone(), blob.clone(), should_version),
                None,
                true,
            ),
            Some(mut record) if should_version => {
                let version_id = now.to_rfc3339_opts(SecondsFormat::Millis, true);
                let archived = BlobVersion {
                    blob: record.current.clone(),
                    version_id: version_id.clone(),
                    comment: request.comment.clone(),
                };
                // Version key is the supersession timestamp, not a counter:
                // lexical order is chronological order, and two supersessions
                // within one millisecond collide last-write-wins.
                record
                    .versions
                    .get_or_insert_with(BTreeMap::new)
                    .insert(version_id.clone(), archived);
                record.current = blob.clone();
                record.versioning_enabled = true;
                record.updated_at = now;
                (record, Some(version_id), false)
            }
            Some(mut record) => {
                record.current = blob.clone();
                record.updated_at = now;
                (record, None, false)
            }
        };

        self.store_record(cred, owner, &record).await?;

        Ok(UploadOutcome {
            key: request.key,
            content_id: blob.content_id,
            size: blob.size,
            mime_type: blob.mime_type,
            version_id,
            created,
        })
    }

    /// Resolve a key (optionally a specific archived version) to its bytes
    /// and metadata.
    #[instrument(name = "engine.get", skip_all, fields(owner = %access.owner(), key))]
    pub async fn get(
        &self,
        access: &AccessContext,
        key: &str,
        version: Option<&str>,
    ) -> Result<ResolvedBlob, EngineError> {
        let owner = access.owner().clone();
        let cred = self.credential_for(access)?;

        // The metadata cache can satisfy current-blob lookups without the
        // record; versioned reads always resolve through the record.
        if version.is_none() {
            if let Some(info) = self.cache.get_blob_meta(&owner, key).await {
                let bytes = self.repo.download_blob(&cred, &info.content_id).await?;
                return Ok(ResolvedBlob {
                    info,
                    bytes,
                    source: Source::Cache,
                });
            }
        }

        let resolved = self
            .read_record(&cred, &owner, key)
            .await?
            .ok_or_else(|| EngineError::BlobNotFound(key.to_owned()))?;

        let info = match version {
            Some(version_id) => resolved
                .value
                .versions
                .as_ref()
                .and_then(|versions| versions.get(version_id))
                .map(|archived| archived.blob.clone())
                .ok_or_else(|| EngineError::VersionNotFound {
                    key: key.to_owned(),
                    version: version_id.to_owned(),
                })?,
            None => {
                let info = resolved.value.current.clone();
                self.cache.put_blob_meta(&owner, key, &info).await;
                info
            }
        };

        let bytes = self.repo.download_blob(&cred, &info.content_id).await?;
        Ok(ResolvedBlob {
            info,
            bytes,
            source: resolved.source,
        })
    }

    /// All versions of a key: the current blob plus every archived one,
    /// newest upload first; ties keep their original order.
    #[instrument(name = "engine.list_versions", skip_all, fields(%owner, key))]
    pub async fn list_versions(
        &self,
        cred: &OwnerCredential,
        owner: &OwnerId,
        key: &str,
    ) -> Result<Vec<VersionEntry>, EngineError> {
        let record = self
            .read_record(cred, owner, key)
            .await?
            .ok_or_else(|| EngineError::BlobNotFound(key.to_owned()))?
            .value;

        let mut entries = vec![VersionEntry {
            blob: record.current.clone(),
            version_id: None,
            comment: None,
            current: true,
        }];
        if let Some(versions) = &record.versions {
            for (version_id, archived) in versions {
                entries.push(VersionEntry {
                    blob: archived.blob.clone(),
                    version_id: Some(version_id.clone()),
                    comment: archived.comment.clone(),
                    current: false,
                });
            }
        }
        // Stable sort: equal timestamps keep their original order.
        entries.sort_by(|a, b| b.blob.uploaded_at.cmp(&a.blob.uploaded_at));
        Ok(entries)
    }

    /// Delete one archived version, or the whole mapping when `version` is
    /// `None`. Cache entries for the key are dropped before success is
    /// reported.
    #[instrument(name = "engine.delete_blob", skip_all, fields(%owner, key, version))]
    pub async fn delete_blob(
        &self,
        cred: &OwnerCredential,
        owner: &OwnerId,
        key: &str,
        version: Option<&str>,
    ) -> Result<(), EngineError> {
        match version {
            Some(version_id) => {
                let mut record = self
                    .read_record(cred, owner, key)
                    .await?
                    .ok_or_else(|| EngineError::BlobNotFound(key.to_owned()))?
                    .value;

                let removed = record
                    .versions
                    .as_mut()
                    .and_then(|versions| versions.remove(version_id));
                if removed.is_none() {
                    return Err(EngineError::VersionNotFound {
                        key: key.to_owned(),
                        version: version_id.to_owned(),
                    });
                }
                record.updated_at = Utc::now();
                self.store_record(cred, owner, &record).await
            }
            None => {
                self.repo
                    .delete_record(cred, key, &self.config.collection)
                    .await?;
                self.cache.remove_key(owner, key).await;
                Ok(())
            }
        }
    }

    /// Enumerate an owner's mappings, straight from the adapter.
    ///
    /// Never cached: freshness matters more than latency for enumeration.
    #[instrument(name = "engine.list", skip_all, fields(limit, cursor))]
    pub async fn list(
        &self,
        cred: &OwnerCredential,
        limit: Option<u32>,
        cursor: Option<&str>,
    ) -> Result<MappingPage, EngineError> {
        let limit = limit
            .unwrap_or(self.config.default_list_limit)
            .clamp(1, MAX_LIST_LIMIT);

        let page = self
            .repo
            .list_records(cred, &self.config.collection, limit, cursor)
            .await?;

        let mut mappings = Vec::with_capacity(page.records.len());
        for listed in page.records {
            match serde_json::from_value::<MappingRecord>(listed.value) {
                Ok(record) => mappings.push(record),
                Err(e) => {
                    warn!(rkey = %listed.rkey, error = %e, "skipping malformed record in listing");
                }
            }
        }
        Ok(MappingPage {
            mappings,
            cursor: page.cursor,
        })
    }

    /// Drop every cache entry the engine holds for an owner.
    pub async fn invalidate_owner(&self, owner: &OwnerId) {
        self.cache.invalidate_owner(owner).await;
    }
}
