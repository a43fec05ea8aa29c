use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::blob::{BlobInfo, BlobVersion};

/// The per-key document binding a human-chosen key to current and historical
/// blobs.
///
/// Invariants: `current` always reflects the latest accepted upload; when
/// `versions` is present it is a superset of every previously-current
/// [`BlobInfo`], each keyed by the RFC 3339 timestamp at which it was
/// superseded. The `BTreeMap` keeps versions in lexical order, which for
/// timestamp keys is chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRecord {
    /// The owner-scoped, user-facing key.
    pub key: String,
    /// The blob currently served for this key.
    pub current: BlobInfo,
    /// Archived prior blobs, keyed by supersession timestamp. Present only
    /// when versioning has been enabled for this key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versions: Option<BTreeMap<String, BlobVersion>>,
    /// When the record was first created.
    pub created_at: DateTime<Utc>,
    /// When the record was last mutated.
    pub updated_at: DateTime<Utc>,
    /// Whether uploads to this key archive the previous blob.
    #[serde(default)]
    pub versioning_enabled: bool,
}

impl MappingRecord {
    /// Create a fresh record for a first upload.
    #[must_use]
    pub fn new(key: impl Into<String>, current: BlobInfo, versioning_enabled: bool) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            current,
            versions: versioning_enabled.then(BTreeMap::new),
            created_at: now,
            updated_at: now,
            versioning_enabled,
        }
    }

    /// Number of archived versions (zero when versioning is disabled).
    #[must_use]
    pub fn version_count(&self) -> usize {
        self.versions.as_ref().map_or(0, BTreeMap::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(id: &str) -> BlobInfo {
        BlobInfo {
            content_id: id.into(),
            mime_type: "application/octet-stream".into(),
            size: 1,
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn new_record_with_versioning_has_empty_map() {
        let record = MappingRecord::new("logo", blob("b1"), true);
        assert!(record.versioning_enabled);
        assert_eq!(record.version_count(), 0);
        assert!(record.versions.is_some());
    }

    #[test]
    fn new_record_without_versioning_omits_map() {
        let record = MappingRecord::new("logo", blob("b1"), false);
        assert!(record.versions.is_none());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("versions").is_none());
    }

    #[test]
    fn round_trips_through_json() {
        let record = MappingRecord::new("logo", blob("b1"), true);
        let json = serde_json::to_string(&record).unwrap();
        let back: MappingRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.key, "logo");
        assert_eq!(back.current.content_id, "b1");
        assert!(back.versioning_enabled);
    }
}
