use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One physical, content-addressed blob instance.
///
/// Immutable once created: the remote repository assigns the content id and
/// the size on upload, and the same bytes always yield the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobInfo {
    /// Opaque, content-derived identifier assigned by the remote repository.
    pub content_id: String,
    /// MIME content type (e.g. `"image/png"`).
    pub mime_type: String,
    /// Size in bytes, as reported by the remote repository.
    pub size: u64,
    /// When the blob was uploaded.
    pub uploaded_at: DateTime<Utc>,
}

/// An archived prior state of a mapping: a blob plus the moment it was
/// superseded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobVersion {
    #[serde(flatten)]
    pub blob: BlobInfo,
    /// RFC 3339 timestamp at which this blob stopped being current.
    pub version_id: String,
    /// Optional free-form comment supplied at upload time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_serializes_flattened() {
        let version = BlobVersion {
            blob: BlobInfo {
                content_id: "bafyabc".into(),
                mime_type: "text/plain".into(),
                size: 12,
                uploaded_at: Utc::now(),
            },
            version_id: "2026-01-02T03:04:05.678Z".into(),
            comment: None,
        };
        let json = serde_json::to_value(&version).unwrap();
        assert_eq!(json["contentId"], "bafyabc");
        assert_eq!(json["versionId"], "2026-01-02T03:04:05.678Z");
        assert!(json.get("comment").is_none());
    }
}
