use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{OwnerHandle, OwnerId};

/// Maximum length of a registered domain name.
pub const MAX_DOMAIN_LEN: usize = 253;

/// Lifecycle status of a domain mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainStatus {
    Active,
    Pending,
    Suspended,
}

/// Per-domain serving policy, enforced by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainSettings {
    /// Whether unauthenticated reads are allowed for this domain.
    pub public_access: bool,
    /// Allowed MIME types for uploads routed through this domain; `None`
    /// allows any type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_mime_types: Option<Vec<String>>,
    /// Maximum upload size in bytes; `None` means unlimited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<u64>,
}

impl Default for DomainSettings {
    fn default() -> Self {
        Self {
            public_access: true,
            allowed_mime_types: None,
            max_file_size: None,
        }
    }
}

impl DomainSettings {
    /// Whether an upload with the given MIME type and size is allowed.
    #[must_use]
    pub fn permits(&self, mime_type: &str, size: u64) -> bool {
        if let Some(max) = self.max_file_size {
            if size > max {
                return false;
            }
        }
        match &self.allowed_mime_types {
            Some(allowed) => allowed.iter().any(|m| m.eq_ignore_ascii_case(mime_type)),
            None => true,
        }
    }
}

/// Binding of a public domain name to the principal and endpoint that serve
/// it.
///
/// Invariant: at most one mapping exists per domain across all owners; the
/// registry enforces this at registration time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainMapping {
    /// The public domain name, globally unique.
    pub domain: String,
    /// Handle of the owning principal.
    pub owner_handle: OwnerHandle,
    /// Stable identity of the owning principal.
    pub owner_id: OwnerId,
    pub status: DomainStatus,
    pub settings: DomainSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Why a domain name was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("domain is empty")]
    Empty,

    #[error("domain is {len} chars, maximum is {MAX_DOMAIN_LEN}")]
    TooLong { len: usize },

    #[error("domain must have at least two labels")]
    TooFewLabels,

    #[error("invalid domain label {0:?}")]
    BadLabel(String),
}

/// Validate a domain name: lower-case DNS syntax, at least two labels, each
/// label 1-63 chars of `[a-z0-9-]` with no leading or trailing hyphen.
pub fn validate_domain(domain: &str) -> Result<(), DomainError> {
    if domain.is_empty() {
        return Err(DomainError::Empty);
    }
    if domain.len() > MAX_DOMAIN_LEN {
        return Err(DomainError::TooLong { len: domain.len() });
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(DomainError::TooFewLabels);
    }
    for label in labels {
        let ok = !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !ok {
            return Err(DomainError::BadLabel(label.to_owned()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_domains() {
        assert_eq!(validate_domain("files.example.com"), Ok(()));
        assert_eq!(validate_domain("a-1.b2.co"), Ok(()));
    }

    #[test]
    fn rejects_bad_domains() {
        assert_eq!(validate_domain(""), Err(DomainError::Empty));
        assert_eq!(validate_domain("localhost"), Err(DomainError::TooFewLabels));
        assert_eq!(
            validate_domain("-bad.example.com"),
            Err(DomainError::BadLabel("-bad".into()))
        );
        assert_eq!(
            validate_domain("Caps.example.com"),
            Err(DomainError::BadLabel("Caps".into()))
        );
        assert_eq!(
            validate_domain("a..com"),
            Err(DomainError::BadLabel(String::new()))
        );
    }

    #[test]
    fn rejects_overlong_domain() {
        let long = format!("{}.com", "a".repeat(251));
        assert!(matches!(
            validate_domain(&long),
            Err(DomainError::TooLong { .. })
        ));
    }

    #[test]
    fn default_settings_permit_everything() {
        let settings = DomainSettings::default();
        assert!(settings.permits("image/png", u64::MAX));
    }

    #[test]
    fn settings_enforce_mime_and_size() {
        let settings = DomainSettings {
            public_access: true,
            allowed_mime_types: Some(vec!["image/png".into(), "image/jpeg".into()]),
            max_file_size: Some(1024),
        };
        assert!(settings.permits("IMAGE/PNG", 1024));
        assert!(!settings.permits("image/png", 1025));
        assert!(!settings.permits("text/html", 10));
    }
}
