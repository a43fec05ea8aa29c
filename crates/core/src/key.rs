use thiserror::Error;

/// Maximum length of a user-facing mapping key.
pub const MAX_MAPPING_KEY_LEN: usize = 255;

/// Maximum length of a sanitized record key in the remote repository.
pub const MAX_RECORD_KEY_LEN: usize = 64;

/// Why a mapping key was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("key is empty")]
    Empty,

    #[error("key is {len} chars, maximum is {MAX_MAPPING_KEY_LEN}")]
    TooLong { len: usize },

    #[error("key contains forbidden character {0:?}")]
    ForbiddenCharacter(char),
}

/// Validate a user-facing mapping key.
///
/// Keys must be non-empty, at most [`MAX_MAPPING_KEY_LEN`] characters, and
/// free of control characters and `/`. Anything else is allowed; the stored
/// record key is derived separately via [`sanitize_record_key`].
pub fn validate_mapping_key(key: &str) -> Result<(), KeyError> {
    if key.is_empty() {
        return Err(KeyError::Empty);
    }
    let len = key.chars().count();
    if len > MAX_MAPPING_KEY_LEN {
        return Err(KeyError::TooLong { len });
    }
    if let Some(c) = key.chars().find(|c| c.is_control() || *c == '/') {
        return Err(KeyError::ForbiddenCharacter(c));
    }
    Ok(())
}

/// Derive the record key stored in the remote repository from a mapping key.
///
/// Lower-cases, replaces every character outside `[a-z0-9.-]` with `-`,
/// trims leading and trailing `-`, and truncates to [`MAX_RECORD_KEY_LEN`]
/// characters. Deterministic but **not** collision-free: distinct input keys
/// may sanitize to the same record key, and the remote store resolves such
/// collisions last-write-wins.
#[must_use]
pub fn sanitize_record_key(key: &str) -> String {
    let sanitized: String = key
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();

    sanitized
        .trim_matches('-')
        .chars()
        .take(MAX_RECORD_KEY_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_keys() {
        assert_eq!(validate_mapping_key("logo"), Ok(()));
        assert_eq!(validate_mapping_key("My File (v2).png"), Ok(()));
        assert_eq!(validate_mapping_key(&"k".repeat(255)), Ok(()));
    }

    #[test]
    fn rejects_empty_key() {
        assert_eq!(validate_mapping_key(""), Err(KeyError::Empty));
    }

    #[test]
    fn rejects_overlong_key() {
        let key = "k".repeat(256);
        assert_eq!(validate_mapping_key(&key), Err(KeyError::TooLong { len: 256 }));
    }

    #[test]
    fn rejects_control_chars_and_slash() {
        assert_eq!(
            validate_mapping_key("a\nb"),
            Err(KeyError::ForbiddenCharacter('\n'))
        );
        assert_eq!(
            validate_mapping_key("a/b"),
            Err(KeyError::ForbiddenCharacter('/'))
        );
    }

    #[test]
    fn sanitize_lowercases_and_replaces() {
        assert_eq!(sanitize_record_key("My File (v2).PNG"), "my-file--v2-.png");
    }

    #[test]
    fn sanitize_trims_and_truncates() {
        assert_eq!(sanitize_record_key("--hello--"), "hello");
        let long = "a".repeat(100);
        assert_eq!(sanitize_record_key(&long).len(), MAX_RECORD_KEY_LEN);
    }

    // Sanitization is deterministic but deliberately not collision-free:
    // distinct inputs may map to the same record key.
    #[test]
    fn sanitize_documented_collision() {
        assert_eq!(
            sanitize_record_key("MyFile.TXT"),
            sanitize_record_key("myfile.txt")
        );
    }

    #[test]
    fn sanitize_all_forbidden_yields_empty() {
        assert_eq!(sanitize_record_key("???"), "");
    }
}
