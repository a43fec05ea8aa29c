use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Stable identity of a principal in the remote repository protocol (a DID).
///
/// Owner ids never change, unlike handles, and are the scope under which
/// mapping records and cache entries live.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OwnerId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for OwnerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Human-readable, dotted handle of a principal (e.g. `alice.example.com`).
///
/// Handles can be re-pointed at a different identity over time; they are
/// used for display and for the PDS endpoint heuristic, never as a scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerHandle(String);

impl OwnerHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OwnerHandle {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for OwnerHandle {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for OwnerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Credential an owner presents to act on their own repository.
///
/// The password is wrapped in [`SecretString`] so it never appears in
/// `Debug` output or log lines; it is exposed only at the login call site.
#[derive(Debug, Clone)]
pub struct OwnerCredential {
    /// Login identifier: a handle or a DID.
    pub identifier: String,
    /// App password for the remote repository.
    pub password: SecretString,
}

impl OwnerCredential {
    pub fn new(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            password: SecretString::new(password.into()),
        }
    }
}
