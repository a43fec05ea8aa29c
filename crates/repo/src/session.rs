use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// An authenticated session with one owner's PDS.
#[derive(Debug, Clone)]
pub struct Session {
    /// The owner's resolved DID.
    pub did: String,
    /// Base URL of the PDS serving this owner.
    pub endpoint: String,
    /// Bearer token for subsequent calls.
    pub access_jwt: String,
    /// When this session stops being reusable.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session has passed its expiry deadline.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Explicit store of live sessions, keyed by owner-credential identifier.
///
/// Expiry is checked before every reuse; expired entries are dropped on
/// read. Sessions are also invalidated reactively when the server rejects a
/// token. This replaces any hidden per-module session global.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    ttl: Duration,
}

impl SessionStore {
    /// Create a store whose sessions live for `ttl` after creation.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Return the live session for `identifier`, dropping it if expired.
    #[must_use]
    pub fn get_live(&self, identifier: &str) -> Option<Session> {
        if let Some(session) = self.sessions.get(identifier) {
            if !session.is_expired() {
                return Some(session.clone());
            }
        }
        self.sessions
            .remove_if(identifier, |_, session| session.is_expired());
        None
    }

    /// Store a freshly created session, stamping its expiry.
    pub fn insert(&self, identifier: impl Into<String>, mut session: Session) -> Session {
        session.expires_at = Utc::now()
            + chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
        self.sessions.insert(identifier.into(), session.clone());
        session
    }

    /// Drop the session for `identifier`, forcing a re-login on next use.
    pub fn invalidate(&self, identifier: &str) {
        self.sessions.remove(identifier);
    }

    /// Number of live-or-expired sessions currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(jwt: &str) -> Session {
        Session {
            did: "did:plc:abc".into(),
            endpoint: "https://pds.example".into(),
            access_jwt: jwt.into(),
            expires_at: Utc::now(),
        }
    }

    #[test]
    fn insert_then_get_live() {
        let store = SessionStore::new(Duration::from_secs(3600));
        store.insert("alice.example.com", session("jwt-1"));

        let live = store.get_live("alice.example.com").expect("session");
        assert_eq!(live.access_jwt, "jwt-1");
    }

    #[test]
    fn expired_sessions_are_dropped_on_read() {
        let store = SessionStore::new(Duration::ZERO);
        store.insert("alice.example.com", session("jwt-1"));

        assert!(store.get_live("alice.example.com").is_none());
        assert!(store.is_empty(), "expired entry should be removed");
    }

    #[test]
    fn invalidate_forces_relogin() {
        let store = SessionStore::new(Duration::from_secs(3600));
        store.insert("alice.example.com", session("jwt-1"));
        store.invalidate("alice.example.com");
        assert!(store.get_live("alice.example.com").is_none());
    }
}
