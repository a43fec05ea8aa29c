use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use strand_core::{BlobInfo, OwnerCredential, OwnerHandle, pds_endpoint_for, sanitize_record_key};

use crate::client::{ListedRecord, RecordLocator, RecordPage, RepoClient};
use crate::error::RepoError;
use crate::session::{Session, SessionStore};

/// Configuration for the PDS adapter.
#[derive(Debug, Clone)]
pub struct PdsConfig {
    /// Endpoint used when an owner's handle does not imply one.
    pub default_endpoint: String,

    /// Bounded deadline for each remote call; expiry surfaces as a remote
    /// error.
    pub request_timeout: Duration,

    /// How long a created session is reused before a fresh login.
    pub session_ttl: Duration,
}

impl Default for PdsConfig {
    fn default() -> Self {
        Self {
            default_endpoint: String::from("https://bsky.social"),
            request_timeout: Duration::from_secs(30),
            session_ttl: Duration::from_secs(3600),
        }
    }
}

/// Shape of an XRPC error body.
#[derive(Debug, Default, Deserialize)]
struct XrpcError {
    error: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    did: String,
    access_jwt: String,
}

#[derive(Debug, Deserialize)]
struct GetRecordResponse {
    value: Value,
}

#[derive(Debug, Deserialize)]
struct ListRecordsResponse {
    records: Vec<ListRecordsEntry>,
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListRecordsEntry {
    uri: String,
    value: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadBlobResponse {
    blob: BlobRef,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlobRef {
    #[serde(rename = "ref")]
    link: BlobLink,
    mime_type: String,
    size: u64,
}

#[derive(Debug, Deserialize)]
struct BlobLink {
    #[serde(rename = "$link")]
    cid: String,
}

/// Classify a non-success XRPC response.
///
/// Rejected tokens become `AuthenticationFailed` (which triggers one
/// re-login), any response recognizable as "record not found" is normalized
/// to `NotFound`, and everything else is a `Remote` error.
fn normalize_error(status: StatusCode, body: &XrpcError) -> RepoError {
    let code = body.error.as_deref().unwrap_or("");
    let message = body.message.as_deref().unwrap_or("");

    if status == StatusCode::UNAUTHORIZED
        || code == "ExpiredToken"
        || code == "InvalidToken"
        || code == "AuthenticationRequired"
    {
        return RepoError::AuthenticationFailed;
    }

    let lowered = message.to_lowercase();
    if code == "RecordNotFound"
        || code == "BlobNotFound"
        || lowered.contains("not found")
        || lowered.contains("could not locate")
    {
        return RepoError::NotFound(if message.is_empty() {
            code.to_owned()
        } else {
            message.to_owned()
        });
    }

    RepoError::Remote(format!("{status}: {code} {message}"))
}

/// Turn a non-success response into the matching [`RepoError`].
async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, RepoError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body: XrpcError = resp.json().await.unwrap_or_default();
    Err(normalize_error(status, &body))
}

/// XRPC client for per-owner personal data servers.
///
/// Authentication happens per call through the explicit [`SessionStore`]: a
/// session is created on first use and recreated when absent, expired, or
/// rejected by the server. A rejected token is retried exactly once after a
/// fresh login; no other retries happen at this layer.
pub struct PdsClient {
    http: Client,
    config: PdsConfig,
    sessions: SessionStore,
}

impl PdsClient {
    /// Create a new client with its own HTTP connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Remote`] if the HTTP client cannot be built.
    pub fn new(config: PdsConfig) -> Result<Self, RepoError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RepoError::Remote(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(config, http))
    }

    /// Create a client over an existing `reqwest::Client`.
    ///
    /// Useful for sharing a connection pool or injecting a test transport.
    pub fn with_client(config: PdsConfig, http: Client) -> Self {
        let sessions = SessionStore::new(config.session_ttl);
        Self {
            http,
            config,
            sessions,
        }
    }

    /// The session store, exposed for observability in tests.
    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Reuse the live session for this owner or log in to create one.
    async fn ensure_session(&self, cred: &OwnerCredential) -> Result<Session, RepoError> {
        if let Some(session) = self.sessions.get_live(&cred.identifier) {
            return Ok(session);
        }
        self.login(cred).await
    }

    /// Create a fresh session via `com.atproto.server.createSession`.
    async fn login(&self, cred: &OwnerCredential) -> Result<Session, RepoError> {
        let endpoint = pds_endpoint_for(
            &OwnerHandle::new(cred.identifier.clone()),
            &self.config.default_endpoint,
        );
        debug!(identifier = %cred.identifier, %endpoint, "creating PDS session");

        let resp = self
            .http
            .post(format!("{endpoint}/xrpc/com.atproto.server.createSession"))
            .json(&serde_json::json!({
                "identifier": cred.identifier,
                "password": cred.password.expose_secret(),
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            debug!(identifier = %cred.identifier, status = %resp.status(), "login rejected");
            return Err(RepoError::AuthenticationFailed);
        }

        let body: CreateSessionResponse = resp
            .json()
            .await
            .map_err(|e| RepoError::Serialization(format!("createSession response: {e}")))?;

        let session = Session {
            did: body.did,
            endpoint,
            access_jwt: body.access_jwt,
            expires_at: Utc::now(),
        };
        Ok(self.sessions.insert(cred.identifier.clone(), session))
    }

    async fn do_put_record(
        &self,
        session: &Session,
        collection: &str,
        rkey: &str,
        value: &Value,
    ) -> Result<RecordLocator, RepoError> {
        let resp = self
            .http
            .post(format!(
                "{}/xrpc/com.atproto.repo.putRecord",
                session.endpoint
            ))
            .bearer_auth(&session.access_jwt)
            .json(&serde_json::json!({
                "repo": session.did,
                "collection": collection,
                "rkey": rkey,
                "record": value,
            }))
            .send()
            .await?;
        let resp = check_response(resp).await?;
        resp.json()
            .await
            .map_err(|e| RepoError::Serialization(format!("putRecord response: {e}")))
    }

    async fn do_get_record(
        &self,
        session: &Session,
        collection: &str,
        rkey: &str,
    ) -> Result<Value, RepoError> {
        let resp = self
            .http
            .get(format!(
                "{}/xrpc/com.atproto.repo.getRecord",
                session.endpoint
            ))
            .bearer_auth(&session.access_jwt)
            .query(&[
                ("repo", session.did.as_str()),
                ("collection", collection),
                ("rkey", rkey),
            ])
            .send()
            .await?;
        let resp = check_response(resp).await?;
        let body: GetRecordResponse = resp
            .json()
            .await
            .map_err(|e| RepoError::Serialization(format!("getRecord response: {e}")))?;
        Ok(body.value)
    }

    async fn do_delete_record(
        &self,
        session: &Session,
        collection: &str,
        rkey: &str,
    ) -> Result<(), RepoError> {
        let resp = self
            .http
            .post(format!(
                "{}/xrpc/com.atproto.repo.deleteRecord",
                session.endpoint
            ))
            .bearer_auth(&session.access_jwt)
            .json(&serde_json::json!({
                "repo": session.did,
                "collection": collection,
                "rkey": rkey,
            }))
            .send()
            .await?;
        check_response(resp).await?;
        Ok(())
    }

    async fn do_list_records(
        &self,
        session: &Session,
        collection: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<RecordPage, RepoError> {
        let mut request = self
            .http
            .get(format!(
                "{}/xrpc/com.atproto.repo.listRecords",
                session.endpoint
            ))
            .bearer_auth(&session.access_jwt)
            .query(&[
                ("repo", session.did.as_str()),
                ("collection", collection),
                ("limit", &limit.to_string()),
            ]);
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }

        let resp = check_response(request.send().await?).await?;
        let body: ListRecordsResponse = resp
            .json()
            .await
            .map_err(|e| RepoError::Serialization(format!("listRecords response: {e}")))?;

        let records = body
            .records
            .into_iter()
            .map(|entry| {
                let rkey = entry
                    .uri
                    .rsplit('/')
                    .next()
                    .unwrap_or_default()
                    .to_owned();
                ListedRecord {
                    rkey,
                    value: entry.value,
                }
            })
            .collect();
        Ok(RecordPage {
            records,
            cursor: body.cursor,
        })
    }

    async fn do_upload_blob(
        &self,
        session: &Session,
        bytes: Bytes,
        mime_type: &str,
    ) -> Result<BlobInfo, RepoError> {
        let resp = self
            .http
            .post(format!(
                "{}/xrpc/com.atproto.repo.uploadBlob",
                session.endpoint
            ))
            .bearer_auth(&session.access_jwt)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .await?;
        let resp = check_response(resp).await?;
        let body: UploadBlobResponse = resp
            .json()
            .await
            .map_err(|e| RepoError::Serialization(format!("uploadBlob response: {e}")))?;

        Ok(BlobInfo {
            content_id: body.blob.link.cid,
            mime_type: body.blob.mime_type,
            size: body.blob.size,
            uploaded_at: Utc::now(),
        })
    }

    async fn do_download_blob(
        &self,
        session: &Session,
        content_id: &str,
    ) -> Result<Bytes, RepoError> {
        let resp = self
            .http
            .get(format!("{}/xrpc/com.atproto.sync.getBlob", session.endpoint))
            .bearer_auth(&session.access_jwt)
            .query(&[("did", session.did.as_str()), ("cid", content_id)])
            .send()
            .await?;
        let resp = check_response(resp).await?;
        resp.bytes().await.map_err(RepoError::Http)
    }
}

/// Retry an operation once after a fresh login when the session was
/// rejected. Expands to an explicit two-attempt block so each call site
/// stays readable.
macro_rules! with_session {
    ($self:expr, $cred:expr, |$session:ident| $op:expr) => {{
        let $session = $self.ensure_session($cred).await?;
        match $op {
            Err(RepoError::AuthenticationFailed) => {
                $self.sessions.invalidate(&$cred.identifier);
                let $session = $self.login($cred).await?;
                $op
            }
            other => other,
        }
    }};
}

#[async_trait]
impl RepoClient for PdsClient {
    async fn put_record(
        &self,
        cred: &OwnerCredential,
        key: &str,
        collection: &str,
        value: &Value,
    ) -> Result<RecordLocator, RepoError> {
        let rkey = sanitize_record_key(key);
        with_session!(self, cred, |session| {
            self.do_put_record(&session, collection, &rkey, value).await
        })
    }

    async fn get_record(
        &self,
        cred: &OwnerCredential,
        key: &str,
        collection: &str,
    ) -> Result<Option<Value>, RepoError> {
        let rkey = sanitize_record_key(key);
        let result = with_session!(self, cred, |session| {
            self.do_get_record(&session, collection, &rkey).await
        });
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn delete_record(
        &self,
        cred: &OwnerCredential,
        key: &str,
        collection: &str,
    ) -> Result<(), RepoError> {
        let rkey = sanitize_record_key(key);
        with_session!(self, cred, |session| {
            self.do_delete_record(&session, collection, &rkey).await
        })
    }

    async fn list_records(
        &self,
        cred: &OwnerCredential,
        collection: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<RecordPage, RepoError> {
        with_session!(self, cred, |session| {
            self.do_list_records(&session, collection, limit, cursor)
                .await
        })
    }

    async fn upload_blob(
        &self,
        cred: &OwnerCredential,
        bytes: Bytes,
        mime_type: &str,
    ) -> Result<BlobInfo, RepoError> {
        with_session!(self, cred, |session| {
            self.do_upload_blob(&session, bytes.clone(), mime_type).await
        })
    }

    async fn download_blob(
        &self,
        cred: &OwnerCredential,
        content_id: &str,
    ) -> Result<Bytes, RepoError> {
        with_session!(self, cred, |session| {
            self.do_download_blob(&session, content_id).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xrpc(code: Option<&str>, message: Option<&str>) -> XrpcError {
        XrpcError {
            error: code.map(str::to_owned),
            message: message.map(str::to_owned),
        }
    }

    #[test]
    fn expired_token_maps_to_authentication_failed() {
        let err = normalize_error(
            StatusCode::BAD_REQUEST,
            &xrpc(Some("ExpiredToken"), Some("Token has expired")),
        );
        assert!(matches!(err, RepoError::AuthenticationFailed));
    }

    #[test]
    fn unauthorized_maps_to_authentication_failed() {
        let err = normalize_error(StatusCode::UNAUTHORIZED, &xrpc(None, None));
        assert!(matches!(err, RepoError::AuthenticationFailed));
    }

    #[test]
    fn record_not_found_code_is_normalized() {
        let err = normalize_error(
            StatusCode::BAD_REQUEST,
            &xrpc(Some("RecordNotFound"), Some("Record not found")),
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn not_found_message_is_normalized() {
        let err = normalize_error(
            StatusCode::BAD_REQUEST,
            &xrpc(Some("InvalidRequest"), Some("Could not locate record: xyz")),
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn other_failures_are_remote() {
        let err = normalize_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            &xrpc(Some("InternalServerError"), Some("boom")),
        );
        assert!(matches!(err, RepoError::Remote(_)));
    }

    #[test]
    fn blob_ref_deserializes() {
        let json = serde_json::json!({
            "blob": {
                "$type": "blob",
                "ref": {"$link": "bafyreib2rxk3rybk"},
                "mimeType": "image/png",
                "size": 1234
            }
        });
        let parsed: UploadBlobResponse = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.blob.link.cid, "bafyreib2rxk3rybk");
        assert_eq!(parsed.blob.mime_type, "image/png");
        assert_eq!(parsed.blob.size, 1234);
    }
}
