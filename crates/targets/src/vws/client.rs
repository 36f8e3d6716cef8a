//! VWS HTTP client
//!
//! Issues each REST operation against the target management API.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use base64::prelude::*;
use chrono::Utc;
use ureq::Agent;
use url::Url;

use super::api::{
    AccountSummaryResponse, CreateTargetRequest, CreateTargetResponse, DuplicatesResponse,
    TargetListResponse, TargetRecordResponse, TargetSummaryResponse, UpdateTargetRequest,
};
use super::auth::{rfc1123_date, sign_request};
use crate::config::VwsCredentials;
use crate::models::{TargetChanges, TargetId};

/// Bound on a whole request; generous because image uploads can be large
/// and slow.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const CONTENT_TYPE_JSON: &str = "application/json";

/// Fixed marker reported for a successful delete; the server answers with
/// an empty body.
pub const DELETED_MARKER: &str = "Deleted";

/// Error from a single VWS call
///
/// The status code and body are retained internally so higher layers could
/// branch on them; the sync engine surfaces every variant as one generic
/// failure.
#[derive(Debug, thiserror::Error)]
pub enum VwsError {
    /// Connection, DNS, TLS, or timeout failure before a response arrived
    #[error("transport failure: {0}")]
    Transport(String),
    /// The service answered with a non-success status
    #[error("service returned status {status}")]
    Service { status: u16, body: String },
    /// A success response whose body did not parse as the expected shape
    #[error("malformed response body: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The host flipped the cancellation token while the call was in flight
    #[error("request cancelled")]
    Cancelled,
}

impl From<ureq::Error> for VwsError {
    fn from(err: ureq::Error) -> Self {
        VwsError::Transport(err.to_string())
    }
}

/// Cooperative cancellation handle shared between the host and the client.
///
/// Observed between receiving a response and interpreting it; an in-flight
/// socket operation is bounded by the agent timeout instead.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Re-arm the token so the client can be used again after a cancel.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// VWS API client for target CRUD and queries
///
/// Stateless apart from the connection agent; it never touches the local
/// cache.
pub struct VwsClient {
    credentials: VwsCredentials,
    base_url: String,
    host: String,
    agent: Agent,
    cancel: CancelToken,
}

impl VwsClient {
    /// Create a client with the default request timeout.
    pub fn new(credentials: VwsCredentials) -> Result<Self, VwsError> {
        Self::with_timeout(credentials, DEFAULT_TIMEOUT)
    }

    /// Create a client with an explicit bound on each whole request.
    pub fn with_timeout(credentials: VwsCredentials, timeout: Duration) -> Result<Self, VwsError> {
        let base_url = credentials.base_url.trim_end_matches('/').to_string();
        let parsed = Url::parse(&base_url)
            .map_err(|e| VwsError::Transport(format!("invalid base URL {}: {}", base_url, e)))?;
        let host = match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(VwsError::Transport(format!("base URL {} has no host", base_url)));
            }
        };

        // Non-2xx responses come back as responses rather than errors, so
        // their status and body can be retained.
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .new_agent();

        Ok(Self {
            credentials,
            base_url,
            host,
            agent,
            cancel: CancelToken::new(),
        })
    }

    /// Handle the host can use to cancel in-flight calls.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List every target id registered in the account.
    ///
    /// Order is server-defined and not guaranteed stable across calls.
    pub fn list_targets(&self) -> Result<Vec<TargetId>, VwsError> {
        let body = self.get("/targets")?;
        let list: TargetListResponse = serde_json::from_str(&body)?;
        Ok(list.results.into_iter().map(TargetId::new).collect())
    }

    /// Fetch the full target record.
    pub fn get_target(&self, id: &TargetId) -> Result<TargetRecordResponse, VwsError> {
        let body = self.get(&format!("/targets/{}", id.as_str()))?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch the name/status/date summary for one target.
    pub fn get_target_summary(&self, id: &TargetId) -> Result<TargetSummaryResponse, VwsError> {
        let body = self.get(&format!("/summary/{}", id.as_str()))?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch account-level image counts.
    pub fn get_account_summary(&self) -> Result<AccountSummaryResponse, VwsError> {
        let body = self.get("/summary")?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch ids of targets the service considers visually similar.
    pub fn check_duplicates(&self, id: &TargetId) -> Result<Vec<TargetId>, VwsError> {
        let body = self.get(&format!("/duplicates/{}", id.as_str()))?;
        let duplicates: DuplicatesResponse = serde_json::from_str(&body)?;
        Ok(duplicates.similar_targets.into_iter().map(TargetId::new).collect())
    }

    /// Register a new target.
    ///
    /// Returns the server-assigned id together with the raw response text.
    pub fn create_target(
        &self,
        name: &str,
        width: f32,
        image: &[u8],
        active: bool,
        metadata: &[u8],
    ) -> Result<(TargetId, String), VwsError> {
        let request = CreateTargetRequest {
            name: name.to_string(),
            width,
            image: BASE64_STANDARD.encode(image),
            active_flag: active,
            application_metadata: BASE64_STANDARD.encode(metadata),
        };
        let body = serde_json::to_string(&request)?;
        let text = self.send("POST", "/targets", &body)?;
        let created: CreateTargetResponse = serde_json::from_str(&text)?;
        Ok((TargetId::new(created.target_id), text))
    }

    /// Apply a partial update; returns the raw response text.
    pub fn update_target(&self, id: &TargetId, changes: &TargetChanges) -> Result<String, VwsError> {
        let request = UpdateTargetRequest {
            name: changes.name.clone(),
            width: changes.width,
            image: changes.image.as_deref().map(|b| BASE64_STANDARD.encode(b)),
            active_flag: changes.active,
            application_metadata: changes.metadata.as_deref().map(|b| BASE64_STANDARD.encode(b)),
        };
        let body = serde_json::to_string(&request)?;
        self.send("PUT", &format!("/targets/{}", id.as_str()), &body)
    }

    /// Remove a target; reports [`DELETED_MARKER`] on success.
    pub fn delete_target(&self, id: &TargetId) -> Result<String, VwsError> {
        let path = format!("/targets/{}", id.as_str());
        let date = rfc1123_date(Utc::now());
        let authorization = sign_request("DELETE", &path, "", b"", &self.credentials, &date);

        let response = self
            .agent
            .delete(format!("{}{}", self.base_url, path))
            .header("host", &self.host)
            .header("date", &date)
            .header("content-type", "")
            .header("authorization", &authorization)
            .call()?;
        self.interpret(response)?;
        Ok(DELETED_MARKER.to_string())
    }

    /// Signed bodyless GET; returns the response body text.
    fn get(&self, path: &str) -> Result<String, VwsError> {
        let date = rfc1123_date(Utc::now());
        let authorization = sign_request("GET", path, "", b"", &self.credentials, &date);

        let response = self
            .agent
            .get(format!("{}{}", self.base_url, path))
            .header("host", &self.host)
            .header("date", &date)
            .header("content-type", "")
            .header("authorization", &authorization)
            .call()?;
        self.interpret(response)
    }

    /// Signed POST/PUT carrying a JSON body.
    ///
    /// The body is serialized before signing so the signature covers the
    /// exact bytes that go on the wire.
    fn send(&self, method: &str, path: &str, body: &str) -> Result<String, VwsError> {
        let date = rfc1123_date(Utc::now());
        let authorization =
            sign_request(method, path, CONTENT_TYPE_JSON, body.as_bytes(), &self.credentials, &date);

        let url = format!("{}{}", self.base_url, path);
        let request = match method {
            "POST" => self.agent.post(url),
            _ => self.agent.put(url),
        };
        let response = request
            .header("host", &self.host)
            .header("date", &date)
            .header("content-type", CONTENT_TYPE_JSON)
            .header("authorization", &authorization)
            .send(body.as_bytes())?;
        self.interpret(response)
    }

    /// Shared response handling for every call: cancellation check, then
    /// status check, then body read.
    fn interpret(&self, mut response: ureq::http::Response<ureq::Body>) -> Result<String, VwsError> {
        if self.cancel.is_cancelled() {
            return Err(VwsError::Cancelled);
        }

        let status = response.status();
        let body = response.body_mut().read_to_string()?;
        if !status.is_success() {
            return Err(VwsError::Service {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}
