//! Transport for userscript managers.
//!
//! # Design
//! The cross-origin request primitive is resolved lazily through an
//! `XhrLoader` the first time a request is made and then shared for the life
//! of the transport. Concurrent first calls wait on the same initialization.
//!
//! The primitive reports completion through `XhrHooks`. The hooks are
//! consumed by whichever of load/abort/error/timeout fires first, so each
//! call sees exactly one `XhrOutcome`. The transport also holds its own
//! deadline of `XHR_TIMEOUT` in case the primitive never reports back.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{oneshot, OnceCell};

use crate::config::HostEnvironment;
use crate::error::RequestError;
use crate::http::{HeaderMap, HttpMethod, RequestInit};
use crate::response::ResponseEnvelope;
use crate::transport::Transport;

pub const XHR_TIMEOUT: Duration = Duration::from_millis(5000);

/// Options handed to the primitive for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XhrDetails {
    pub url: String,
    pub method: HttpMethod,
    pub headers: HeaderMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Milliseconds.
    pub timeout: u64,
    pub response_type: String,
}

/// What the primitive reports for a finished (or failed) request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct XhrResponse {
    pub status: u16,
    pub status_text: String,
    pub response_text: String,
    /// Body as already parsed by the host.
    pub response: Value,
    pub final_url: String,
}

/// The single terminal event of one request.
#[derive(Debug, Clone, PartialEq)]
pub enum XhrOutcome {
    Load(XhrResponse),
    Abort(XhrResponse),
    Error(XhrResponse),
    Timeout(XhrResponse),
}

impl XhrOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            XhrOutcome::Load(_) => "load",
            XhrOutcome::Abort(_) => "abort",
            XhrOutcome::Error(_) => "error",
            XhrOutcome::Timeout(_) => "timeout",
        }
    }

    pub fn response(&self) -> &XhrResponse {
        match self {
            XhrOutcome::Load(r)
            | XhrOutcome::Abort(r)
            | XhrOutcome::Error(r)
            | XhrOutcome::Timeout(r) => r,
        }
    }
}

impl fmt::Display for XhrOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let response = self.response();
        write!(f, "{} (status {})", self.kind(), response.status)?;
        if !response.status_text.is_empty() {
            write!(f, ": {}", response.status_text)?;
        }
        Ok(())
    }
}

/// Completion hooks for one request. Each method consumes the hooks.
#[derive(Debug)]
pub struct XhrHooks(oneshot::Sender<XhrOutcome>);

impl XhrHooks {
    pub fn onload(self, response: XhrResponse) {
        self.fire(XhrOutcome::Load(response));
    }

    pub fn onabort(self, response: XhrResponse) {
        self.fire(XhrOutcome::Abort(response));
    }

    pub fn onerror(self, response: XhrResponse) {
        self.fire(XhrOutcome::Error(response));
    }

    pub fn ontimeout(self, response: XhrResponse) {
        self.fire(XhrOutcome::Timeout(response));
    }

    fn fire(self, outcome: XhrOutcome) {
        if self.0.send(outcome).is_err() {
            tracing::debug!("xhr outcome arrived after the caller gave up");
        }
    }
}

/// The host's cross-origin request primitive.
pub trait XmlHttpRequest: Send + Sync {
    fn send(&self, details: XhrDetails, hooks: XhrHooks);
}

/// Resolves the primitive from the host script manager.
#[async_trait]
pub trait XhrLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn XmlHttpRequest>, RequestError>;
}

/// Strategy for the userscript host.
pub struct UserscriptTransport {
    loader: Arc<dyn XhrLoader>,
    handle: OnceCell<Arc<dyn XmlHttpRequest>>,
}

impl UserscriptTransport {
    pub fn new(loader: Arc<dyn XhrLoader>) -> Self {
        Self {
            loader,
            handle: OnceCell::new(),
        }
    }

    /// The resolved primitive, loading it on first use.
    pub async fn handle(&self) -> Result<Arc<dyn XmlHttpRequest>, RequestError> {
        let handle = self
            .handle
            .get_or_try_init(|| async {
                tracing::debug!("resolving xmlhttpRequest primitive");
                self.loader.load().await
            })
            .await?;
        Ok(handle.clone())
    }

    /// Build the primitive's options for `url`.
    ///
    /// Object, array and null bodies are sent as JSON text; strings pass
    /// through raw and other scalars as their text.
    pub fn build_details(url: String, init: &RequestInit) -> Result<XhrDetails, RequestError> {
        let data = match &init.body {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            Some(other) => Some(
                serde_json::to_string(other)
                    .map_err(|e| RequestError::Serialization(e.to_string()))?,
            ),
        };
        Ok(XhrDetails {
            url,
            method: init.method,
            headers: init.merged_headers(),
            data,
            timeout: XHR_TIMEOUT.as_millis() as u64,
            response_type: "json".to_string(),
        })
    }
}

impl fmt::Debug for UserscriptTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserscriptTransport")
            .field("initialized", &self.handle.initialized())
            .finish()
    }
}

#[async_trait]
impl Transport for UserscriptTransport {
    fn environment(&self) -> HostEnvironment {
        HostEnvironment::Userscript
    }

    async fn execute(
        &self,
        url: String,
        init: &RequestInit,
    ) -> Result<ResponseEnvelope, RequestError> {
        let xhr = self.handle().await?;
        let details = Self::build_details(url, init)?;

        let (tx, rx) = oneshot::channel();
        xhr.send(details, XhrHooks(tx));

        let outcome = match tokio::time::timeout(XHR_TIMEOUT, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => return Err(RequestError::HostDisconnected),
            Err(_) => XhrOutcome::Timeout(XhrResponse::default()),
        };

        match outcome {
            XhrOutcome::Load(response) if (200..=300).contains(&response.status) => Ok(
                ResponseEnvelope::with_parsed(response.response_text, response.response),
            ),
            outcome => {
                tracing::warn!(
                    outcome = outcome.kind(),
                    status = outcome.response().status,
                    "request rejected"
                );
                Err(RequestError::Rejected(Box::new(outcome)))
            }
        }
    }
}
