//! Transport for the browser extension content context.
//!
//! # Design
//! Content scripts cannot perform cross-origin requests themselves, so the
//! request is described as a `HostMessage` and handed to a privileged host
//! through a `HostMessenger`. The messenger gets a `ReplyHandle` that can be
//! used exactly once; dropping it without answering rejects the call. There
//! is no deadline here: the call stays pending until the host replies.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::config::HostEnvironment;
use crate::error::RequestError;
use crate::http::{HeaderMap, HttpMethod, RequestInit};
use crate::response::ResponseEnvelope;
use crate::transport::Transport;

pub const REQUEST_KIND: &str = "request";

/// Message sent to the host asking it to perform a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostMessage {
    pub kind: String,
    pub payload: HostRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostRequest {
    pub url: String,
    pub init: HostRequestInit,
}

/// Fetch-style init the host passes to its network call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostRequestInit {
    pub method: HttpMethod,
    pub headers: HeaderMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// The host's answer, passed back whole on rejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostReply {
    pub payload: ReplyPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyPayload {
    pub text: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl HostReply {
    pub fn new(text: String, ok: bool, status: Option<u16>) -> Self {
        Self {
            payload: ReplyPayload { text, ok, status },
        }
    }
}

impl fmt::Display for HostReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.payload.status {
            Some(status) => write!(f, "HTTP {status}: {}", self.payload.text),
            None => write!(f, "{}", self.payload.text),
        }
    }
}

/// Single-use completion for one dispatched message.
#[derive(Debug)]
pub struct ReplyHandle(oneshot::Sender<HostReply>);

impl ReplyHandle {
    /// Deliver the reply. Returns false if the caller has gone away.
    pub fn respond(self, reply: HostReply) -> bool {
        self.0.send(reply).is_ok()
    }
}

/// External collaborator that performs requests on behalf of the content
/// context.
pub trait HostMessenger: Send + Sync {
    fn dispatch(&self, message: HostMessage, reply: ReplyHandle);
}

/// Strategy for the extension host: every call becomes one host message.
#[derive(Clone)]
pub struct ExtensionTransport {
    messenger: Arc<dyn HostMessenger>,
}

impl ExtensionTransport {
    pub fn new(messenger: Arc<dyn HostMessenger>) -> Self {
        Self { messenger }
    }

    /// Build the message for `url`. The body is always sent as JSON text.
    pub fn build_message(url: String, init: &RequestInit) -> Result<HostMessage, RequestError> {
        let body = init
            .body
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RequestError::Serialization(e.to_string()))?;
        Ok(HostMessage {
            kind: REQUEST_KIND.to_string(),
            payload: HostRequest {
                url,
                init: HostRequestInit {
                    method: init.method,
                    headers: init.merged_headers(),
                    body,
                },
            },
        })
    }
}

impl fmt::Debug for ExtensionTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExtensionTransport")
    }
}

#[async_trait]
impl Transport for ExtensionTransport {
    fn environment(&self) -> HostEnvironment {
        HostEnvironment::Extension
    }

    async fn execute(
        &self,
        url: String,
        init: &RequestInit,
    ) -> Result<ResponseEnvelope, RequestError> {
        let message = Self::build_message(url, init)?;
        let (tx, rx) = oneshot::channel();
        self.messenger.dispatch(message, ReplyHandle(tx));

        let reply = rx.await.map_err(|_| RequestError::HostDisconnected)?;
        if reply.payload.ok {
            Ok(ResponseEnvelope::from_text(reply.payload.text))
        } else {
            tracing::warn!(status = ?reply.payload.status, "host rejected request");
            Err(RequestError::HostRejected(reply))
        }
    }
}
