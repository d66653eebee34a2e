//! Host collaborators backed by a native HTTP stack.
//!
//! # Design
//! These stand in for the browser host when the shim runs as a regular
//! process: `NativeXhrLoader` plays the script manager's request primitive
//! and `BackgroundHost` plays the extension's privileged background worker.
//! Both run the blocking `ureq` call on tokio's blocking pool, so they must
//! be used from inside a tokio runtime.
//!
//! Only the primitive carries the 5 s deadline; the background host waits as
//! long as the server takes.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::client::HostBindings;
use crate::config::HostEnvironment;
use crate::error::RequestError;
use crate::extension::{HostMessage, HostMessenger, HostReply, ReplyHandle, REQUEST_KIND};
use crate::http::{HeaderMap, HttpMethod};
use crate::userscript::{
    XhrDetails, XhrHooks, XhrLoader, XhrResponse, XmlHttpRequest, XHR_TIMEOUT,
};

/// Bindings for `environment` using the native backends.
pub fn bindings(environment: HostEnvironment) -> HostBindings {
    match environment {
        HostEnvironment::Extension => HostBindings::Extension(BackgroundHost::spawn()),
        HostEnvironment::Userscript => HostBindings::Userscript(Arc::new(NativeXhrLoader)),
    }
}

/// Status and body of a completed exchange, whatever the status.
struct Exchange {
    status: u16,
    status_text: String,
    text: String,
}

/// Run one request. Non-2xx statuses come back as data, not errors.
fn perform(
    agent: &ureq::Agent,
    method: HttpMethod,
    url: &str,
    headers: &HeaderMap,
    body: Option<&str>,
) -> Result<Exchange, ureq::Error> {
    let mut response = match (method, body) {
        (HttpMethod::Get, _) => with_headers(agent.get(url), headers).call(),
        (HttpMethod::Head, _) => with_headers(agent.head(url), headers).call(),
        (HttpMethod::Options, _) => with_headers(agent.options(url), headers).call(),
        (HttpMethod::Delete, _) => with_headers(agent.delete(url), headers).call(),
        (HttpMethod::Post, Some(body)) => {
            with_headers(agent.post(url), headers).send(body.as_bytes())
        }
        (HttpMethod::Post, None) => with_headers(agent.post(url), headers).send_empty(),
        (HttpMethod::Put, Some(body)) => {
            with_headers(agent.put(url), headers).send(body.as_bytes())
        }
        (HttpMethod::Put, None) => with_headers(agent.put(url), headers).send_empty(),
        (HttpMethod::Patch, Some(body)) => {
            with_headers(agent.patch(url), headers).send(body.as_bytes())
        }
        (HttpMethod::Patch, None) => with_headers(agent.patch(url), headers).send_empty(),
    }?;

    let status = response.status();
    let text = response.body_mut().read_to_string()?;
    Ok(Exchange {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        text,
    })
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &HeaderMap,
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

/// Request primitive backed by a `ureq` agent with the userscript deadline.
pub struct NativeXhr {
    agent: ureq::Agent,
}

impl NativeXhr {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(XHR_TIMEOUT))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for NativeXhr {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlHttpRequest for NativeXhr {
    fn send(&self, details: XhrDetails, hooks: XhrHooks) {
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || {
            let result = perform(
                &agent,
                details.method,
                &details.url,
                &details.headers,
                details.data.as_deref(),
            );
            match result {
                Ok(exchange) => hooks.onload(XhrResponse {
                    status: exchange.status,
                    status_text: exchange.status_text,
                    response: serde_json::from_str(&exchange.text).unwrap_or(Value::Null),
                    response_text: exchange.text,
                    final_url: details.url,
                }),
                Err(ureq::Error::Timeout(_)) => hooks.ontimeout(XhrResponse {
                    final_url: details.url,
                    ..XhrResponse::default()
                }),
                Err(e) => hooks.onerror(XhrResponse {
                    status_text: e.to_string(),
                    final_url: details.url,
                    ..XhrResponse::default()
                }),
            }
        });
    }
}

/// Resolves a fresh `NativeXhr`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeXhrLoader;

#[async_trait]
impl XhrLoader for NativeXhrLoader {
    async fn load(&self) -> Result<Arc<dyn XmlHttpRequest>, RequestError> {
        tracing::debug!("using native xmlhttpRequest");
        Ok(Arc::new(NativeXhr::new()))
    }
}

/// Background worker that performs host messages over HTTP.
pub struct BackgroundHost {
    tx: mpsc::UnboundedSender<(HostMessage, ReplyHandle)>,
}

impl BackgroundHost {
    /// Start the worker on the current runtime.
    pub fn spawn() -> Arc<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<(HostMessage, ReplyHandle)>();
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();

        tokio::spawn(async move {
            while let Some((message, reply)) = rx.recv().await {
                let agent = agent.clone();
                tokio::task::spawn_blocking(move || {
                    let answer = Self::answer(&agent, &message);
                    if !reply.respond(answer) {
                        tracing::debug!(url = %message.payload.url, "reply dropped by caller");
                    }
                });
            }
            tracing::debug!("background host stopped");
        });

        Arc::new(Self { tx })
    }

    fn answer(agent: &ureq::Agent, message: &HostMessage) -> HostReply {
        let init = &message.payload.init;
        match perform(
            agent,
            init.method,
            &message.payload.url,
            &init.headers,
            init.body.as_deref(),
        ) {
            Ok(exchange) => HostReply::new(
                exchange.text,
                (200..300).contains(&exchange.status),
                Some(exchange.status),
            ),
            Err(e) => {
                tracing::warn!(url = %message.payload.url, error = %e, "background request failed");
                HostReply::new(e.to_string(), false, None)
            }
        }
    }
}

impl HostMessenger for BackgroundHost {
    fn dispatch(&self, message: HostMessage, reply: ReplyHandle) {
        if message.kind != REQUEST_KIND {
            tracing::warn!(kind = %message.kind, "ignoring unknown host message");
            return;
        }
        if self.tx.send((message, reply)).is_err() {
            tracing::warn!("background host is gone");
        }
    }
}
