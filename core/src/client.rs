//! Request entry point tying URL composition to the selected transport.
//!
//! # Design
//! `RequestClient` picks its transport once, at construction, from the host
//! bindings it is given; every call afterwards goes through the same
//! `Arc<dyn Transport>`. Cloning the client shares that transport, including
//! the userscript primitive once it has been resolved.

use std::sync::{Arc, OnceLock};

use crate::config::{ApiConfig, HostEnvironment};
use crate::error::{ConfigError, RequestError};
use crate::extension::{ExtensionTransport, HostMessenger};
use crate::http::RequestInit;
use crate::native;
use crate::response::ResponseEnvelope;
use crate::transport::Transport;
use crate::url::compose_url;
use crate::userscript::{UserscriptTransport, XhrLoader};

/// The host collaborator a client is built around.
#[derive(Clone)]
pub enum HostBindings {
    Extension(Arc<dyn HostMessenger>),
    Userscript(Arc<dyn XhrLoader>),
}

impl HostBindings {
    pub fn environment(&self) -> HostEnvironment {
        match self {
            HostBindings::Extension(_) => HostEnvironment::Extension,
            HostBindings::Userscript(_) => HostEnvironment::Userscript,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestClient {
    config: ApiConfig,
    transport: Arc<dyn Transport>,
}

impl RequestClient {
    pub fn new(config: ApiConfig, bindings: HostBindings) -> Self {
        let transport: Arc<dyn Transport> = match bindings {
            HostBindings::Extension(messenger) => Arc::new(ExtensionTransport::new(messenger)),
            HostBindings::Userscript(loader) => Arc::new(UserscriptTransport::new(loader)),
        };
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: ApiConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Configuration and host from the environment, wired to the native
    /// backends. Must be called inside a tokio runtime.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = ApiConfig::from_env()?;
        let environment = HostEnvironment::from_env();
        Ok(Self::new(config, native::bindings(environment)))
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn environment(&self) -> HostEnvironment {
        self.transport.environment()
    }

    /// Perform one request.
    ///
    /// `path` is either relative to the configured origin (leading `/`) or an
    /// absolute URL. Query validation happens before anything is sent.
    pub async fn request(
        &self,
        path: &str,
        init: RequestInit,
    ) -> Result<ResponseEnvelope, RequestError> {
        let url = compose_url(&self.config, path, &init.query)?;
        tracing::debug!(
            method = init.method.as_str(),
            %url,
            environment = ?self.transport.environment(),
            "dispatching request"
        );
        self.transport.execute(url, &init).await
    }
}

static DEFAULT_CLIENT: OnceLock<RequestClient> = OnceLock::new();

/// Install the process-wide client used by [`request`]. Only the first call
/// succeeds.
pub fn install(client: RequestClient) -> Result<(), RequestError> {
    DEFAULT_CLIENT
        .set(client)
        .map_err(|_| RequestError::AlreadyInstalled)
}

pub fn default_client() -> Result<&'static RequestClient, RequestError> {
    DEFAULT_CLIENT.get().ok_or(RequestError::NotInstalled)
}

/// Perform one request through the installed default client.
pub async fn request(path: &str, init: RequestInit) -> Result<ResponseEnvelope, RequestError> {
    default_client()?.request(path, init).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::{HostMessage, HostReply, ReplyHandle};
    use crate::userscript::{XhrDetails, XhrHooks, XhrResponse, XmlHttpRequest};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Echoes the composed URL back as the response text.
    #[derive(Default)]
    struct UrlEchoHost {
        dispatched: AtomicUsize,
    }

    impl HostMessenger for UrlEchoHost {
        fn dispatch(&self, message: HostMessage, reply: ReplyHandle) {
            self.dispatched.fetch_add(1, Ordering::SeqCst);
            reply.respond(HostReply::new(message.payload.url, true, Some(200)));
        }
    }

    #[derive(Default)]
    struct UrlEchoXhr {
        sent: Mutex<Vec<XhrDetails>>,
    }

    impl XmlHttpRequest for UrlEchoXhr {
        fn send(&self, details: XhrDetails, hooks: XhrHooks) {
            let url = details.url.clone();
            self.sent.lock().unwrap().push(details);
            hooks.onload(XhrResponse {
                status: 200,
                response_text: url.clone(),
                response: Value::String(url),
                ..XhrResponse::default()
            });
        }
    }

    struct UrlEchoLoader {
        xhr: Arc<UrlEchoXhr>,
        loads: AtomicUsize,
    }

    #[async_trait]
    impl XhrLoader for UrlEchoLoader {
        async fn load(&self) -> Result<Arc<dyn XmlHttpRequest>, RequestError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(self.xhr.clone())
        }
    }

    fn config() -> ApiConfig {
        ApiConfig::new("https://api.example.com", "welearn")
    }

    #[tokio::test]
    async fn extension_client_composes_relative_url() {
        let host = Arc::new(UrlEchoHost::default());
        let client = RequestClient::new(config(), HostBindings::Extension(host.clone()));
        assert_eq!(client.environment(), HostEnvironment::Extension);

        let envelope = client
            .request("/answers", RequestInit::get().query("unit", 3))
            .await
            .unwrap();
        assert_eq!(envelope.text(), "https://api.example.com/welearn/answers?unit=3");
    }

    #[tokio::test]
    async fn userscript_client_passes_absolute_url_through() {
        let xhr = Arc::new(UrlEchoXhr::default());
        let loader = Arc::new(UrlEchoLoader {
            xhr: xhr.clone(),
            loads: AtomicUsize::new(0),
        });
        let client = RequestClient::new(config(), HostBindings::Userscript(loader.clone()));
        assert_eq!(client.environment(), HostEnvironment::Userscript);

        let envelope = client
            .request("https://other.test/x", RequestInit::default())
            .await
            .unwrap();
        assert_eq!(envelope.json::<Value>().unwrap(), json!("https://other.test/x"));
        assert_eq!(xhr.sent.lock().unwrap()[0].timeout, 5000);
    }

    #[tokio::test]
    async fn nested_query_fails_before_any_transport_activity() {
        let host = Arc::new(UrlEchoHost::default());
        let extension = RequestClient::new(config(), HostBindings::Extension(host.clone()));

        let xhr = Arc::new(UrlEchoXhr::default());
        let loader = Arc::new(UrlEchoLoader {
            xhr: xhr.clone(),
            loads: AtomicUsize::new(0),
        });
        let userscript = RequestClient::new(config(), HostBindings::Userscript(loader.clone()));

        for client in [&extension, &userscript] {
            let init = RequestInit::get().query("filter", json!({"unit": 1}));
            let err = client.request("/answers", init).await.unwrap_err();
            assert!(matches!(err, RequestError::NestedQueryValue { .. }));
        }
        assert_eq!(host.dispatched.load(Ordering::SeqCst), 0);
        assert_eq!(loader.loads.load(Ordering::SeqCst), 0);
        assert!(xhr.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn default_client_installs_once() {
        assert!(matches!(
            request("/x", RequestInit::get()).await,
            Err(RequestError::NotInstalled)
        ));

        let host = Arc::new(UrlEchoHost::default());
        install(RequestClient::new(config(), HostBindings::Extension(host.clone()))).unwrap();
        let again = install(RequestClient::new(config(), HostBindings::Extension(host.clone())));
        assert!(matches!(again, Err(RequestError::AlreadyInstalled)));

        let envelope = request("/ping", RequestInit::get()).await.unwrap();
        assert_eq!(envelope.text(), "https://api.example.com/welearn/ping");
        assert_eq!(default_client().unwrap().environment(), HostEnvironment::Extension);
    }
}
