//! Request shim for a courseware answer client running in two kinds of
//! browser host.
//!
//! # Overview
//! Callers describe a request with `RequestInit` and hand it to
//! `RequestClient::request`. The path is composed into a full URL against the
//! configured API origin, then performed by whichever transport the host
//! supports:
//!
//! - `ExtensionTransport` delegates the call to a privileged host process
//!   through message passing.
//! - `UserscriptTransport` calls the script manager's cross-origin request
//!   primitive, resolved lazily on first use, with a 5 s deadline.
//!
//! Both normalize their result into a `ResponseEnvelope`.
//!
//! # Design
//! - The transport is chosen once per client (`HostBindings`), never per call.
//! - Query validation runs before any I/O; nested values are rejected.
//! - Host failures are returned untouched in `RequestError`; nothing retries.
//! - `native` provides both host collaborators over `ureq` for use outside a
//!   browser.

pub mod client;
pub mod config;
pub mod error;
pub mod extension;
pub mod http;
pub mod native;
pub mod response;
pub mod transport;
pub mod url;
pub mod userscript;

pub use client::{default_client, install, request, HostBindings, RequestClient};
pub use config::{ApiConfig, HostEnvironment};
pub use error::{ConfigError, RequestError};
pub use extension::{ExtensionTransport, HostMessage, HostMessenger, HostReply, ReplyHandle};
pub use http::{HttpMethod, RequestInit};
pub use response::ResponseEnvelope;
pub use transport::Transport;
pub use url::compose_url;
pub use userscript::{
    UserscriptTransport, XhrDetails, XhrHooks, XhrLoader, XhrOutcome, XhrResponse, XmlHttpRequest,
};
