//! Error types for the request shim.
//!
//! # Design
//! Every failure of a call lands in `RequestError`. Rejections coming back
//! from a host carry the host's payload untouched so the caller can inspect
//! the raw status or message; nothing in this crate retries or rewrites them.

use thiserror::Error;

use crate::extension::HostReply;
use crate::userscript::XhrOutcome;

/// Errors returned by `RequestClient::request` and the response accessors.
#[derive(Debug, Error)]
pub enum RequestError {
    /// A query value was an array, object or null. Raised before any I/O.
    #[error("query parameter `{key}` must be a scalar; flatten or serialize nested values first")]
    NestedQueryValue { key: String },

    /// The request body could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The extension host answered with `ok: false`.
    #[error("host rejected the request: {0}")]
    HostRejected(HostReply),

    /// The userscript transport finished through a non-success hook.
    #[error("request rejected: {0}")]
    Rejected(Box<XhrOutcome>),

    /// The host dropped the completion without ever invoking it.
    #[error("host dropped the request without a reply")]
    HostDisconnected,

    /// The cross-origin request primitive could not be resolved.
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    /// The response body is not valid JSON for the requested type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// `install` was called after a default client was already set.
    #[error("a default client is already installed")]
    AlreadyInstalled,

    /// The free `request` function was used before `install`.
    #[error("no default client installed")]
    NotInstalled,
}

/// Errors raised while loading `ApiConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is unset or empty.
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    /// The metadata document could not be parsed.
    #[error("invalid metadata: {0}")]
    Invalid(String),
}
