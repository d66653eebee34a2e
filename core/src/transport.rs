//! The transport seam shared by both host strategies.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::config::HostEnvironment;
use crate::error::RequestError;
use crate::http::RequestInit;
use crate::response::ResponseEnvelope;

/// Performs one HTTP request through whatever the host provides.
///
/// `url` is already composed and validated; implementors ignore
/// `init.query`.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// The host this transport talks to.
    fn environment(&self) -> HostEnvironment;

    /// Issue the request and wait for its single terminal outcome.
    async fn execute(&self, url: String, init: &RequestInit)
        -> Result<ResponseEnvelope, RequestError>;
}
