//! Request descriptor types shared by both transport strategies.
//!
//! # Design
//! A `RequestInit` describes one outbound call as plain data: method,
//! caller headers, a flat query mapping and an optional JSON body. The
//! transports never see the query; it is folded into the URL by
//! `compose_url` before any I/O happens.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RequestError;

/// Header name/value pairs after the forced `Content-Type` merge.
pub type HeaderMap = BTreeMap<String, String>;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

/// One outbound call, described as plain data.
///
/// `Default` is a bare GET with no headers, query or body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestInit {
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, Value)>,
    pub body: Option<Value>,
}

impl RequestInit {
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn get() -> Self {
        Self::new(HttpMethod::Get)
    }

    pub fn post() -> Self {
        Self::new(HttpMethod::Post)
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn query(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `body` to a JSON value and attach it.
    pub fn json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self, RequestError> {
        let value =
            serde_json::to_value(body).map_err(|e| RequestError::Serialization(e.to_string()))?;
        Ok(self.body(value))
    }

    /// The forced JSON `Content-Type` with the caller's headers merged over it.
    ///
    /// Keys match exactly; a later header replaces an earlier one with the
    /// same name.
    pub fn merged_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string());
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
        headers
    }
}
