//! Normalized view over one completed response body.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::RequestError;

/// Text and JSON views of one response body.
///
/// Both accessors are idempotent and may be called any number of times in
/// any order. An envelope built from text parses lazily on every `json`
/// call; one built by the userscript transport hands out the body the host
/// already parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    text: String,
    parsed: Option<Value>,
}

impl ResponseEnvelope {
    pub fn from_text(text: String) -> Self {
        Self { text, parsed: None }
    }

    pub fn with_parsed(text: String, parsed: Value) -> Self {
        Self {
            text,
            parsed: Some(parsed),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Deserialize the body as `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, RequestError> {
        match &self.parsed {
            Some(value) => T::deserialize(value),
            None => serde_json::from_str(&self.text),
        }
        .map_err(|e| RequestError::Deserialization(e.to_string()))
    }
}
