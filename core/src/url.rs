//! URL composition for relative and absolute request targets.
//!
//! Paths starting with `/` are resolved against `<api_server>/<platform>`;
//! anything else is taken as an absolute URL. The query mapping is merged
//! into whatever query the base already carries, sorted by key and strictly
//! percent-encoded. A fragment on the base stays at the end.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

use crate::config::ApiConfig;
use crate::error::RequestError;

/// Everything except ASCII alphanumerics and `-_.~`.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Build the full request URL for `path` with `query` appended.
///
/// Fails with `RequestError::NestedQueryValue` if any query value is an
/// array, object or null.
pub fn compose_url(
    config: &ApiConfig,
    path: &str,
    query: &[(String, Value)],
) -> Result<String, RequestError> {
    let flat = flatten_query(query)?;

    let base = if path.starts_with('/') {
        format!("{}{path}", config.origin())
    } else {
        path.to_string()
    };

    let (rest, fragment) = match base.find('#') {
        Some(i) => base.split_at(i),
        None => (base.as_str(), ""),
    };
    let (url, existing) = match rest.find('?') {
        Some(i) => (&rest[..i], &rest[i + 1..]),
        None => (rest, ""),
    };

    let mut pairs = parse_query(existing);
    for (key, value) in flat {
        pairs.retain(|(k, _)| *k != key);
        pairs.push((key, Some(value)));
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let encoded = pairs
        .iter()
        .map(|(key, value)| match value {
            Some(value) => format!("{}={}", encode(key), encode(value)),
            None => encode(key),
        })
        .collect::<Vec<_>>()
        .join("&");

    if encoded.is_empty() {
        Ok(format!("{url}{fragment}"))
    } else {
        Ok(format!("{url}?{encoded}{fragment}"))
    }
}

/// Reject composite values and render scalars as strings.
fn flatten_query(query: &[(String, Value)]) -> Result<Vec<(String, String)>, RequestError> {
    query
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => {
                    return Err(RequestError::NestedQueryValue { key: key.clone() })
                }
            };
            Ok((key.clone(), rendered))
        })
        .collect()
}

fn parse_query(raw: &str) -> Vec<(String, Option<String>)> {
    raw.split('&')
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((key, value)) => (decode(key), Some(decode(value))),
            None => (decode(part), None),
        })
        .collect()
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

fn encode(raw: &str) -> String {
    utf8_percent_encode(raw, QUERY_ENCODE_SET).to_string()
}
