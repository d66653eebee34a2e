//! Verify URL composition against the JSON test vectors in `test-vectors/`.
//!
//! Each case gives a path, an ordered query mapping, and either the exact
//! expected URL or the expected error variant.

use request_shim::{compose_url, ApiConfig, RequestError};
use serde_json::Value;

#[test]
fn compose_url_test_vectors() {
    let raw = include_str!("../../test-vectors/compose_url.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let config = ApiConfig::from_json(&vectors["config"].to_string()).unwrap();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let path = case["path"].as_str().unwrap();
        let query: Vec<(String, Value)> = case["query"]
            .as_array()
            .unwrap()
            .iter()
            .map(|pair| {
                let pair = pair.as_array().unwrap();
                (pair[0].as_str().unwrap().to_string(), pair[1].clone())
            })
            .collect();

        let result = compose_url(&config, path, &query);

        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            match expected_error.as_str().unwrap() {
                "NestedQueryValue" => assert!(
                    matches!(err, RequestError::NestedQueryValue { .. }),
                    "{name}: expected NestedQueryValue, got {err:?}"
                ),
                other => panic!("{name}: unknown expected_error: {other}"),
            }
        } else {
            let url = result.unwrap_or_else(|e| panic!("{name}: {e}"));
            assert_eq!(url, case["expected_url"].as_str().unwrap(), "{name}: url");
        }
    }
}
