//! Structured masking: header/query maps, JSON bodies, events and responses.

use std::collections::BTreeMap;

use serde_json::Value;
use stratus_execution::{HttpEvent, HttpResponse};

use crate::REDACTED;
use crate::vocab::{is_sensitive_body_field, is_sensitive_header_name, is_sensitive_query_param};

/// Copy of `headers` with sensitive values replaced by [`REDACTED`].
#[must_use]
pub fn mask_headers(headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    mask_map(headers, is_sensitive_header_name)
}

/// Copy of `query` with sensitive values replaced by [`REDACTED`].
#[must_use]
pub fn mask_query_params(query: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    mask_map(query, is_sensitive_query_param)
}

fn mask_map(
    map: &BTreeMap<String, String>,
    is_sensitive: fn(&str) -> bool,
) -> BTreeMap<String, String> {
    map.iter()
        .map(|(k, v)| {
            let value = if is_sensitive(k) { REDACTED.to_owned() } else { v.clone() };
            (k.clone(), value)
        })
        .collect()
}

/// Redact sensitive fields of a JSON document at any depth.
///
/// Text that does not parse as JSON is returned unchanged.
#[must_use]
pub fn mask_json_body(body: &str) -> String {
    let Ok(mut value) = serde_json::from_str::<Value>(body) else {
        return body.to_owned();
    };
    if !mask_value(&mut value) {
        return body.to_owned();
    }
    serde_json::to_string(&value).unwrap_or_else(|_| body.to_owned())
}

/// Mask in place; returns `true` if anything was replaced.
fn mask_value(value: &mut Value) -> bool {
    match value {
        Value::Object(map) => {
            let mut changed = false;
            for (key, field) in map.iter_mut() {
                if is_sensitive_body_field(key) {
                    if field.as_str() != Some(REDACTED) {
                        *field = Value::String(REDACTED.to_owned());
                        changed = true;
                    }
                } else {
                    changed |= mask_value(field);
                }
            }
            changed
        }
        Value::Array(items) => items.iter_mut().fold(false, |acc, item| mask_value(item) | acc),
        _ => false,
    }
}

/// Mask an inbound event for storage. Method and path pass through.
#[must_use]
pub fn mask_http_event(event: &HttpEvent) -> HttpEvent {
    HttpEvent {
        method: event.method.clone(),
        path: event.path.clone(),
        headers: mask_headers(&event.headers),
        query: mask_query_params(&event.query),
        body: mask_json_body(&event.body),
    }
}

/// Mask a function response for storage. The status code passes through.
#[must_use]
pub fn mask_http_response(response: &HttpResponse) -> HttpResponse {
    HttpResponse {
        status_code: response.status_code,
        headers: mask_headers(&response.headers),
        body: mask_json_body(&response.body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn masks_password_keeping_structure() {
        let out = mask_json_body(r#"{"username":"john","password":"secret123"}"#);
        assert_eq!(out, r#"{"username":"john","password":"[REDACTED]"}"#);
    }

    #[test]
    fn non_json_is_returned_unchanged() {
        for body in ["", "hello world", "{not json", "password=hunter2"] {
            assert_eq!(mask_json_body(body), body);
        }
    }

    #[test]
    fn json_without_sensitive_fields_is_byte_identical() {
        let body = "{ \"a\" : 1,\n \"b\": [1, 2] }";
        assert_eq!(mask_json_body(body), body);
    }

    #[test]
    fn numbers_keep_their_spelling() {
        let body = r#"{"password":"x","amount":1e5,"big":18446744073709551616,"price":0.10000000000000000001}"#;
        assert_eq!(
            mask_json_body(body),
            r#"{"password":"[REDACTED]","amount":1e5,"big":18446744073709551616,"price":0.10000000000000000001}"#
        );
    }

    #[test]
    fn masks_nested_objects_and_arrays() {
        let body = r#"{"user":{"name":"a","api_key":"k1"},"items":[{"token":"t"},{"id":2}],"usage":{"completion_tokens":12}}"#;
        let out: Value = serde_json::from_str(&mask_json_body(body)).unwrap();
        let expected: Value = serde_json::from_str(
            r#"{"user":{"name":"a","api_key":"[REDACTED]"},"items":[{"token":"[REDACTED]"},{"id":2}],"usage":{"completion_tokens":12}}"#,
        )
        .unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn sensitive_object_values_are_replaced_wholesale() {
        let out = mask_json_body(r#"{"credentials":{"user":"a","pass":"b"}}"#);
        assert_eq!(out, r#"{"credentials":"[REDACTED]"}"#);
    }

    #[test]
    fn masking_is_idempotent() {
        let once = mask_json_body(r#"{"password":"x","nested":{"secret":"y"}}"#);
        assert_eq!(mask_json_body(&once), once);
    }

    #[test]
    fn headers_are_masked_by_name() {
        let headers = map(&[("Authorization", "Bearer abc"), ("Content-Type", "text/plain")]);
        assert_eq!(
            mask_headers(&headers),
            map(&[("Authorization", REDACTED), ("Content-Type", "text/plain")])
        );
    }

    #[test]
    fn empty_maps_stay_empty() {
        assert!(mask_headers(&BTreeMap::new()).is_empty());
        assert!(mask_query_params(&BTreeMap::new()).is_empty());
    }

    #[test]
    fn query_params_are_masked_by_name() {
        let query = map(&[("token", "abc"), ("page", "2")]);
        assert_eq!(
            mask_query_params(&query),
            map(&[("page", "2"), ("token", REDACTED)])
        );
    }

    #[test]
    fn event_masking_keeps_method_and_path() {
        let event = HttpEvent::new("POST", "/fn/abc/login")
            .with_header("Cookie", "sid=1")
            .with_query("api_key", "k")
            .with_body(r#"{"password":"p"}"#);
        let masked = mask_http_event(&event);
        assert_eq!(masked.method, "POST");
        assert_eq!(masked.path, "/fn/abc/login");
        assert_eq!(masked.headers["Cookie"], REDACTED);
        assert_eq!(masked.query["api_key"], REDACTED);
        assert_eq!(masked.body, r#"{"password":"[REDACTED]"}"#);
        assert_eq!(mask_http_event(&masked), masked);
    }

    #[test]
    fn response_masking_keeps_status() {
        let resp = HttpResponse::new(201, r#"{"access_token":"abc","expires_in":3600}"#)
            .with_header("Set-Cookie", "sid=2");
        let masked = mask_http_response(&resp);
        assert_eq!(masked.status_code, 201);
        assert_eq!(masked.headers["Set-Cookie"], REDACTED);
        assert_eq!(masked.body, r#"{"access_token":"[REDACTED]","expires_in":3600}"#);
    }
}
