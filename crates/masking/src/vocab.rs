//! Sensitive-name vocabularies.
//!
//! Headers and query parameters match on case-insensitive substrings. Body
//! fields are stricter: the field must equal a vocabulary word or start with
//! it followed by `_` or `-`, so `completion_tokens` is left alone while
//! `password_confirmation` is caught.

const HEADER_WORDS: &[&str] = &[
    "authorization",
    "cookie",
    "token",
    "secret",
    "password",
    "api-key",
    "apikey",
    "api_key",
    "auth",
    "session",
    "credential",
    "signature",
];

const QUERY_WORDS: &[&str] = &[
    "token",
    "secret",
    "password",
    "passwd",
    "api_key",
    "api-key",
    "apikey",
    "auth",
    "signature",
    "credential",
    "session",
];

const QUERY_EXACT: &[&str] = &["key", "sig", "pwd", "code"];

const BODY_WORDS: &[&str] = &[
    "password",
    "passwd",
    "pwd",
    "secret",
    "client_secret",
    "secret_key",
    "secretkey",
    "token",
    "access_token",
    "accesstoken",
    "refresh_token",
    "refreshtoken",
    "id_token",
    "auth_token",
    "api_key",
    "apikey",
    "api-key",
    "authorization",
    "auth",
    "credential",
    "credentials",
    "private_key",
    "privatekey",
    "session_id",
    "cookie",
    "ssn",
    "credit_card",
    "card_number",
    "cvv",
];

/// Whether a header's value must be redacted.
#[must_use]
pub fn is_sensitive_header_name(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.ends_with("key") || HEADER_WORDS.iter().any(|w| name.contains(w))
}

/// Whether a query parameter's value must be redacted.
#[must_use]
pub fn is_sensitive_query_param(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    QUERY_EXACT.contains(&name.as_str()) || QUERY_WORDS.iter().any(|w| name.contains(w))
}

/// Whether a JSON object field's value must be redacted.
#[must_use]
pub fn is_sensitive_body_field(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    BODY_WORDS.iter().any(|w| {
        name == *w
            || name
                .strip_prefix(w)
                .is_some_and(|rest| rest.starts_with('_') || rest.starts_with('-'))
    })
}
