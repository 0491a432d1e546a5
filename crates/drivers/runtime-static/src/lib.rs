#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Stratus Static Runtime Driver
//!
//! Implements the [`Runtime`] port with no interpreter at all: a version's
//! code is a JSON *response template* that is rendered against the event.
//! Real language runtimes plug in the same way; this one exists so the
//! platform runs end to end without one.
//!
//! # Template format
//!
//! ```json
//! {
//!   "statusCode": 201,
//!   "headers": { "Content-Type": "text/plain" },
//!   "body": "hello from ${path} (v${version})",
//!   "log": ["received ${method}"],
//!   "delayMs": 10
//! }
//! ```
//!
//! - `body` may be a string or any JSON value (serialized as-is).
//! - `log` lines go to the execution logger, masked.
//! - `error` makes the invocation fail with that message after logging.
//! - `delayMs` sleeps before answering.
//! - Code that is empty or `null` produces no response.
//! - Code that is not a valid template fails with a syntax error.
//!
//! Placeholders in `body`, header values and log lines: `${method}`,
//! `${path}`, `${body}`, `${execution_id}`, `${function_id}`, `${version}`,
//! `${base_url}`, `${function_url}`, `${query.NAME}` and `${header.NAME}`.
//! Unknown placeholders are left untouched.

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::{Captures, Regex};
use serde::Deserialize;
use stratus_execution::{HttpEvent, HttpResponse};
use stratus_runtime::{Runtime, RuntimeContext, RuntimeError, RuntimeOutput};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([a-z_]+)(?:\.([A-Za-z0-9_-]+))?\}").expect("static placeholder pattern is valid")
});

/// A parsed response template.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct Template {
    #[serde(default)]
    status_code: Option<u16>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    body: Option<serde_json::Value>,
    #[serde(default)]
    log: Vec<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    delay_ms: Option<u64>,
}

/// Runtime whose code is a JSON response template.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticRuntime;

impl StaticRuntime {
    /// Create the runtime.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn parse(code: &str) -> Result<Option<Template>, RuntimeError> {
    if code.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(code).map_err(|e| RuntimeError::Syntax(e.to_string()))
}

fn render(text: &str, ctx: &RuntimeContext, event: &HttpEvent) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| {
            let arg = caps.get(2).map(|m| m.as_str());
            let value = match (&caps[1], arg) {
                ("method", None) => Some(event.method.clone()),
                ("path", None) => Some(event.path.clone()),
                ("body", None) => Some(event.body.clone()),
                ("execution_id", None) => Some(ctx.execution_id.to_string()),
                ("function_id", None) => Some(ctx.function_id.to_string()),
                ("version", None) => Some(ctx.version.to_string()),
                ("base_url", None) => Some(ctx.base_url.clone()),
                ("function_url", None) => Some(ctx.function_url()),
                ("query", Some(name)) => Some(event.query.get(name).cloned().unwrap_or_default()),
                ("header", Some(name)) => Some(event.header(name).unwrap_or_default().to_owned()),
                _ => None,
            };
            value.unwrap_or_else(|| caps[0].to_owned())
        })
        .into_owned()
}

#[async_trait]
impl Runtime for StaticRuntime {
    fn language(&self) -> &str {
        "static"
    }

    async fn execute(
        &self,
        code: &str,
        ctx: &RuntimeContext,
        event: &HttpEvent,
    ) -> Result<RuntimeOutput, RuntimeError> {
        let Some(template) = parse(code)? else {
            return Ok(RuntimeOutput::empty());
        };
        tracing::debug!(
            execution_id = %ctx.execution_id,
            version = ctx.version,
            "rendering static response"
        );

        if let Some(ms) = template.delay_ms {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        for line in &template.log {
            ctx.logger.info(&render(line, ctx, event));
        }
        if let Some(message) = template.error {
            return Err(RuntimeError::failed(render(&message, ctx, event)));
        }

        let body = match template.body {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(text)) => render(&text, ctx, event),
            Some(other) => other.to_string(),
        };
        let headers = template
            .headers
            .into_iter()
            .map(|(name, value)| {
                let value = render(&value, ctx, event);
                (name, value)
            })
            .collect();

        Ok(RuntimeOutput::respond(HttpResponse {
            status_code: template.status_code.unwrap_or(200),
            headers,
            body,
        }))
    }
}
