//! The runtime capability trait.

use async_trait::async_trait;
use stratus_execution::{HttpEvent, HttpResponse};

use crate::context::RuntimeContext;
use crate::error::RuntimeError;

/// What a runtime produced for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeOutput {
    /// The HTTP response the function returned, if it returned one.
    pub response: Option<HttpResponse>,
}

impl RuntimeOutput {
    /// Output carrying a response.
    #[must_use]
    pub fn respond(response: HttpResponse) -> Self {
        Self {
            response: Some(response),
        }
    }

    /// Output without a response.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Status code of the response, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status_code)
    }
}

/// Executes a version's code against an event.
///
/// One implementation exists per supported language. Implementations must be
/// `Send + Sync`; the engine shares a single instance across all concurrent
/// executions as `Arc<dyn Runtime>`.
///
/// A returned `Err` means the code itself failed (threw, did not parse, ...).
/// The engine records it on the execution and does not propagate it.
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Short language tag, e.g. `"static"`.
    fn language(&self) -> &str;

    /// Run `code` for `event`. The event is the real, unmasked request.
    async fn execute(
        &self,
        code: &str,
        ctx: &RuntimeContext,
        event: &HttpEvent,
    ) -> Result<RuntimeOutput, RuntimeError>;
}
