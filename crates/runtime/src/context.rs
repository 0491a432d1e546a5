//! Per-invocation context handed to a runtime.

use chrono::{DateTime, Utc};
use stratus_core::{ExecutionId, FunctionId};

use crate::logger::ExecutionLogger;

/// Everything a runtime may need to know about the current invocation.
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    /// The execution being run.
    pub execution_id: ExecutionId,
    /// The function being run.
    pub function_id: FunctionId,
    /// When the engine started the execution.
    pub started_at: DateTime<Utc>,
    /// Version number of the code being run.
    pub version: u32,
    /// Public base URL of the platform, without a trailing slash.
    pub base_url: String,
    /// Log stream of this execution.
    pub logger: ExecutionLogger,
}

impl RuntimeContext {
    /// Absolute URL of this function's HTTP entry point.
    #[must_use]
    pub fn function_url(&self) -> String {
        format!("{}/fn/{}", self.base_url.trim_end_matches('/'), self.function_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn function_url_ignores_trailing_slash() {
        let function_id = FunctionId::nil();
        let execution_id = ExecutionId::v4();
        let ctx = RuntimeContext {
            execution_id,
            function_id,
            started_at: Utc::now(),
            version: 1,
            base_url: "http://localhost:8080/".into(),
            logger: ExecutionLogger::detached(execution_id, function_id),
        };
        assert_eq!(
            ctx.function_url(),
            format!("http://localhost:8080/fn/{function_id}")
        );
    }
}
