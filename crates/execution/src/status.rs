//! Execution status and trigger tags.

use serde::{Deserialize, Serialize};

/// The status of a single function execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Recorded, runtime call not finished.
    Pending,
    /// The function ran and produced a non-error response.
    Success,
    /// The function failed, timed out, or answered with status >= 400.
    Error,
}

impl ExecutionStatus {
    /// `success` or `error`; no further update is accepted.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }

    /// The function ran and answered below 400.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// The run failed, timed out or answered with an error status.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What caused an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// An inbound HTTP request.
    #[default]
    Http,
    /// A cron timer fire.
    Cron,
}

impl Trigger {
    /// Classify the value of an `X-Trigger` header. Anything but `cron` is HTTP.
    #[must_use]
    pub fn from_header(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("cron") => Self::Cron,
            _ => Self::Http,
        }
    }

    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Cron => "cron",
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(ExecutionStatus::Success.is_terminal());
        assert!(ExecutionStatus::Error.is_terminal());
        assert!(!ExecutionStatus::Pending.is_terminal());
    }

    #[test]
    fn success_and_failure() {
        assert!(ExecutionStatus::Success.is_success());
        assert!(!ExecutionStatus::Error.is_success());
        assert!(ExecutionStatus::Error.is_failure());
        assert!(!ExecutionStatus::Pending.is_failure());
    }

    #[test]
    fn display_formatting() {
        assert_eq!(ExecutionStatus::Pending.to_string(), "pending");
        assert_eq!(ExecutionStatus::Success.to_string(), "success");
        assert_eq!(ExecutionStatus::Error.to_string(), "error");
    }

    #[test]
    fn serde_rename_snake_case() {
        let json = serde_json::to_string(&ExecutionStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
        let json = serde_json::to_string(&Trigger::Cron).unwrap();
        assert_eq!(json, "\"cron\"");
    }

    #[test]
    fn trigger_from_header() {
        assert_eq!(Trigger::from_header(Some("cron")), Trigger::Cron);
        assert_eq!(Trigger::from_header(Some(" CRON ")), Trigger::Cron);
        assert_eq!(Trigger::from_header(Some("manual")), Trigger::Http);
        assert_eq!(Trigger::from_header(None), Trigger::Http);
    }
}
