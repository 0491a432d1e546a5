//! Self-triggering HTTP client.
//!
//! Scheduled executions re-enter through the same entry point external
//! callers use, so masking, recording and metrics are identical.

use std::time::Duration;

use chrono::{DateTime, Utc};
use stratus_core::FunctionId;

use crate::error::SchedulerError;

/// Header names attached to every cron self-trigger.
pub mod headers {
    /// Marks the request as cron-triggered; value `cron`.
    pub const TRIGGER: &str = "X-Trigger";
    /// The schedule that fired.
    pub const CRON_SCHEDULE: &str = "X-Cron-Schedule";
    /// Function id.
    pub const CRON_FUNCTION_ID: &str = "X-Cron-Function-Id";
    /// Function name.
    pub const CRON_FUNCTION_NAME: &str = "X-Cron-Function-Name";
    /// Scheduled fire time, Unix seconds.
    pub const CRON_SCHEDULED_TIME: &str = "X-Cron-Scheduled-Time";
}

/// What a timer fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronJob {
    /// Function to trigger.
    pub function_id: FunctionId,
    /// Its display name.
    pub function_name: String,
    /// The schedule as stored.
    pub schedule: String,
}

/// POSTs cron fires to `{base_url}/fn/{function_id}`.
#[derive(Debug, Clone)]
pub struct SelfTrigger {
    client: reqwest::Client,
    base_url: String,
}

impl SelfTrigger {
    /// Client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SchedulerError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { client, base_url })
    }

    /// Entry point URL of `function_id`.
    #[must_use]
    pub fn url_for(&self, function_id: FunctionId) -> String {
        format!("{}/fn/{function_id}", self.base_url)
    }

    /// Send one trigger; returns the status of a 2xx answer.
    pub async fn fire(&self, job: &CronJob, scheduled: DateTime<Utc>) -> Result<u16, SchedulerError> {
        let response = self
            .client
            .post(self.url_for(job.function_id))
            .header(headers::TRIGGER, "cron")
            .header(headers::CRON_SCHEDULE, job.schedule.as_str())
            .header(headers::CRON_FUNCTION_ID, job.function_id.to_string())
            .header(headers::CRON_FUNCTION_NAME, job.function_name.as_str())
            .header(headers::CRON_SCHEDULED_TIME, scheduled.timestamp().to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SchedulerError::TriggerRejected {
                function_id: job.function_id,
                status: status.as_u16(),
            });
        }
        Ok(status.as_u16())
    }
}
