//! Next-occurrence preview for unregistered expressions.

use chrono::{DateTime, Utc};
use stratus_function::CronExpression;

use crate::error::SchedulerError;

/// First occurrence of `expr` strictly after `after`.
///
/// Needs no registration; used to preview a schedule before saving it.
/// Returns `Ok(None)` for expressions that never fire again.
pub fn next_run(expr: &str, after: &DateTime<Utc>) -> Result<Option<DateTime<Utc>>, SchedulerError> {
    Ok(CronExpression::parse(expr)?.next_after(after))
}
