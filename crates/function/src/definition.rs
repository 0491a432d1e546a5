//! Function-level definition types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use stratus_core::FunctionId;

use crate::cron_expr::CronExpression;
use crate::error::FunctionError;

/// Whether a function's cron schedule is currently firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CronStatus {
    /// Timer registered and firing.
    Active,
    /// Schedule kept but not firing.
    Paused,
}

impl std::fmt::Display for CronStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Paused => write!(f, "paused"),
        }
    }
}

/// Execution retention window in days, restricted to [`RetentionDays::ALLOWED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct RetentionDays(u16);

impl RetentionDays {
    /// The allowed retention values.
    pub const ALLOWED: [u16; 4] = [7, 15, 30, 365];

    /// Validate a raw number of days.
    pub fn new(days: u16) -> Result<Self, FunctionError> {
        if Self::ALLOWED.contains(&days) {
            Ok(Self(days))
        } else {
            Err(FunctionError::InvalidRetention(days))
        }
    }

    /// Number of days.
    #[must_use]
    pub fn days(self) -> u16 {
        self.0
    }

    /// Retention as a chrono duration.
    #[must_use]
    pub fn as_duration(self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.0))
    }
}

impl TryFrom<u16> for RetentionDays {
    type Error = FunctionError;

    fn try_from(days: u16) -> Result<Self, Self::Error> {
        Self::new(days)
    }
}

impl From<RetentionDays> for u16 {
    fn from(r: RetentionDays) -> Self {
        r.0
    }
}

/// A stored function: metadata only, code lives in its versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// Unique identifier.
    pub id: FunctionId,
    /// Display name.
    pub name: String,
    /// Optional longer description.
    #[serde(default)]
    pub description: Option<String>,
    /// Disabled functions refuse to execute.
    #[serde(default)]
    pub disabled: bool,
    /// How long executions are kept.
    #[serde(default)]
    pub retention_days: Option<RetentionDays>,
    /// Cron expression, if the function runs on a timer.
    #[serde(default)]
    pub cron_schedule: Option<String>,
    /// Whether the cron schedule is firing.
    #[serde(default)]
    pub cron_status: Option<CronStatus>,
    /// Persist response snapshots on executions.
    #[serde(default)]
    pub save_response: bool,
    /// When the function was created.
    pub created_at: DateTime<Utc>,
    /// When the function was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Function {
    /// The schedule to register, if any: non-empty and `active`.
    #[must_use]
    pub fn active_cron_schedule(&self) -> Option<&str> {
        match (self.cron_schedule.as_deref(), self.cron_status) {
            (Some(expr), Some(CronStatus::Active)) if !expr.trim().is_empty() => Some(expr),
            _ => None,
        }
    }

    /// Returns `true` if the scheduler should hold a timer for this function.
    #[must_use]
    pub fn has_active_cron(&self) -> bool {
        self.active_cron_schedule().is_some()
    }
}

/// Input for creating a function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFunction {
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Start disabled.
    #[serde(default)]
    pub disabled: bool,
    /// Retention window.
    #[serde(default)]
    pub retention_days: Option<RetentionDays>,
    /// Cron expression.
    #[serde(default)]
    pub cron_schedule: Option<String>,
    /// Cron status; defaults to `active` when a schedule is given.
    #[serde(default)]
    pub cron_status: Option<CronStatus>,
    /// Persist response snapshots.
    #[serde(default)]
    pub save_response: bool,
}

impl NewFunction {
    /// Shorthand for a function with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Attach a cron schedule.
    #[must_use]
    pub fn with_cron(mut self, expr: impl Into<String>) -> Self {
        self.cron_schedule = Some(expr.into());
        self
    }

    /// Enable response snapshots.
    #[must_use]
    pub fn with_save_response(mut self, save: bool) -> Self {
        self.save_response = save;
        self
    }

    /// Validate and materialize into a [`Function`].
    pub fn into_function(self, id: FunctionId, now: DateTime<Utc>) -> Result<Function, FunctionError> {
        let name = validate_name(&self.name)?;
        let cron_schedule = normalize_schedule(self.cron_schedule)?;
        let cron_status = match (&cron_schedule, self.cron_status) {
            (Some(_), None) => Some(CronStatus::Active),
            (_, status) => status,
        };

        Ok(Function {
            id,
            name,
            description: self.description,
            disabled: self.disabled,
            retention_days: self.retention_days,
            cron_schedule,
            cron_status,
            save_response: self.save_response,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update: only fields that are `Some` change.
///
/// Nullable fields use a double option so JSON `null` clears the value while
/// an absent key leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionPatch {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description; `Some(None)` clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    /// Enable/disable.
    #[serde(default)]
    pub disabled: Option<bool>,
    /// New retention; `Some(None)` clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub retention_days: Option<Option<RetentionDays>>,
    /// New schedule; `Some(None)` or an empty string removes it.
    #[serde(default, deserialize_with = "double_option")]
    pub cron_schedule: Option<Option<String>>,
    /// New cron status.
    #[serde(default)]
    pub cron_status: Option<CronStatus>,
    /// Toggle response snapshots.
    #[serde(default)]
    pub save_response: Option<bool>,
}

impl FunctionPatch {
    /// Returns `true` if the patch changes anything the scheduler cares about.
    #[must_use]
    pub fn touches_cron(&self) -> bool {
        self.cron_schedule.is_some() || self.cron_status.is_some()
    }

    /// Validate the patch and apply it to `function`.
    ///
    /// Nothing is modified when validation fails.
    pub fn apply(self, function: &mut Function, now: DateTime<Utc>) -> Result<(), FunctionError> {
        let name = self.name.as_deref().map(validate_name).transpose()?;
        let cron_schedule = self.cron_schedule.map(normalize_schedule).transpose()?;

        if let Some(name) = name {
            function.name = name;
        }
        if let Some(description) = self.description {
            function.description = description;
        }
        if let Some(disabled) = self.disabled {
            function.disabled = disabled;
        }
        if let Some(retention) = self.retention_days {
            function.retention_days = retention;
        }
        if let Some(schedule) = cron_schedule {
            if schedule.is_some() && function.cron_status.is_none() && self.cron_status.is_none() {
                function.cron_status = Some(CronStatus::Active);
            }
            function.cron_schedule = schedule;
        }
        if let Some(status) = self.cron_status {
            function.cron_status = Some(status);
        }
        if let Some(save) = self.save_response {
            function.save_response = save;
        }
        function.updated_at = now;
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<String, FunctionError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(FunctionError::EmptyName);
    }
    Ok(trimmed.to_owned())
}

/// Empty schedules collapse to `None`; others must parse.
fn normalize_schedule(schedule: Option<String>) -> Result<Option<String>, FunctionError> {
    match schedule {
        Some(expr) if !expr.trim().is_empty() => {
            let parsed = CronExpression::parse(&expr)?;
            Ok(Some(parsed.as_str().to_owned()))
        }
        _ => Ok(None),
    }
}

fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}
