//! Cron expression parsing and next-occurrence lookup.
//!
//! The `cron` crate expects a leading seconds field (6 or 7 fields). Plain
//! five-field expressions such as `*/5 * * * *` are accepted by pinning the
//! seconds field to `0` and renumbering their day-of-week field.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::error::FunctionError;

/// A parsed, validated cron expression.
#[derive(Debug, Clone)]
pub struct CronExpression {
    source: String,
    schedule: Schedule,
}

impl CronExpression {
    /// Parse an expression in 5-field (minute resolution) or 6/7-field form.
    pub fn parse(expr: &str) -> Result<Self, FunctionError> {
        let source = expr.trim();
        if source.is_empty() {
            return Err(FunctionError::InvalidCron {
                expr: expr.to_owned(),
                reason: "expression is empty".into(),
            });
        }

        let schedule = Schedule::from_str(&normalize(source)).map_err(|e| {
            FunctionError::InvalidCron {
                expr: expr.to_owned(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            source: source.to_owned(),
            schedule,
        })
    }

    /// The expression as supplied (trimmed, not normalized).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// First occurrence strictly after `after`.
    #[must_use]
    pub fn next_after(&self, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(after).next()
    }

    /// First occurrence strictly after now.
    #[must_use]
    pub fn next(&self) -> Option<DateTime<Utc>> {
        self.next_after(&Utc::now())
    }
}

impl fmt::Display for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for CronExpression {
    type Err = FunctionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn normalize(expr: &str) -> String {
    match expr.split_whitespace().collect::<Vec<_>>().as_slice() {
        [minute, hour, day, month, weekday] => format!(
            "0 {minute} {hour} {day} {month} {}",
            standard_weekdays(weekday)
        ),
        _ => expr.to_owned(),
    }
}

/// Five-field cron counts weekdays from Sunday = 0 (7 is Sunday too); the
/// `cron` crate counts from Sunday = 1. Names pass through untouched.
fn standard_weekdays(field: &str) -> String {
    field.split(',').map(weekday_item).collect::<Vec<_>>().join(",")
}

fn weekday_item(item: &str) -> String {
    let (base, step) = match item.split_once('/') {
        Some((base, step)) => (base, Some(step)),
        None => (item, None),
    };
    let suffix = step.map(|step| format!("/{step}")).unwrap_or_default();

    let Some((start, end)) = base.split_once('-') else {
        let shifted = weekday_number(base).map_or_else(|| base.to_owned(), |n| shift(n).to_string());
        return format!("{shifted}{suffix}");
    };
    match (weekday_number(start), weekday_number(end)) {
        (Some(0), Some(7)) => format!("1-7{suffix}"),
        // Ends on the second Sunday: split off the wrap.
        (Some(start), Some(7)) => {
            let reaches_sunday = step
                .and_then(|step| step.parse::<u8>().ok())
                .is_none_or(|step| step > 0 && (7 - start) % step == 0);
            let mut out = format!("{}-7{suffix}", start + 1);
            if reaches_sunday {
                out.push_str(",1");
            }
            out
        }
        (Some(start), Some(end)) => format!("{}-{}{suffix}", start + 1, end + 1),
        _ => item.to_owned(),
    }
}

fn weekday_number(text: &str) -> Option<u8> {
    text.parse().ok().filter(|n| *n <= 7)
}

fn shift(weekday: u8) -> u8 {
    if weekday == 7 { 1 } else { weekday + 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use rstest::rstest;

    #[rstest]
    #[case("*/5 * * * *")]
    #[case("0 9 * * MON-FRI")]
    #[case("0 */5 * * * *")]
    #[case("0 0 9 * * MON-FRI *")]
    #[case("  */5 * * * *  ")]
    fn accepts_valid_expressions(#[case] expr: &str) {
        assert!(CronExpression::parse(expr).is_ok(), "{expr}");
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("not a cron")]
    #[case("61 * * * *")]
    fn rejects_invalid_expressions(#[case] expr: &str) {
        assert!(matches!(
            CronExpression::parse(expr),
            Err(FunctionError::InvalidCron { .. })
        ));
    }

    #[test]
    fn five_field_runs_on_minute_boundaries() {
        let cron = CronExpression::parse("*/5 * * * *").unwrap();
        let after = Utc.with_ymd_and_hms(2024, 1, 1, 10, 1, 30).unwrap();
        let next = cron.next_after(&after).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 1, 10, 5, 0).unwrap());
        assert_eq!(next.second(), 0);
    }

    #[test]
    fn next_is_strictly_after() {
        let cron = CronExpression::parse("*/5 * * * *").unwrap();
        let on_boundary = Utc.with_ymd_and_hms(2024, 1, 1, 10, 5, 0).unwrap();
        let next = cron.next_after(&on_boundary).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 1, 10, 10, 0).unwrap());
    }

    #[rstest]
    #[case("* * * * *", "0 * * * * *")]
    #[case("0 9 * * 0", "0 0 9 * * 1")]
    #[case("0 9 * * 7", "0 0 9 * * 1")]
    #[case("0 9 * * 1-5", "0 0 9 * * 2-6")]
    #[case("0 9 * * 0,3,6", "0 0 9 * * 1,4,7")]
    #[case("0 9 * * */2", "0 0 9 * * */2")]
    #[case("0 9 * * 1-5/2", "0 0 9 * * 2-6/2")]
    #[case("0 9 * * 0-7", "0 0 9 * * 1-7")]
    #[case("0 9 * * 5-7", "0 0 9 * * 6-7,1")]
    #[case("0 9 * * 3-7/2", "0 0 9 * * 4-7/2,1")]
    #[case("0 9 * * 4-7/2", "0 0 9 * * 5-7/2")]
    #[case("0 9 * * MON-FRI", "0 0 9 * * MON-FRI")]
    #[case("0 0 9 * * 2", "0 0 9 * * 2")]
    fn five_field_weekdays_are_renumbered(#[case] expr: &str, #[case] normalized: &str) {
        assert_eq!(normalize(expr), normalized);
    }

    #[rstest]
    // 2024-01-01 is a Monday.
    #[case("* * * * 0", (2024, 1, 1, 10, 0), (2024, 1, 7, 0, 0))]
    #[case("0 9 * * 1", (2024, 1, 1, 10, 0), (2024, 1, 8, 9, 0))]
    #[case("0 9 * * 1-5", (2024, 1, 5, 10, 0), (2024, 1, 8, 9, 0))]
    #[case("0 9 * * 7", (2024, 1, 1, 10, 0), (2024, 1, 7, 9, 0))]
    #[case("0 9 * * 5-7", (2024, 1, 6, 10, 0), (2024, 1, 7, 9, 0))]
    #[case("0 9 * * 0,6", (2024, 1, 1, 10, 0), (2024, 1, 6, 9, 0))]
    #[case("0 9 * * */2", (2024, 1, 1, 10, 0), (2024, 1, 2, 9, 0))]
    #[case("0 9 * * 1-5/2", (2024, 1, 1, 10, 0), (2024, 1, 3, 9, 0))]
    #[case("0 9 * * MON", (2024, 1, 1, 10, 0), (2024, 1, 8, 9, 0))]
    fn five_field_weekdays_count_from_sunday_zero(
        #[case] expr: &str,
        #[case] after: (i32, u32, u32, u32, u32),
        #[case] expected: (i32, u32, u32, u32, u32),
    ) {
        let at = |(y, mo, d, h, mi): (i32, u32, u32, u32, u32)| {
            Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
        };
        let cron = CronExpression::parse(expr).unwrap();
        assert_eq!(cron.next_after(&at(after)), Some(at(expected)), "{expr}");
    }

    #[test]
    fn five_field_weekday_eight_is_rejected() {
        assert!(CronExpression::parse("0 9 * * 8").is_err());
    }

    #[test]
    fn keeps_source_text() {
        let cron: CronExpression = " */5 * * * * ".parse().unwrap();
        assert_eq!(cron.as_str(), "*/5 * * * *");
        assert_eq!(cron.to_string(), "*/5 * * * *");
    }
}
