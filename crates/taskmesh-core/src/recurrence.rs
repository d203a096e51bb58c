//! Recurrence rule evaluation.
//!
//! [`Recurrence`] describes how a parent task repeats; [`Recurrence::next_due_date`]
//! is the single source of truth for "when is the next occurrence". It is a
//! pure function over `(rule, last_due, now)` -- deterministic, never mutating,
//! and strictly increasing when its own output is fed back in as `last_due`.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// How often a recurring task repeats.
///
/// Weekday indices follow the 0 = Sunday .. 6 = Saturday convention used by
/// the task records; `month` is 1-12 and `day_of_month` 1-31.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "frequency", rename_all = "snake_case")]
pub enum Frequency {
    /// Every `interval` days.
    Daily,
    /// Every `7 * interval` days, or the next weekday in `days_of_week`
    /// when the set is non-empty.
    Weekly {
        #[serde(default)]
        days_of_week: Vec<u8>,
    },
    /// Every `14 * interval` days.
    Biweekly,
    /// Every `interval` months, pinned to `day_of_month` when set.
    Monthly { day_of_month: Option<u32> },
    /// Every `interval` years on `month`/`day_of_month`.
    Yearly { month: u32, day_of_month: u32 },
    /// `interval` is a raw day count.
    Custom,
}

/// A recurrence rule attached to a parent task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    #[serde(flatten)]
    pub frequency: Frequency,
    /// Multiplier on the base period (default 1, always >= 1).
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// No occurrence is generated past this instant.
    pub end_date: Option<DateTime<Utc>>,
}

fn default_interval() -> u32 {
    1
}

impl Recurrence {
    /// Create a rule with the default interval of 1 and no end date.
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            end_date: None,
        }
    }

    pub fn every(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn until(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Check value ranges on the rule.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval == 0 {
            return Err(ValidationError::InvalidValue {
                field: "interval".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        match &self.frequency {
            Frequency::Weekly { days_of_week } => {
                if days_of_week.iter().any(|d| *d > 6) {
                    return Err(ValidationError::InvalidValue {
                        field: "days_of_week".to_string(),
                        message: "weekday indices must be 0-6".to_string(),
                    });
                }
            }
            Frequency::Monthly {
                day_of_month: Some(day),
            } => {
                if !(1..=31u32).contains(day) {
                    return Err(ValidationError::InvalidValue {
                        field: "day_of_month".to_string(),
                        message: "must be 1-31".to_string(),
                    });
                }
            }
            Frequency::Yearly {
                month,
                day_of_month,
            } => {
                if !(1..=12u32).contains(month) {
                    return Err(ValidationError::InvalidValue {
                        field: "month".to_string(),
                        message: "must be 1-12".to_string(),
                    });
                }
                if !(1..=31u32).contains(day_of_month) {
                    return Err(ValidationError::InvalidValue {
                        field: "day_of_month".to_string(),
                        message: "must be 1-31".to_string(),
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Compute the next due date after `last_due`.
    ///
    /// `now` feeds the monthly/yearly guard: if pinning the day-of-month
    /// lands at or before `now`, the result advances one more period so the
    /// occurrence is always in the future.
    ///
    /// When `day_of_month` exceeds the target month's length the day is
    /// clamped to the last day of that month (31 -> Feb 28/29); occurrences
    /// are never skipped and never spill into the following month.
    ///
    /// Returns `None` only when the date arithmetic cannot produce a valid
    /// date (degenerate inputs such as an out-of-range weekday set).
    pub fn next_due_date(
        &self,
        last_due: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let interval = i64::from(self.interval.max(1));
        match &self.frequency {
            Frequency::Daily | Frequency::Custom => Some(last_due + Duration::days(interval)),
            Frequency::Weekly { days_of_week } => {
                if days_of_week.is_empty() {
                    Some(last_due + Duration::days(7 * interval))
                } else {
                    (1..=7)
                        .map(|d| last_due + Duration::days(d))
                        .find(|c| days_of_week.contains(&weekday_index(c.weekday())))
                }
            }
            Frequency::Biweekly => Some(last_due + Duration::days(14 * interval)),
            Frequency::Monthly { day_of_month } => {
                let mut next = add_months(last_due, interval, *day_of_month)?;
                if next <= now {
                    next = add_months(next, 1, *day_of_month)?;
                }
                Some(next)
            }
            Frequency::Yearly {
                month,
                day_of_month,
            } => {
                let year = last_due.year().checked_add(i32::try_from(interval).ok()?)?;
                let mut next = compose(last_due, year, *month, *day_of_month)?;
                if next <= now {
                    next = compose(next, next.year().checked_add(1)?, *month, *day_of_month)?;
                }
                Some(next)
            }
        }
    }
}

fn weekday_index(day: Weekday) -> u8 {
    day.num_days_from_sunday() as u8
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(next.signed_duration_since(first).num_days() as u32)
}

/// Build a date at `year`/`month` with the day clamped into the month,
/// keeping the time-of-day of `template`.
fn compose(
    template: DateTime<Utc>,
    year: i32,
    month: u32,
    day: u32,
) -> Option<DateTime<Utc>> {
    let day = day.max(1).min(days_in_month(year, month)?);
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(Utc.from_utc_datetime(&date.and_time(template.time())))
}

/// Advance `dt` by `months`, pinning the day to `day_of_month` when set.
fn add_months(
    dt: DateTime<Utc>,
    months: i64,
    day_of_month: Option<u32>,
) -> Option<DateTime<Utc>> {
    let total = i64::from(dt.year()) * 12 + i64::from(dt.month0()) + months;
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = total.rem_euclid(12) as u32 + 1;
    compose(dt, year, month, day_of_month.unwrap_or_else(|| dt.day()))
}
