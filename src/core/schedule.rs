//! Five-field cron schedules and next-occurrence search.
//!
//! A [`CronSchedule`] holds one compiled domain vector per field plus the
//! `@reboot` marker. The next occurrence is found by walking forward one
//! minute at a time from the origin, up to a one-year horizon; an instant
//! matches iff all five field vectors have its bit set.

use chrono::{Datelike, Days, Months, NaiveDateTime, TimeDelta, Timelike};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::field::{Field, FieldError, FieldKind};

/// Errors that can occur when parsing a schedule expression.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// One of the five fields failed to compile.
    #[error("invalid {kind:?} field: {source}")]
    Field {
        kind: FieldKind,
        source: FieldError,
    },

    /// Fewer than five fields were supplied.
    #[error("expected five schedule fields, got {0}")]
    MissingFields(usize),
}

/// A compiled five-field cron schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CronSchedule {
    minutes: Field,
    hours: Field,
    days: Field,
    months: Field,
    weekdays: Field,
    reboot: bool,
}

impl CronSchedule {
    /// Compile the five leading whitespace-delimited fields of `expr`.
    ///
    /// Returns the schedule and the remainder of `expr` after the fields
    /// (the verbatim command text).
    pub fn parse(expr: &str) -> Result<(CronSchedule, &str), ScheduleError> {
        let mut rest = expr.trim_start();
        let mut specs = Vec::with_capacity(5);
        for _ in 0..5 {
            let (word, tail) = split_word(rest);
            if word.is_empty() {
                return Err(ScheduleError::MissingFields(specs.len()));
            }
            specs.push(word);
            rest = tail;
        }

        let compile = |spec: &str, kind: FieldKind| {
            Field::compile(spec, kind).map_err(|source| ScheduleError::Field { kind, source })
        };

        let schedule = CronSchedule {
            minutes: compile(specs[0], FieldKind::Minute)?,
            hours: compile(specs[1], FieldKind::Hour)?,
            days: compile(specs[2], FieldKind::DayOfMonth)?,
            months: compile(specs[3], FieldKind::Month)?,
            weekdays: compile(specs[4], FieldKind::Weekday)?,
            reboot: false,
        };

        Ok((schedule, rest))
    }

    /// A schedule fired once at daemon startup, never by the calculator.
    pub fn reboot() -> CronSchedule {
        let full = |kind| Field::compile("*", kind).unwrap_or_else(|_| unreachable!());
        CronSchedule {
            minutes: full(FieldKind::Minute),
            hours: full(FieldKind::Hour),
            days: full(FieldKind::DayOfMonth),
            months: full(FieldKind::Month),
            weekdays: full(FieldKind::Weekday),
            reboot: true,
        }
    }

    /// Whether this is an `@reboot` schedule.
    pub fn is_reboot(&self) -> bool {
        self.reboot
    }

    /// Whether the given instant's minute, hour, day, month, and weekday
    /// bits are all set. Plain conjunction across all five fields; there is
    /// no day-of-month / weekday OR special case.
    pub fn matches(&self, at: NaiveDateTime) -> bool {
        self.minutes.contains(at.minute())
            && self.hours.contains(at.hour())
            && self.days.contains(at.day())
            && self.months.contains(at.month())
            && self.weekdays.contains(at.weekday().num_days_from_sunday())
    }

    /// Find the first matching whole minute strictly after `origin`.
    ///
    /// Returns `None` for `@reboot` schedules and for schedules with no
    /// occurrence within one calendar year of the origin (e.g. Feb 30).
    pub fn next_after(&self, origin: NaiveDateTime) -> Option<NaiveDateTime> {
        if self.reboot {
            return None;
        }

        // Round up to the next whole minute. If the rounding failed to leave
        // the origin's minute, advance one more.
        let origin = origin.with_nanosecond(0).unwrap_or(origin);
        let mut candidate = origin + TimeDelta::seconds(60 - i64::from(origin.second()));
        if candidate.minute() == origin.minute() {
            candidate += TimeDelta::minutes(1);
        }

        let horizon = origin
            .checked_add_months(Months::new(12))
            .or_else(|| origin.checked_add_days(Days::new(366)))?;

        while candidate < horizon {
            if self.matches(candidate) {
                return Some(candidate);
            }
            candidate += TimeDelta::minutes(1);
        }

        debug!("No occurrence within one year of {origin}");
        None
    }
}

/// Consume the first whitespace-delimited word, returning it and the rest.
pub fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(end) => (&text[..end], text[end..].trim_start()),
        None => (text, ""),
    }
}
