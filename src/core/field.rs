//! Schedule field compilation.
//!
//! Each field of a crontab time specification (minute, hour, day of month,
//! month, weekday) compiles to a fixed-length boolean domain vector marking
//! which units are eligible. The grammar per comma-separated term is
//! `('*' | value | value-value) ['/' step]`.

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur when compiling a schedule field.
#[derive(Debug, Error)]
pub enum FieldError {
    /// The field text does not match the grammar.
    #[error("can't make sense of '{0}'")]
    Malformed(String),

    /// A resolved value falls outside the field's domain.
    #[error("value out of range in '{0}'")]
    OutOfRange(String),

    /// An unrecognized weekday name.
    #[error("unrecognized weekday name: {0}")]
    UnknownWeekday(String),
}

/// The five crontab field positions and their domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Minute,
    Hour,
    DayOfMonth,
    Month,
    Weekday,
}

impl FieldKind {
    /// Length of the domain vector for this field.
    pub fn len(self) -> usize {
        match self {
            FieldKind::Minute => 60,
            FieldKind::Hour => 24,
            FieldKind::DayOfMonth => 31,
            FieldKind::Month => 12,
            FieldKind::Weekday => 7,
        }
    }

    /// Smallest value the field accepts.
    pub fn min(self) -> u32 {
        match self {
            FieldKind::Minute | FieldKind::Hour | FieldKind::Weekday => 0,
            FieldKind::DayOfMonth | FieldKind::Month => 1,
        }
    }

    /// Largest value the field accepts.
    pub fn max(self) -> u32 {
        match self {
            FieldKind::Minute => 59,
            FieldKind::Hour => 23,
            FieldKind::DayOfMonth => 31,
            FieldKind::Month => 12,
            FieldKind::Weekday => 6,
        }
    }

    fn is_weekday(self) -> bool {
        matches!(self, FieldKind::Weekday)
    }
}

/// A compiled domain vector for one schedule field.
///
/// Index 0 corresponds to the field's minimum value, so for day-of-month
/// index 0 means day 1 and for months index 0 means January.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    kind: FieldKind,
    bits: Vec<bool>,
}

// FieldKind is tiny; serialize it by name.
impl Serialize for FieldKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let name = match self {
            FieldKind::Minute => "minute",
            FieldKind::Hour => "hour",
            FieldKind::DayOfMonth => "day",
            FieldKind::Month => "month",
            FieldKind::Weekday => "weekday",
        };
        serializer.serialize_str(name)
    }
}

impl Field {
    /// Compile a textual field specification into a domain vector.
    ///
    /// # Example
    ///
    /// ```
    /// use chrond::core::field::{Field, FieldKind};
    ///
    /// let minutes = Field::compile("*/15", FieldKind::Minute).unwrap();
    /// assert!(minutes.contains(0));
    /// assert!(minutes.contains(45));
    /// assert!(!minutes.contains(20));
    /// ```
    pub fn compile(spec: &str, kind: FieldKind) -> Result<Field, FieldError> {
        let mut bits = vec![false; kind.len()];

        if spec.is_empty() {
            return Err(FieldError::Malformed(spec.to_string()));
        }

        for term in spec.split(',') {
            apply_term(term, spec, kind, &mut bits)?;
        }

        Ok(Field { kind, bits })
    }

    /// Whether the given unit value is eligible.
    ///
    /// `value` is in the field's natural domain (e.g. day 1..=31), not the
    /// vector index. Out-of-domain values are simply not eligible.
    pub fn contains(&self, value: u32) -> bool {
        if value < self.kind.min() {
            return false;
        }
        self.bits
            .get((value - self.kind.min()) as usize)
            .copied()
            .unwrap_or(false)
    }

    /// The field position this vector was compiled for.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Length of the domain vector.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Number of eligible units.
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }
}

/// Resolve one comma-separated term and set its bits.
fn apply_term(
    term: &str,
    spec: &str,
    kind: FieldKind,
    bits: &mut [bool],
) -> Result<(), FieldError> {
    // Split off an optional '/step' suffix.
    let (range, step) = match term.split_once('/') {
        Some((range, step)) => {
            let step: u32 = step
                .parse()
                .map_err(|_| FieldError::Malformed(spec.to_string()))?;
            (range, step)
        }
        None => (term, 1),
    };

    if step < 1 {
        return Err(FieldError::OutOfRange(spec.to_string()));
    }

    let (start, stop) = if range == "*" {
        (kind.min(), kind.max())
    } else {
        let (start_text, stop_text) = match range.split_once('-') {
            Some((start, stop)) => (start, stop),
            None => (range, range),
        };
        (
            parse_value(start_text, spec, kind)?,
            parse_value(stop_text, spec, kind)?,
        )
    };

    if start < kind.min() || start > kind.max() || stop < kind.min() || stop > kind.max() {
        return Err(FieldError::OutOfRange(spec.to_string()));
    }

    let mut position = start;
    while position <= stop {
        bits[(position - kind.min()) as usize] = true;
        position = match position.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }

    Ok(())
}

/// Parse a single bound, translating weekday names where applicable.
fn parse_value(text: &str, spec: &str, kind: FieldKind) -> Result<u32, FieldError> {
    if kind.is_weekday() {
        return parse_weekday(text);
    }
    text.parse()
        .map_err(|_| FieldError::Malformed(spec.to_string()))
}

/// Translate a weekday token to 0..=6 with 0 = Sunday.
///
/// Accepts numerals 0-7 (7 normalized to Sunday) and case-insensitive
/// day names or three-letter abbreviations.
fn parse_weekday(text: &str) -> Result<u32, FieldError> {
    if let Ok(n) = text.parse::<u32>() {
        return Ok(if n == 7 { 0 } else { n });
    }

    match text.to_lowercase().as_str() {
        "sun" | "sunday" => Ok(0),
        "mon" | "monday" => Ok(1),
        "tue" | "tuesday" => Ok(2),
        "wed" | "wednesday" => Ok(3),
        "thu" | "thursday" => Ok(4),
        "fri" | "friday" => Ok(5),
        "sat" | "saturday" => Ok(6),
        _ => Err(FieldError::UnknownWeekday(text.to_string())),
    }
}
