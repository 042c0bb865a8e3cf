// crates/clinvara-core/src/core/time.rs
// ============================================================================
// Module: Clinvara Time Model
// Description: Audit timestamps and calendar dates used by temporal criteria.
// Purpose: Keep evaluation replayable by passing every time value explicitly.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Two time values exist in the engine. [`Timestamp`] stamps overrides and
//! audit entries and always comes from an injected clock. [`ClinicalDate`] is
//! a calendar date used by temporal predicates and derived ages; evaluation
//! only ever compares it against the caller-supplied reference date, so the
//! matching engine never reads wall-clock time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de;
use time::Date;
use time::Duration;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

// ============================================================================
// SECTION: Timestamps
// ============================================================================

/// Unix epoch milliseconds supplied by a clock.
///
/// # Invariants
/// - Values are explicitly provided by callers; the core never reads wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Calendar Dates
// ============================================================================

/// Wire format for calendar dates.
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Calendar date in ISO `YYYY-MM-DD` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClinicalDate(Date);

/// Error raised when a calendar date cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date (expected YYYY-MM-DD): {0}")]
pub struct DateParseError(pub String);

impl ClinicalDate {
    /// Wraps a `time::Date`.
    #[must_use]
    pub const fn new(date: Date) -> Self {
        Self(date)
    }

    /// Parses an ISO `YYYY-MM-DD` date.
    ///
    /// # Errors
    ///
    /// Returns [`DateParseError`] when the input is not a valid calendar date.
    pub fn parse(input: &str) -> Result<Self, DateParseError> {
        Date::parse(input.trim(), DATE_FORMAT)
            .map(Self)
            .map_err(|_| DateParseError(input.to_string()))
    }

    /// Returns the wrapped date.
    #[must_use]
    pub const fn date(self) -> Date {
        self.0
    }

    /// Shifts the date by a signed number of days, or `None` when out of range.
    #[must_use]
    pub fn add_days(self, days: i64) -> Option<Self> {
        self.0.checked_add(Duration::days(days)).map(Self)
    }

    /// Returns completed years from `self` until `reference`.
    ///
    /// Returns `None` when `reference` precedes `self`.
    #[must_use]
    pub fn whole_years_until(self, reference: Self) -> Option<i32> {
        if reference < self {
            return None;
        }
        let start = self.0;
        let end = reference.0;
        let mut years = end.year() - start.year();
        if (u8::from(end.month()), end.day()) < (u8::from(start.month()), start.day()) {
            years -= 1;
        }
        Some(years)
    }
}

impl fmt::Display for ClinicalDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.format(DATE_FORMAT) {
            Ok(text) => f.write_str(&text),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl FromStr for ClinicalDate {
    type Err = DateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ClinicalDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClinicalDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(de::Error::custom)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
