// crates/canteen-core/src/core/clock.rs
// ============================================================================
// Module: Canteen Clock
// Description: Injectable wall clock and calendar-month helpers.
// Purpose: Keep time-dependent logic (token expiry, monthly income) testable.
// Dependencies: thiserror, time
// ============================================================================

//! ## Overview
//! Services read time through [`Clock`] so tests can pin it with
//! [`FixedClock`]. Month windows are half-open `[start, end)` ranges in UTC
//! and are keyed as `YYYY-MM`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::sync::PoisonError;

use thiserror::Error;
use time::Date;
use time::Duration;
use time::Month;
use time::OffsetDateTime;
use time::UtcOffset;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Time conversion errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeError {
    /// Timestamp was outside the representable range.
    #[error("timestamp out of range: {0}")]
    OutOfRange(String),
    /// Timestamp could not be formatted or parsed.
    #[error("timestamp format error: {0}")]
    Format(String),
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> OffsetDateTime;
}

/// Clock backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock pinned to a settable instant.
#[derive(Debug)]
pub struct FixedClock {
    /// Current instant.
    now: Mutex<OffsetDateTime>,
}

impl FixedClock {
    /// Creates a clock pinned at `now`.
    #[must_use]
    pub const fn new(now: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *guard += by;
    }

    /// Pins the clock at `at`.
    pub fn set(&self, at: OffsetDateTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

/// Returns unix epoch milliseconds for a timestamp.
#[must_use]
pub fn to_unix_millis(value: OffsetDateTime) -> i64 {
    let millis = value.unix_timestamp_nanos() / 1_000_000;
    i64::try_from(millis).unwrap_or(i64::MAX)
}

/// Builds a UTC timestamp from unix epoch milliseconds.
///
/// # Errors
///
/// Returns [`TimeError::OutOfRange`] when the value is not representable.
pub fn from_unix_millis(millis: i64) -> Result<OffsetDateTime, TimeError> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .map_err(|err| TimeError::OutOfRange(err.to_string()))
}

/// Formats a timestamp as RFC 3339.
///
/// # Errors
///
/// Returns [`TimeError::Format`] when formatting fails.
pub fn format_rfc3339(value: OffsetDateTime) -> Result<String, TimeError> {
    value.format(&Rfc3339).map_err(|err| TimeError::Format(err.to_string()))
}

// ============================================================================
// SECTION: Month Windows
// ============================================================================

/// One calendar month in UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthWindow {
    /// `YYYY-MM` key.
    pub key: String,
    /// First instant of the month.
    pub start: OffsetDateTime,
    /// First instant of the following month.
    pub end: OffsetDateTime,
}

impl MonthWindow {
    /// Returns the month containing `instant`.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::OutOfRange`] at the edges of the calendar.
    pub fn containing(instant: OffsetDateTime) -> Result<Self, TimeError> {
        let utc = instant.to_offset(UtcOffset::UTC);
        Self::for_month(utc.year(), utc.month())
    }

    /// Returns the month before this one, crossing year boundaries.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::OutOfRange`] at the edges of the calendar.
    pub fn previous(&self) -> Result<Self, TimeError> {
        let (year, month) = (self.start.year(), self.start.month());
        if month == Month::January {
            Self::for_month(year - 1, Month::December)
        } else {
            Self::for_month(year, month.previous())
        }
    }

    /// Returns the window for a specific year and month.
    fn for_month(year: i32, month: Month) -> Result<Self, TimeError> {
        let start = first_instant(year, month)?;
        let end = if month == Month::December {
            first_instant(year + 1, Month::January)?
        } else {
            first_instant(year, month.next())?
        };
        Ok(Self {
            key: format!("{year:04}-{:02}", u8::from(month)),
            start,
            end,
        })
    }
}

/// Returns the last `count` months up to and including the month of `now`,
/// latest first.
///
/// # Errors
///
/// Returns [`TimeError::OutOfRange`] at the edges of the calendar.
pub fn last_months(now: OffsetDateTime, count: usize) -> Result<Vec<MonthWindow>, TimeError> {
    let mut windows = Vec::with_capacity(count);
    if count == 0 {
        return Ok(windows);
    }
    let mut current = MonthWindow::containing(now)?;
    windows.push(current.clone());
    while windows.len() < count {
        current = current.previous()?;
        windows.push(current.clone());
    }
    Ok(windows)
}

/// Returns midnight UTC on the first day of the month.
fn first_instant(year: i32, month: Month) -> Result<OffsetDateTime, TimeError> {
    let date = Date::from_calendar_date(year, month, 1)
        .map_err(|err| TimeError::OutOfRange(err.to_string()))?;
    Ok(date.midnight().assume_utc())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
