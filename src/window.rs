//! Calendar-day window arithmetic
//!
//! Extraction always advances one calendar day at a time. A run scoped to a
//! month is described by a period marker (`YYYY-MM-DD`, normally the first day
//! of the month).

use chrono::{Datelike, NaiveDate};

/// Date format used by period markers, bookmarks and index queries
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Window calculation errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WindowError {
    /// Input is not a `YYYY-MM-DD` date
    #[error("invalid date '{input}': expected YYYY-MM-DD")]
    InvalidDate {
        /// The rejected input
        input: String,
    },

    /// Advancing the window would leave the supported calendar range
    #[error("date {0} has no following day")]
    Overflow(NaiveDate),
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(input: &str) -> Result<NaiveDate, WindowError> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).map_err(|_| WindowError::InvalidDate {
        input: input.to_string(),
    })
}

/// Format a date as `YYYY-MM-DD`
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Last calendar day of the month named by `period_marker`
///
/// `2021-02-01` gives `2021-02-28`, `2020-02-01` gives `2020-02-29`.
pub fn month_end(period_marker: &str) -> Result<NaiveDate, WindowError> {
    let marker = parse_date(period_marker)?;
    Ok(last_day_of_month(marker))
}

/// Whether `date` lies in `[period_marker, month_end(period_marker)]`
pub fn in_month(date: NaiveDate, period_marker: &str) -> Result<bool, WindowError> {
    let marker = parse_date(period_marker)?;
    Ok(date >= marker && date <= last_day_of_month(marker))
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };

    // Only the last representable month has no successor
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// Half-open one-day query window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Inclusive lower bound
    pub start: NaiveDate,
    /// Exclusive upper bound, always `start + 1 day`
    pub end: NaiveDate,
}

impl Window {
    /// The window covering exactly the day `start`
    pub fn day(start: NaiveDate) -> Result<Self, WindowError> {
        let end = start.succ_opt().ok_or(WindowError::Overflow(start))?;
        Ok(Self { start, end })
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", format_date(self.start), format_date(self.end))
    }
}
