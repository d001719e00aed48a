//! Continuation policies
//!
//! One extraction loop serves every sync mode. What differs between modes is
//! where a cursor starts, whether a day is in scope, when the loop stops, and
//! which context is stamped on records. Those decisions live here.

use crate::projector::RecordContext;
use crate::window::{format_date, in_month, month_end, parse_date, WindowError};
use chrono::{NaiveDate, Utc};

/// Decides how far the extraction loop runs
pub trait ContinuationPolicy: Send + Sync {
    /// Day a cursor starts from when there is no bookmark, and for each newly
    /// visited region
    fn start_date(&self) -> NaiveDate;

    /// Whether `date` belongs to the run's scope. Out-of-scope days stop the
    /// whole loop without advancing.
    fn in_scope(&self, _date: NaiveDate) -> bool {
        true
    }

    /// Whether the loop should query the window starting at `date`
    fn should_continue(&self, date: NaiveDate) -> bool;

    /// Context injected into records read from the window starting at
    /// `window_start`
    fn record_context(&self, window_start: NaiveDate) -> RecordContext;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Bounded by a calendar month
#[derive(Debug, Clone)]
pub struct MonthBound {
    period_marker: String,
    first_day: NaiveDate,
    last_day: NaiveDate,
    until: Option<NaiveDate>,
}

impl MonthBound {
    /// Policy for the month named by `period_marker`, optionally capped at
    /// `until` (inclusive)
    pub fn new(period_marker: &str, until: Option<NaiveDate>) -> Result<Self, WindowError> {
        let first_day = parse_date(period_marker)?;
        let last_day = month_end(period_marker)?;
        Ok(Self {
            period_marker: format_date(first_day),
            first_day,
            last_day,
            until,
        })
    }

    /// Last day of the month
    pub fn month_end(&self) -> NaiveDate {
        self.last_day
    }
}

impl ContinuationPolicy for MonthBound {
    fn start_date(&self) -> NaiveDate {
        self.first_day
    }

    fn in_scope(&self, date: NaiveDate) -> bool {
        // The marker was validated in `new`
        in_month(date, &self.period_marker).unwrap_or(false)
    }

    fn should_continue(&self, date: NaiveDate) -> bool {
        date <= self.last_day && self.until.map_or(true, |until| date <= until)
    }

    fn record_context(&self, _window_start: NaiveDate) -> RecordContext {
        RecordContext::period(self.period_marker.clone())
    }

    fn name(&self) -> &'static str {
        "month"
    }
}

/// Source of the current date
pub trait Clock: Send + Sync {
    /// Today's date
    fn today(&self) -> NaiveDate;
}

/// Wall clock in UTC
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Clock pinned to a fixed date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Bounded by the wall clock: runs until caught up with today
///
/// `today` is read again before every window, so days that become due during
/// a long run are picked up by the same run.
#[derive(Debug, Clone)]
pub struct WallClockBound<C: Clock = SystemClock> {
    start: NaiveDate,
    until: Option<NaiveDate>,
    clock: C,
}

impl WallClockBound<SystemClock> {
    /// Policy starting at `start` and following the system clock
    pub fn new(start: NaiveDate, until: Option<NaiveDate>) -> Self {
        Self::with_clock(start, until, SystemClock)
    }
}

impl<C: Clock> WallClockBound<C> {
    /// Policy with an explicit clock
    pub fn with_clock(start: NaiveDate, until: Option<NaiveDate>, clock: C) -> Self {
        Self { start, until, clock }
    }
}

impl<C: Clock> ContinuationPolicy for WallClockBound<C> {
    fn start_date(&self) -> NaiveDate {
        self.start
    }

    fn should_continue(&self, date: NaiveDate) -> bool {
        date <= self.clock.today() && self.until.map_or(true, |until| date <= until)
    }

    fn record_context(&self, window_start: NaiveDate) -> RecordContext {
        RecordContext::window(window_start)
    }

    fn name(&self) -> &'static str {
        "continuous"
    }
}
