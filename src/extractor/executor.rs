//! Extraction loop
//!
//! ```text
//! INIT -> SELECT_REGION -> STREAM_DAY -> ADVANCE_DAY -> { STREAM_DAY | SELECT_NEXT_REGION | DONE }
//!                              \-> FAILED
//! ```
//!
//! Regions, days and pages are processed strictly one after another.

use crate::bookmark::Bookmark;
use crate::extractor::policy::ContinuationPolicy;
use crate::extractor::{ExtractError, FailurePolicy, ScanFailure};
use crate::fetcher::HitSource;
use crate::metrics;
use crate::output::RecordSink;
use crate::projector::project;
use crate::region::{remaining_regions, RegionScope};
use crate::window::{format_date, parse_date, Window};
use chrono::NaiveDate;
use futures_util::StreamExt;
use tracing::{debug, error, info, warn, Instrument};

/// Position of the extraction loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    /// Region being extracted, `None` when unpartitioned
    pub region: Option<String>,
    /// Next day to query
    pub date: NaiveDate,
}

impl Cursor {
    /// Create a cursor
    pub fn new(region: Option<String>, date: NaiveDate) -> Self {
        Self { region, date }
    }

    /// Bookmark resuming at this cursor
    pub fn bookmark(&self) -> Bookmark {
        Bookmark::new(self.region.clone(), format_date(self.date))
    }
}

/// Immutable description of one stream's extraction
#[derive(Debug, Clone)]
pub struct ExtractionPlan {
    /// Stream records are emitted under
    pub stream: String,
    /// Regions to extract
    pub regions: RegionScope,
    /// Bookmark handling on failure
    pub failure_policy: FailurePolicy,
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The continuation policy was exhausted for every region
    Completed,
    /// The cursor fell outside the policy's scope
    OutOfScope,
}

/// Result of a completed extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Bookmark to persist
    pub bookmark: Bookmark,
    /// Records handed to the sink
    pub records: u64,
    /// Windows scanned
    pub windows: u64,
    /// Why the loop stopped
    pub stop: StopReason,
}

/// Drives the extraction loop for one stream
pub struct Extractor {
    source: Box<dyn HitSource>,
    policy: Box<dyn ContinuationPolicy>,
    plan: ExtractionPlan,
}

impl Extractor {
    /// Create an extractor
    pub fn new(
        source: Box<dyn HitSource>,
        policy: Box<dyn ContinuationPolicy>,
        plan: ExtractionPlan,
    ) -> Self {
        Self {
            source,
            policy,
            plan,
        }
    }

    /// Run the loop from `raw_bookmark` until the policy is exhausted
    ///
    /// # Arguments
    /// * `raw_bookmark` - Persisted bookmark value, if any
    /// * `sink` - Receives every record as a one-element batch, in scan order
    ///
    /// # Returns
    /// The outcome with the bookmark a later run resumes from
    ///
    /// # Errors
    /// Malformed bookmarks and region inconsistencies fail before any query.
    /// A failing window ends the run with [`ExtractError::WindowFailed`].
    pub async fn run<W>(
        &self,
        raw_bookmark: Option<&str>,
        sink: &mut W,
    ) -> Result<SyncOutcome, ExtractError>
    where
        W: RecordSink + ?Sized,
    {
        let span = tracing::info_span!(
            "extract",
            stream = %self.plan.stream,
            policy = self.policy.name(),
        );
        self.run_from(raw_bookmark, sink).instrument(span).await
    }

    async fn run_from<W>(
        &self,
        raw_bookmark: Option<&str>,
        sink: &mut W,
    ) -> Result<SyncOutcome, ExtractError>
    where
        W: RecordSink + ?Sized,
    {
        let bookmark = Bookmark::decode(raw_bookmark);
        let resume_date = match bookmark.date.as_deref() {
            Some(value) => Some(parse_date(value).map_err(|source| {
                ExtractError::MalformedBookmark {
                    value: value.to_string(),
                    source,
                }
            })?),
            None => None,
        };

        if bookmark.is_empty() {
            info!(
                start = %format_date(self.policy.start_date()),
                "No bookmark found, starting from the default start date"
            );
        } else {
            info!(bookmark = %bookmark, "Bookmark read, resuming");
        }

        let visits = self.region_visits(&bookmark, resume_date)?;
        let mut last = visits
            .first()
            .cloned()
            .unwrap_or_else(|| Cursor::new(None, resume_date.unwrap_or(self.policy.start_date())));
        let mut records = 0u64;
        let mut windows = 0u64;
        let mut stop = StopReason::Completed;

        'regions: for mut cursor in visits {
            info!(
                region = cursor.region.as_deref().unwrap_or("*"),
                from = %format_date(cursor.date),
                "Starting region"
            );

            while self.policy.should_continue(cursor.date) {
                if !self.policy.in_scope(cursor.date) {
                    warn!(
                        date = %format_date(cursor.date),
                        "Cursor date is outside the extraction scope, stopping"
                    );
                    stop = StopReason::OutOfScope;
                    last = cursor;
                    break 'regions;
                }

                let window = Window::day(cursor.date)?;
                match self.stream_window(&cursor, &window, sink).await {
                    Ok(count) => {
                        records += count;
                        windows += 1;
                    }
                    Err(failure) => return Err(self.fail(cursor, failure)),
                }
                cursor.date = window.end;
            }

            debug!(
                region = cursor.region.as_deref().unwrap_or("*"),
                reached = %format_date(cursor.date),
                "Region caught up"
            );
            last = cursor;
        }

        let outcome = SyncOutcome {
            bookmark: last.bookmark(),
            records,
            windows,
            stop,
        };
        info!(
            bookmark = %outcome.bookmark,
            records = outcome.records,
            windows = outcome.windows,
            "Extraction finished"
        );
        Ok(outcome)
    }

    /// Cursors to visit, one per region, in order
    fn region_visits(
        &self,
        bookmark: &Bookmark,
        resume_date: Option<NaiveDate>,
    ) -> Result<Vec<Cursor>, ExtractError> {
        let start = self.policy.start_date();

        match &self.plan.regions {
            RegionScope::Unpartitioned => Ok(vec![Cursor::new(None, resume_date.unwrap_or(start))]),
            RegionScope::Single(code) => {
                let date = match bookmark.region.as_deref() {
                    Some(previous) if previous != code => {
                        warn!(
                            bookmarked = previous,
                            configured = %code,
                            "Bookmark belongs to another region, starting from the default start date"
                        );
                        start
                    }
                    _ => resume_date.unwrap_or(start),
                };
                Ok(vec![Cursor::new(Some(code.clone()), date)])
            }
            RegionScope::List(codes) => {
                let remaining = remaining_regions(codes, bookmark.region.as_deref())?;
                debug!(remaining = ?remaining, "Regions left to visit");
                Ok(remaining
                    .into_iter()
                    .enumerate()
                    .map(|(i, code)| {
                        // Every region after the resumed one has its own history
                        let date = if i == 0 {
                            resume_date.unwrap_or(start)
                        } else {
                            start
                        };
                        Cursor::new(Some(code), date)
                    })
                    .collect())
            }
        }
    }

    /// Scan one window and emit its records
    async fn stream_window<W>(
        &self,
        cursor: &Cursor,
        window: &Window,
        sink: &mut W,
    ) -> Result<u64, ScanFailure>
    where
        W: RecordSink + ?Sized,
    {
        info!(
            region = cursor.region.as_deref().unwrap_or("*"),
            window = %window,
            "Extracting window"
        );

        let context = self.policy.record_context(window.start);
        let mut hits = self
            .source
            .scan(cursor.region.as_deref(), window.start, window.end)
            .await?;

        let mut count = 0u64;
        while let Some(hit) = hits.next().await {
            let record = project(&hit?, &context)?;
            sink.write_records(&self.plan.stream, std::slice::from_ref(&record))?;
            count += 1;
        }

        metrics::record_window(&self.plan.stream, count);
        debug!(window = %window, records = count, "Window complete");
        Ok(count)
    }

    fn fail(&self, cursor: Cursor, failure: ScanFailure) -> ExtractError {
        error!(
            region = cursor.region.as_deref().unwrap_or("*"),
            date = %format_date(cursor.date),
            error = %failure,
            source = %self.source.describe(),
            "Fatal error while extracting window"
        );
        metrics::record_extraction_failure(&self.plan.stream);

        let checkpoint = match self.plan.failure_policy {
            FailurePolicy::Abort => None,
            FailurePolicy::Checkpoint => Some(cursor.bookmark()),
        };

        ExtractError::WindowFailed {
            region: cursor.region,
            date: cursor.date,
            checkpoint,
            source: failure,
        }
    }
}
