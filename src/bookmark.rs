//! Bookmark codec
//!
//! A bookmark is the resumption marker persisted in tap state. It encodes the
//! last region attempted and the next day to query as `region|YYYY-MM-DD`, or
//! a bare `YYYY-MM-DD` when extraction is not region-partitioned.

use serde::{Deserialize, Serialize};

/// Delimiter between region code and date
pub const DELIMITER: char = '|';

/// Key under which the bookmark is stored in a stream's state
pub const BOOKMARK_KEY: &str = "state_abbrev_from_date";

/// Decoded bookmark
///
/// The date is kept as text; callers parse it so that a malformed value is
/// reported where it is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Last region attempted, if extraction is region-partitioned
    pub region: Option<String>,
    /// Next day to query
    pub date: Option<String>,
}

impl Bookmark {
    /// Build a bookmark from a region and date
    pub fn new(region: Option<String>, date: impl Into<String>) -> Self {
        Self {
            region,
            date: Some(date.into()),
        }
    }

    /// Decode a raw bookmark value
    ///
    /// Splits on the first `|`. An absent or empty value decodes to an empty
    /// bookmark, and an empty part decodes to `None`. Parts are kept verbatim,
    /// so `decode` inverts [`encode`] for every non-empty region without a
    /// `|`.
    pub fn decode(raw: Option<&str>) -> Self {
        let raw = match raw {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Self::default(),
        };

        match raw.split_once(DELIMITER) {
            Some((region, date)) => Self {
                region: non_empty(region),
                date: non_empty(date),
            },
            None => Self {
                region: None,
                date: Some(raw.to_string()),
            },
        }
    }

    /// Encode into the persisted string form
    ///
    /// Returns `None` when the bookmark carries no date.
    pub fn encode(&self) -> Option<String> {
        self.date
            .as_deref()
            .map(|date| encode(self.region.as_deref(), date))
    }

    /// Whether neither part is set
    pub fn is_empty(&self) -> bool {
        self.region.is_none() && self.date.is_none()
    }
}

/// Join a region and date into a bookmark value
pub fn encode(region: Option<&str>, date: &str) -> String {
    match region {
        Some(region) => format!("{region}{DELIMITER}{date}"),
        None => date.to_string(),
    }
}

fn non_empty(part: &str) -> Option<String> {
    if part.is_empty() {
        None
    } else {
        Some(part.to_string())
    }
}

impl std::fmt::Display for Bookmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.encode() {
            Some(value) => write!(f, "{value}"),
            None => write!(f, "<empty>"),
        }
    }
}
