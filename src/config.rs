//! Extractor configuration
//!
//! The JSON config file is read once at startup and validated into an
//! immutable [`TapConfig`]. Every invalid or missing required setting is a
//! [`ConfigError`] before any query is issued.

use crate::bookmark::DELIMITER;
use crate::extractor::config::DEFAULT_HISTORICAL_START;
use crate::extractor::{ContinuationPolicy, ExtractionPlan, FailurePolicy, MonthBound, WallClockBound};
use crate::fetcher::{IndexAuth, IndexConfig};
use crate::region::RegionScope;
use crate::window::{format_date, parse_date};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("IO error: {0}")]
    IoError(String),

    /// Config file is not valid JSON or has wrongly typed values
    #[error("invalid config file: {0}")]
    ParseError(String),

    /// A required key is absent
    #[error("missing required config key '{0}'")]
    MissingKey(&'static str),

    /// A key holds an unusable value
    #[error("invalid value for '{key}': {message}")]
    InvalidValue {
        /// Config key
        key: &'static str,
        /// What is wrong
        message: String,
    },
}

/// Sync mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// Bounded by one calendar month
    #[default]
    Month,
    /// Runs until caught up with today
    Continuous,
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "month" => Ok(SyncMode::Month),
            "continuous" => Ok(SyncMode::Continuous),
            _ => Err(format!("Invalid mode: {s}. Valid options: month, continuous")),
        }
    }
}

/// `regions` is either the literal `"all"` or an explicit list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RegionsSetting {
    Keyword(String),
    List(Vec<String>),
}

/// Config file as written by the user
#[derive(Debug, Deserialize)]
struct RawConfig {
    mode: Option<String>,
    year_month: Option<String>,
    state_abbrev: Option<String>,
    regions: Option<RegionsSetting>,
    start_date: Option<String>,
    extract_until_date: Option<String>,
    on_error: Option<String>,
    host: Option<String>,
    index: Option<String>,
    username: Option<String>,
    password: Option<String>,
    access_token: Option<String>,
    region_field: Option<String>,
    date_field: Option<String>,
    page_size: Option<usize>,
    scroll_keep_alive: Option<String>,
    max_retries: Option<u32>,
    timeout_secs: Option<u64>,
}

/// Validated extractor configuration
#[derive(Debug, Clone)]
pub struct TapConfig {
    /// Sync mode
    pub mode: SyncMode,
    /// First day of the month to extract, month mode only
    pub period_marker: Option<NaiveDate>,
    /// Regions to extract
    pub regions: RegionScope,
    /// Historical start date for continuous runs
    pub start_date: NaiveDate,
    /// Inclusive cap on the extracted days
    pub extract_until_date: Option<NaiveDate>,
    /// Bookmark handling on failure
    pub failure_policy: FailurePolicy,
    /// Remote index settings
    pub index: IndexConfig,
}

impl TapConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {e}", path.display())))?;
        let config = Self::from_json(&contents)?;
        debug!(path = %path.display(), mode = ?config.mode, "Config loaded");
        Ok(config)
    }

    /// Parse and validate a config document
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            serde_json::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> Result<Self, ConfigError> {
        let mode = match raw.mode.as_deref() {
            Some(value) => SyncMode::from_str(value)
                .map_err(|message| ConfigError::InvalidValue { key: "mode", message })?,
            None => SyncMode::default(),
        };

        let period_marker = match (mode, raw.year_month.as_deref()) {
            (SyncMode::Month, None) => return Err(ConfigError::MissingKey("year_month")),
            (_, Some(value)) => Some(date_setting("year_month", value)?),
            (SyncMode::Continuous, None) => None,
        };

        let start_date = date_setting(
            "start_date",
            raw.start_date.as_deref().unwrap_or(DEFAULT_HISTORICAL_START),
        )?;
        let extract_until_date = raw
            .extract_until_date
            .as_deref()
            .map(|value| date_setting("extract_until_date", value))
            .transpose()?;

        let regions = region_scope(raw.state_abbrev, raw.regions)?;

        let failure_policy = match raw.on_error.as_deref() {
            Some(value) => FailurePolicy::from_str(value)
                .map_err(|message| ConfigError::InvalidValue { key: "on_error", message })?,
            None => FailurePolicy::default(),
        };

        let index = index_config(IndexSettings {
            host: raw.host,
            index: raw.index,
            username: raw.username,
            password: raw.password,
            access_token: raw.access_token,
            region_field: raw.region_field,
            date_field: raw.date_field,
            page_size: raw.page_size,
            scroll_keep_alive: raw.scroll_keep_alive,
            max_retries: raw.max_retries,
            timeout_secs: raw.timeout_secs,
        })?;

        Ok(Self {
            mode,
            period_marker,
            regions,
            start_date,
            extract_until_date,
            failure_policy,
            index,
        })
    }

    /// Override the retry count of the index client
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.index.max_retries = max_retries;
        self
    }

    /// Continuation policy for the configured mode
    pub fn continuation_policy(&self) -> Result<Box<dyn ContinuationPolicy>, ConfigError> {
        match self.mode {
            SyncMode::Month => {
                let marker = self
                    .period_marker
                    .ok_or(ConfigError::MissingKey("year_month"))?;
                let policy = MonthBound::new(&format_date(marker), self.extract_until_date)
                    .map_err(|e| ConfigError::InvalidValue {
                        key: "year_month",
                        message: e.to_string(),
                    })?;
                Ok(Box::new(policy))
            }
            SyncMode::Continuous => Ok(Box::new(WallClockBound::new(
                self.start_date,
                self.extract_until_date,
            ))),
        }
    }

    /// Extraction plan for `stream`
    pub fn extraction_plan(&self, stream: &str) -> ExtractionPlan {
        ExtractionPlan {
            stream: stream.to_string(),
            regions: self.regions.clone(),
            failure_policy: self.failure_policy,
        }
    }
}

fn date_setting(key: &'static str, value: &str) -> Result<NaiveDate, ConfigError> {
    parse_date(value).map_err(|e| ConfigError::InvalidValue {
        key,
        message: e.to_string(),
    })
}

fn region_code(key: &'static str, code: &str) -> Result<String, ConfigError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ConfigError::InvalidValue {
            key,
            message: "region code is empty".to_string(),
        });
    }
    if code.contains(DELIMITER) {
        return Err(ConfigError::InvalidValue {
            key,
            message: format!("region code '{code}' contains '{DELIMITER}'"),
        });
    }
    Ok(code.to_string())
}

fn region_scope(
    state_abbrev: Option<String>,
    regions: Option<RegionsSetting>,
) -> Result<RegionScope, ConfigError> {
    match (state_abbrev, regions) {
        (Some(_), Some(_)) => Err(ConfigError::InvalidValue {
            key: "regions",
            message: "'state_abbrev' and 'regions' are mutually exclusive".to_string(),
        }),
        (Some(code), None) => Ok(RegionScope::Single(region_code("state_abbrev", &code)?)),
        (None, Some(RegionsSetting::Keyword(keyword))) if keyword.eq_ignore_ascii_case("all") => {
            Ok(RegionScope::all_states())
        }
        (None, Some(RegionsSetting::Keyword(keyword))) => Err(ConfigError::InvalidValue {
            key: "regions",
            message: format!("expected \"all\" or a list of region codes, got \"{keyword}\""),
        }),
        (None, Some(RegionsSetting::List(codes))) => {
            if codes.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "regions",
                    message: "region list is empty".to_string(),
                });
            }
            let codes = codes
                .iter()
                .map(|code| region_code("regions", code))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(RegionScope::List(codes))
        }
        (None, None) => Ok(RegionScope::Unpartitioned),
    }
}

struct IndexSettings {
    host: Option<String>,
    index: Option<String>,
    username: Option<String>,
    password: Option<String>,
    access_token: Option<String>,
    region_field: Option<String>,
    date_field: Option<String>,
    page_size: Option<usize>,
    scroll_keep_alive: Option<String>,
    max_retries: Option<u32>,
    timeout_secs: Option<u64>,
}

fn index_config(settings: IndexSettings) -> Result<IndexConfig, ConfigError> {
    let mut config = IndexConfig::default();

    if let Some(host) = settings.host {
        if !host.starts_with("http://") && !host.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: "host",
                message: format!("'{host}' is not an http(s) URL"),
            });
        }
        config.host = host;
    }
    if let Some(index) = settings.index {
        config.index = index;
    }

    match (settings.access_token, settings.username) {
        (Some(token), _) => config.auth = IndexAuth::Bearer(token),
        (None, Some(username)) => {
            config.auth = IndexAuth::Basic {
                username,
                password: settings.password.unwrap_or_default(),
            }
        }
        (None, None) => {}
    }

    if let Some(field) = settings.region_field {
        config.region_field = field;
    }
    if let Some(field) = settings.date_field {
        config.date_field = field;
    }
    if let Some(page_size) = settings.page_size {
        if page_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "page_size",
                message: "must be greater than zero".to_string(),
            });
        }
        config.page_size = page_size;
    }
    if let Some(keep_alive) = settings.scroll_keep_alive {
        config.scroll_keep_alive = keep_alive;
    }
    if let Some(max_retries) = settings.max_retries {
        config.max_retries = max_retries;
    }
    if let Some(timeout_secs) = settings.timeout_secs {
        config.timeout = Duration::from_secs(timeout_secs);
    }

    Ok(config)
}
