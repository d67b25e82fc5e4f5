//! Configuration management

use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DIRECTORY_MAX_PAGES, DEFAULT_DIRECTORY_PAGE_SIZE, DEFAULT_DIRECTORY_REFRESH_SECS,
    DEFAULT_HTTP_BASE_BACKOFF_MS, DEFAULT_HTTP_MAX_ATTEMPTS, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_MAX_CONCURRENCY, DEFAULT_QUERY_DEADLINE_SECS, GOOGLE_CALENDAR_API_BASE,
    NEXT_EVENT_CANDIDATES, ONGOING_LOOKBACK_DAYS, ONGOING_PER_CALENDAR_LIMIT,
    PRIMARY_CALENDAR_ID, SEARCH_MAX_LIMIT, WEEK_MARKER_PATTERN,
};
use crate::errors::{Result, WhenisError};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub calendar: CalendarConfig,
    pub directory: DirectoryConfig,
    pub query: QueryConfig,
    pub http: HttpConfig,
}

/// Calendar API access
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub api_base_url: String,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub primary_calendar_id: String,
    /// IANA zone used to place date-only events at local midnight.
    pub timezone: String,
    pub event_location: Option<String>,
}

/// Directory cache behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub refresh_interval_secs: u64,
    pub page_size: u32,
    pub max_pages: u32,
    pub background_refresh: bool,
}

/// Scatter-gather and view selector tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub deadline_secs: u64,
    pub max_concurrency: usize,
    pub ongoing_lookback_days: i64,
    pub ongoing_per_calendar_limit: u32,
    pub search_max_limit: usize,
    pub next_event_candidates: u32,
    pub excluded_title_patterns: Vec<String>,
}

/// Outbound HTTP behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_attempts: usize,
    pub base_backoff_ms: u64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            api_base_url: GOOGLE_CALENDAR_API_BASE.to_string(),
            access_token: None,
            primary_calendar_id: PRIMARY_CALENDAR_ID.to_string(),
            timezone: "UTC".to_string(),
            event_location: None,
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: DEFAULT_DIRECTORY_REFRESH_SECS,
            page_size: DEFAULT_DIRECTORY_PAGE_SIZE,
            max_pages: DEFAULT_DIRECTORY_MAX_PAGES,
            background_refresh: false,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            deadline_secs: DEFAULT_QUERY_DEADLINE_SECS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            ongoing_lookback_days: ONGOING_LOOKBACK_DAYS,
            ongoing_per_calendar_limit: ONGOING_PER_CALENDAR_LIMIT,
            search_max_limit: SEARCH_MAX_LIMIT,
            next_event_candidates: NEXT_EVENT_CANDIDATES,
            excluded_title_patterns: vec![WEEK_MARKER_PATTERN.to_string()],
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            max_attempts: DEFAULT_HTTP_MAX_ATTEMPTS,
            base_backoff_ms: DEFAULT_HTTP_BASE_BACKOFF_MS,
        }
    }
}

impl Config {
    /// Check invariants that serde defaults cannot express.
    ///
    /// # Errors
    /// Returns `WhenisError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.calendar.api_base_url.trim().is_empty() {
            return Err(WhenisError::Config("calendar.api_base_url must not be empty".into()));
        }
        self.calendar.tz()?;
        if self.directory.refresh_interval_secs == 0 {
            return Err(WhenisError::Config("directory.refresh_interval_secs must be > 0".into()));
        }
        if self.directory.page_size == 0 || self.directory.max_pages == 0 {
            return Err(WhenisError::Config(
                "directory.page_size and directory.max_pages must be > 0".into(),
            ));
        }
        if self.query.deadline_secs == 0 {
            return Err(WhenisError::Config("query.deadline_secs must be > 0".into()));
        }
        if self.query.max_concurrency == 0 {
            return Err(WhenisError::Config("query.max_concurrency must be > 0".into()));
        }
        if self.query.ongoing_lookback_days <= 0 {
            return Err(WhenisError::Config("query.ongoing_lookback_days must be > 0".into()));
        }
        if self.query.search_max_limit == 0 || self.query.next_event_candidates == 0 {
            return Err(WhenisError::Config(
                "query.search_max_limit and query.next_event_candidates must be > 0".into(),
            ));
        }
        for pattern in &self.query.excluded_title_patterns {
            regex::Regex::new(pattern).map_err(|e| {
                WhenisError::Config(format!("invalid excluded title pattern {pattern:?}: {e}"))
            })?;
        }
        if self.http.max_attempts == 0 {
            return Err(WhenisError::Config("http.max_attempts must be > 0".into()));
        }
        Ok(())
    }
}

impl CalendarConfig {
    /// Parsed timezone for date-only events.
    ///
    /// # Errors
    /// Returns `WhenisError::Config` for names outside the IANA database.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| WhenisError::Config(format!("unknown timezone {:?}: {e}", self.timezone)))
    }
}

impl DirectoryConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl QueryConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}
