//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Directory cache
pub const DEFAULT_DIRECTORY_REFRESH_SECS: u64 = 300;
pub const DEFAULT_DIRECTORY_PAGE_SIZE: u32 = 250;
pub const DEFAULT_DIRECTORY_MAX_PAGES: u32 = 50;

// Query engine
pub const DEFAULT_QUERY_DEADLINE_SECS: u64 = 10;
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

// View selectors
pub const ONGOING_LOOKBACK_DAYS: i64 = 10;
pub const ONGOING_PER_CALENDAR_LIMIT: u32 = 50;
pub const SEARCH_MAX_LIMIT: usize = 15;
pub const NEXT_EVENT_CANDIDATES: u32 = 3;
pub const WEEK_MARKER_PATTERN: &str = "Week [0-9]{1,2} of [0-9]{4}";

// Calendar API
pub const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
pub const PRIMARY_CALENDAR_ID: &str = "primary";

// Feed-backed calendars show up with their URL as the display name
pub const FEED_NAME_PREFIX: &str = "http";

// HTTP
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_HTTP_BASE_BACKOFF_MS: u64 = 200;
