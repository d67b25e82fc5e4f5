//! Query parameters and aggregate results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::EventRecord;
use crate::errors::{MalformedTimeError, SourceError};

/// Parameters for listing events from one calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    /// Free-text match against event content.
    pub text: Option<String>,
    pub time_min: Option<DateTime<Utc>>,
    pub time_max: Option<DateTime<Utc>>,
    /// Upper bound on records returned by a single calendar.
    pub max_results: u32,
    pub order_by_start: bool,
    pub exclude_deleted: bool,
    pub expand_recurring: bool,
}

impl EventFilter {
    /// Non-deleted, single-occurrence events ordered by start time.
    pub fn new(max_results: u32) -> Self {
        Self {
            text: None,
            time_min: None,
            time_max: None,
            max_results,
            order_by_start: true,
            exclude_deleted: true,
            expand_recurring: true,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.text = if text.trim().is_empty() { None } else { Some(text) };
        self
    }

    pub fn time_min(mut self, at: DateTime<Utc>) -> Self {
        self.time_min = Some(at);
        self
    }

    pub fn time_max(mut self, at: DateTime<Utc>) -> Self {
        self.time_max = Some(at);
        self
    }
}

/// Best-effort aggregate of one scatter-gather query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// Merged events, ascending by normalized start instant.
    pub events: Vec<EventRecord>,
    /// Calendars that failed, in directory order.
    pub errors: Vec<SourceError>,
    /// Records left out of ordering because their time could not be parsed.
    pub rejected: Vec<MalformedTimeError>,
}

impl QueryResult {
    /// Some calendars failed, so `events` may be incomplete.
    pub fn is_degraded(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn failed_calendar_ids(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.calendar_id.as_str()).collect()
    }

    pub fn first(&self) -> Option<&EventRecord> {
        self.events.first()
    }
}
