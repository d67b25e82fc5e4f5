//! Event records as returned by a calendar source

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A point in time given either as a full timestamp or as a calendar date.
///
/// Kept in its wire form; normalization to an instant happens in one place
/// (the core event time model) so every comparison agrees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialInstant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl PartialInstant {
    /// Full RFC 3339 timestamp.
    pub fn timestamp(value: impl Into<String>) -> Self {
        Self { date_time: Some(value.into()), date: None }
    }

    /// Date-only value (`YYYY-MM-DD`), e.g. an all-day event.
    pub fn date(value: impl Into<String>) -> Self {
        Self { date_time: None, date: Some(value.into()) }
    }

    pub fn from_utc(value: DateTime<Utc>) -> Self {
        Self::timestamp(value.to_rfc3339())
    }

    pub fn is_date_only(&self) -> bool {
        self.date_time.as_deref().map_or(true, str::is_empty)
            && self.date.as_deref().is_some_and(|d| !d.is_empty())
    }

    /// Raw text used for diagnostics.
    pub fn raw(&self) -> &str {
        self.date_time
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.date.as_deref())
            .unwrap_or_default()
    }
}

/// Read-only event produced by a calendar source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub start: PartialInstant,
    pub end: PartialInstant,
    pub source_calendar: String,
}

/// Input for the add-event write path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub creator: String,
    pub title: String,
    /// Free-text keywords the event should be found by.
    pub description: String,
    pub start: DateTime<Utc>,
    pub duration: TimeDelta,
    pub location: Option<String>,
}

impl NewEvent {
    /// `None` when `start + duration` falls outside the representable range.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.start.checked_add_signed(self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_past_the_calendar_range_is_none() {
        let start = DateTime::parse_from_rfc3339("2024-05-01T20:00:00Z").unwrap().with_timezone(&Utc);
        let event = NewEvent {
            creator: "alice".into(),
            title: "Forever".into(),
            description: String::new(),
            start,
            duration: TimeDelta::MAX,
            location: None,
        };
        assert_eq!(event.end(), None);
        assert_eq!(
            NewEvent { duration: TimeDelta::hours(2), ..event }.end(),
            Some(start + TimeDelta::hours(2))
        );
    }

    #[test]
    fn date_only_detection() {
        assert!(PartialInstant::date("2024-05-01").is_date_only());
        assert!(!PartialInstant::timestamp("2024-05-01T10:00:00Z").is_date_only());
        assert!(!PartialInstant::default().is_date_only());
    }

    #[test]
    fn raw_prefers_timestamp() {
        let value = PartialInstant {
            date_time: Some("2024-05-01T10:00:00Z".into()),
            date: Some("2024-05-01".into()),
        };
        assert_eq!(value.raw(), "2024-05-01T10:00:00Z");
        assert_eq!(PartialInstant::default().raw(), "");
    }

    #[test]
    fn wire_names_are_camel_case() {
        let json = serde_json::to_value(PartialInstant::timestamp("2024-05-01T10:00:00Z")).unwrap();
        assert_eq!(json["dateTime"], "2024-05-01T10:00:00Z");
        assert!(json.get("date").is_none());
    }
}
