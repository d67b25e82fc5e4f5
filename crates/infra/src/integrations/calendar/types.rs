//! Calendar v3 wire types
//!
//! Only the fields the engine reads are modelled; everything else in the
//! payload is ignored.

use serde::{Deserialize, Serialize};
use whenis_domain::{CalendarRef, EventRecord, NewEvent, PartialInstant};

/// `GET /calendars/{id}/events` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsResponse {
    #[serde(default)]
    pub items: Vec<GoogleEvent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEventCreator {
    pub display_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<GoogleEventCreator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<GoogleEventDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<GoogleEventDateTime>,
}

impl GoogleEvent {
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }

    /// Missing times become an empty [`PartialInstant`]; the time model
    /// reports those instead of guessing.
    pub fn into_record(self, calendar_id: &str) -> EventRecord {
        EventRecord {
            id: self.id.unwrap_or_default(),
            title: self.summary.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            start: self.start.map(Into::into).unwrap_or_default(),
            end: self.end.map(Into::into).unwrap_or_default(),
            source_calendar: calendar_id.to_string(),
        }
    }
}

impl From<GoogleEventDateTime> for PartialInstant {
    fn from(value: GoogleEventDateTime) -> Self {
        PartialInstant { date_time: value.date_time, date: value.date }
    }
}

impl From<&NewEvent> for GoogleEvent {
    fn from(event: &NewEvent) -> Self {
        let at = |instant: chrono::DateTime<chrono::Utc>| GoogleEventDateTime {
            date_time: Some(instant.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
            date: None,
        };
        GoogleEvent {
            summary: Some(event.title.clone()),
            description: Some(event.description.clone()).filter(|d| !d.is_empty()),
            location: event.location.clone(),
            creator: Some(GoogleEventCreator { display_name: event.creator.clone() }),
            start: Some(at(event.start)),
            end: event.end().map(at),
            ..GoogleEvent::default()
        }
    }
}

/// `GET /users/me/calendarList` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListResponse {
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub items: Vec<CalendarListEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub summary_override: Option<String>,
    #[serde(default)]
    pub primary: Option<bool>,
}

impl From<CalendarListEntry> for CalendarRef {
    fn from(entry: CalendarListEntry) -> Self {
        // The user's own name for a calendar wins over the owner's.
        let name = entry
            .summary_override
            .filter(|s| !s.trim().is_empty())
            .or(entry.summary)
            .unwrap_or_default();
        let calendar = CalendarRef::new(entry.id, name);
        if entry.primary.unwrap_or(false) {
            calendar.primary()
        } else {
            calendar
        }
    }
}
