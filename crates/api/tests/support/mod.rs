#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use whenis_common::testing::MockClock;
use whenis_core::{CalendarSource, CalendarWriter};
use whenis_domain::{
    CalendarRef, Config, DirectoryFetch, DirectoryPage, EventFilter, EventRecord, NewEvent,
    PartialInstant, SourceError,
};
use whenis_lib::AppContext;

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// In-memory calendars. Every calendar answers with its full event list,
/// trimmed by the text filter.
#[derive(Default)]
pub struct MemoryCalendars {
    calendars: Mutex<Vec<CalendarRef>>,
    events: Mutex<HashMap<String, Vec<EventRecord>>>,
    failing: Mutex<HashMap<String, SourceError>>,
    inserted: Mutex<Vec<(String, NewEvent)>>,
}

impl MemoryCalendars {
    pub fn with_calendar(self, id: &str, name: &str, events: Vec<EventRecord>) -> Self {
        self.calendars.lock().push(CalendarRef::new(id, name));
        self.events.lock().insert(id.to_string(), events);
        self
    }

    pub fn failing(self, id: &str, error: SourceError) -> Self {
        self.calendars.lock().push(CalendarRef::new(id, id));
        self.failing.lock().insert(id.to_string(), error);
        self
    }

    pub fn inserted(&self) -> Vec<(String, NewEvent)> {
        self.inserted.lock().clone()
    }
}

#[async_trait]
impl CalendarSource for MemoryCalendars {
    async fn list_events(
        &self,
        calendar_id: &str,
        filter: &EventFilter,
    ) -> Result<Vec<EventRecord>, SourceError> {
        if let Some(err) = self.failing.lock().get(calendar_id) {
            return Err(err.clone());
        }
        let events = self.events.lock().get(calendar_id).cloned().unwrap_or_default();
        Ok(events
            .into_iter()
            .filter(|e| filter.text.as_deref().map_or(true, |t| e.title.contains(t)))
            .take(filter.max_results as usize)
            .collect())
    }

    async fn fetch_directory(
        &self,
        _if_none_match: Option<&str>,
        _page_token: Option<&str>,
        _page_size: u32,
    ) -> Result<DirectoryFetch, SourceError> {
        Ok(DirectoryFetch::Page(DirectoryPage {
            entries: self.calendars.lock().clone(),
            change_token: None,
            next_page_token: None,
        }))
    }
}

#[async_trait]
impl CalendarWriter for MemoryCalendars {
    async fn insert_event(
        &self,
        calendar_id: &str,
        event: &NewEvent,
    ) -> Result<EventRecord, SourceError> {
        self.inserted.lock().push((calendar_id.to_string(), event.clone()));
        Ok(EventRecord {
            id: format!("created-{}", self.inserted.lock().len()),
            title: event.title.clone(),
            description: event.description.clone(),
            start: PartialInstant::from_utc(event.start),
            end: event.end().map(PartialInstant::from_utc).unwrap_or_default(),
            source_calendar: calendar_id.to_string(),
        })
    }
}

pub fn event(id: &str, title: &str, start: &str, end: &str) -> EventRecord {
    EventRecord {
        id: id.into(),
        title: title.into(),
        description: String::new(),
        start: PartialInstant::timestamp(start),
        end: PartialInstant::timestamp(end),
        source_calendar: String::new(),
    }
}

pub async fn app(calendars: MemoryCalendars, config: Config) -> (Arc<MemoryCalendars>, AppContext) {
    let calendars = Arc::new(calendars);
    let app = AppContext::with_ports(
        config,
        calendars.clone(),
        calendars.clone(),
        Arc::new(MockClock::at(base_time())),
    )
    .await
    .expect("app context");
    (calendars, app)
}
