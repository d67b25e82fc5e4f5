use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use whenis_core::{CalendarSource, CalendarWriter};
use whenis_domain::{
    CalendarRef, DirectoryFetch, DirectoryPage, EventFilter, EventRecord, NewEvent,
    PartialInstant, SourceError, SourceErrorKind,
};

/// How one calendar answers `list_events`.
#[derive(Clone)]
pub enum Behaviour {
    Events(Vec<EventRecord>),
    Delayed(Duration, Vec<EventRecord>),
    Fail(SourceErrorKind),
    /// Never answers.
    Hang,
}

/// In-memory calendar backend.
///
/// Applies the text filter (case-insensitive title match) and `max_results`
/// but no time bounds, so selectors are tested on what they filter
/// themselves. The directory is served in pages of the requested size and
/// answers `NotModified` when the caller's token matches.
#[derive(Default)]
pub struct FakeCalendarSource {
    calendars: Mutex<Vec<CalendarRef>>,
    change_token: Mutex<Option<String>>,
    behaviours: Mutex<HashMap<String, Behaviour>>,
    filters: Mutex<Vec<(String, EventFilter)>>,
    inserted: Mutex<Vec<(String, NewEvent)>>,
    directory_delay: Mutex<Option<Duration>>,
    directory_calls: AtomicUsize,
    list_calls: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl FakeCalendarSource {
    pub fn new() -> Self {
        Self::default().with_change_token("etag-1")
    }

    pub fn with_calendar(self, id: &str, name: &str, behaviour: Behaviour) -> Self {
        self.calendars.lock().push(CalendarRef::new(id, name));
        self.behaviours.lock().insert(id.to_string(), behaviour);
        self
    }

    pub fn with_primary(self, id: &str, name: &str, behaviour: Behaviour) -> Self {
        self.calendars.lock().push(CalendarRef::new(id, name).primary());
        self.behaviours.lock().insert(id.to_string(), behaviour);
        self
    }

    pub fn with_change_token(self, token: &str) -> Self {
        *self.change_token.lock() = Some(token.to_string());
        self
    }

    /// Replace the directory and bump the change token.
    pub fn set_calendars(&self, calendars: Vec<CalendarRef>, token: &str) {
        *self.calendars.lock() = calendars;
        *self.change_token.lock() = Some(token.to_string());
    }

    pub fn set_behaviour(&self, id: &str, behaviour: Behaviour) {
        self.behaviours.lock().insert(id.to_string(), behaviour);
    }

    /// Every later directory page takes this long to answer.
    pub fn set_directory_delay(&self, delay: Duration) {
        *self.directory_delay.lock() = Some(delay);
    }

    pub fn directory_calls(&self) -> usize {
        self.directory_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn filters(&self) -> Vec<(String, EventFilter)> {
        self.filters.lock().clone()
    }

    pub fn inserted(&self) -> Vec<(String, NewEvent)> {
        self.inserted.lock().clone()
    }
}

/// Tracks one in-flight call; dropping it (completion or abort) releases it.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>, peak: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CalendarSource for FakeCalendarSource {
    async fn list_events(
        &self,
        calendar_id: &str,
        filter: &EventFilter,
    ) -> Result<Vec<EventRecord>, SourceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.filters.lock().push((calendar_id.to_string(), filter.clone()));
        let _guard = InFlight::enter(&self.in_flight, &self.peak_in_flight);

        let behaviour = self.behaviours.lock().get(calendar_id).cloned();
        let events = match behaviour {
            None => Vec::new(),
            Some(Behaviour::Events(events)) => {
                tokio::task::yield_now().await;
                events
            }
            Some(Behaviour::Delayed(delay, events)) => {
                tokio::time::sleep(delay).await;
                events
            }
            Some(Behaviour::Fail(kind)) => {
                return Err(SourceError::new(calendar_id, kind, "scripted failure"))
            }
            Some(Behaviour::Hang) => {
                std::future::pending::<()>().await;
                Vec::new()
            }
        };

        let needle = filter.text.as_deref().map(str::to_lowercase);
        Ok(events
            .into_iter()
            .filter(|e| needle.as_deref().map_or(true, |n| e.title.to_lowercase().contains(n)))
            .take(filter.max_results as usize)
            .map(|mut e| {
                e.source_calendar = calendar_id.to_string();
                e
            })
            .collect())
    }

    async fn fetch_directory(
        &self,
        if_none_match: Option<&str>,
        page_token: Option<&str>,
        page_size: u32,
    ) -> Result<DirectoryFetch, SourceError> {
        self.directory_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.directory_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let token = self.change_token.lock().clone();
        if if_none_match.is_some() && if_none_match == token.as_deref() {
            return Ok(DirectoryFetch::NotModified);
        }

        let calendars = self.calendars.lock().clone();
        let offset: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let end = (offset + page_size as usize).min(calendars.len());
        Ok(DirectoryFetch::Page(DirectoryPage {
            entries: calendars[offset.min(end)..end].to_vec(),
            change_token: token,
            next_page_token: (end < calendars.len()).then(|| end.to_string()),
        }))
    }
}

#[async_trait]
impl CalendarWriter for FakeCalendarSource {
    async fn insert_event(
        &self,
        calendar_id: &str,
        event: &NewEvent,
    ) -> Result<EventRecord, SourceError> {
        let mut inserted = self.inserted.lock();
        inserted.push((calendar_id.to_string(), event.clone()));
        Ok(EventRecord {
            id: format!("created-{}", inserted.len()),
            title: event.title.clone(),
            description: event.description.clone(),
            start: PartialInstant::from_utc(event.start),
            end: event.end().map(PartialInstant::from_utc).unwrap_or_default(),
            source_calendar: calendar_id.to_string(),
        })
    }
}

/// Event with explicit start and end instants.
pub fn event(id: &str, title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> EventRecord {
    EventRecord {
        id: id.to_string(),
        title: title.to_string(),
        description: String::new(),
        start: PartialInstant::from_utc(start),
        end: PartialInstant::from_utc(end),
        source_calendar: String::new(),
    }
}
