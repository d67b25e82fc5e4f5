//! Calendar integration port interfaces
//!
//! Adapters in `whenis-infra` implement these traits; tests implement them
//! with in-memory fakes.

use async_trait::async_trait;
use whenis_domain::{DirectoryFetch, EventFilter, EventRecord, NewEvent, SourceError};

/// Read side of a calendar backend.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// List events of one calendar matching `filter`.
    ///
    /// Failures are scoped to `calendar_id`; the engine records them next to
    /// the results of sibling calendars.
    async fn list_events(
        &self,
        calendar_id: &str,
        filter: &EventFilter,
    ) -> Result<Vec<EventRecord>, SourceError>;

    /// Fetch one page of the calendar directory.
    ///
    /// `if_none_match` carries the last seen change token and is only sent
    /// with the first page. A source that sees an unchanged directory answers
    /// [`DirectoryFetch::NotModified`].
    async fn fetch_directory(
        &self,
        if_none_match: Option<&str>,
        page_token: Option<&str>,
        page_size: u32,
    ) -> Result<DirectoryFetch, SourceError>;
}

/// Write side of a calendar backend.
#[async_trait]
pub trait CalendarWriter: Send + Sync {
    /// Create `event` on `calendar_id` and return the stored record.
    async fn insert_event(
        &self,
        calendar_id: &str,
        event: &NewEvent,
    ) -> Result<EventRecord, SourceError>;
}
