//! Calendar commands

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use whenis_core::EventTimeModel;
use whenis_domain::{
    EventRecord, MalformedTimeError, NewEvent, QueryResult, Result, SourceError, WhenisError,
};

use crate::utils::command_helpers::execute_logged;
use crate::AppContext;

/// One event, with its times resolved to UTC where possible
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub calendar_id: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub all_day: bool,
}

impl EventView {
    pub fn from_record(record: &EventRecord, model: &EventTimeModel) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
            calendar_id: record.source_calendar.clone(),
            starts_at: model.start_instant(record).ok(),
            ends_at: model.end_instant(record).ok(),
            all_day: record.start.is_date_only(),
        }
    }
}

/// Events plus whatever kept the answer from being complete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutcome {
    pub events: Vec<EventView>,
    pub failed_calendars: Vec<SourceError>,
    pub rejected: Vec<MalformedTimeError>,
}

impl QueryOutcome {
    pub fn from_result(result: QueryResult, model: &EventTimeModel) -> Self {
        Self {
            events: result.events.iter().map(|e| EventView::from_record(e, model)).collect(),
            failed_calendars: result.errors,
            rejected: result.rejected,
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.failed_calendars.is_empty()
    }
}

/// Input for [`add_event`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddEventRequest {
    pub creator: String,
    pub title: String,
    /// Extra words that make the event findable by search.
    #[serde(default)]
    pub keywords: Option<String>,
    pub start: DateTime<Utc>,
    pub duration_minutes: i64,
    #[serde(default)]
    pub location: Option<String>,
}

impl TryFrom<AddEventRequest> for NewEvent {
    type Error = WhenisError;

    fn try_from(request: AddEventRequest) -> Result<Self> {
        let duration = TimeDelta::try_minutes(request.duration_minutes).ok_or_else(|| {
            WhenisError::InvalidInput(format!(
                "duration of {} minutes is out of range",
                request.duration_minutes
            ))
        })?;
        Ok(NewEvent {
            creator: request.creator,
            title: request.title,
            description: request.keywords.unwrap_or_default(),
            start: request.start,
            duration,
            location: request.location,
        })
    }
}

/// Upcoming events matching `text`
pub async fn search_events(ctx: &AppContext, text: &str, limit: usize) -> Result<QueryOutcome> {
    execute_logged("calendar::search_events", || async move {
        let result = ctx.service.search(text, limit, &ctx.request_context()).await?;
        Ok(QueryOutcome::from_result(result, &ctx.time_model))
    })
    .await
}

/// Single best match: content first, calendar names second
pub async fn lookup_event(ctx: &AppContext, text: &str) -> Result<QueryOutcome> {
    execute_logged("calendar::lookup_event", || async move {
        let result = ctx.service.lookup(text, &ctx.request_context()).await?;
        Ok(QueryOutcome::from_result(result, &ctx.time_model))
    })
    .await
}

pub async fn next_event(ctx: &AppContext) -> Result<QueryOutcome> {
    execute_logged("calendar::next_event", || async move {
        let result = ctx.service.next_event(&ctx.request_context()).await?;
        Ok(QueryOutcome::from_result(result, &ctx.time_model))
    })
    .await
}

pub async fn ongoing_events(ctx: &AppContext) -> Result<QueryOutcome> {
    execute_logged("calendar::ongoing_events", || async move {
        let result = ctx.service.ongoing(&ctx.request_context()).await?;
        Ok(QueryOutcome::from_result(result, &ctx.time_model))
    })
    .await
}

/// Display names of the listable calendars
pub async fn list_calendars(ctx: &AppContext) -> Result<Vec<String>> {
    execute_logged("calendar::list_calendars", || async move {
        ctx.service.directory_names(&ctx.request_context()).await
    })
    .await
}

pub async fn add_event(ctx: &AppContext, request: AddEventRequest) -> Result<EventView> {
    execute_logged("calendar::add_event", || async move {
        let event = NewEvent::try_from(request)?;
        let created = ctx.service.add_event(event, &ctx.request_context()).await?;
        info!(event_id = %created.id, calendar_id = %created.source_calendar, "event added");
        Ok(EventView::from_record(&created, &ctx.time_model))
    })
    .await
}
