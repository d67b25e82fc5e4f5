//! View selectors
//!
//! Read models built on the [`QueryEngine`]. None of them keep state between
//! calls; each is a function of the directory snapshot and the clock.

use std::sync::Arc;

use chrono::TimeDelta;
use regex::Regex;
use tracing::{debug, info, instrument};
use whenis_common::Clock;
use whenis_domain::{
    CalendarConfig, EventFilter, EventRecord, NewEvent, QueryConfig, QueryResult, Result,
    SourceError, WhenisError,
};

use super::directory::DirectoryCache;
use super::engine::QueryEngine;
use crate::calendar_ports::CalendarWriter;
use crate::context::RequestContext;

/// How far behind the clock a new event may start and still be accepted.
const START_GRACE: TimeDelta = TimeDelta::minutes(1);

/// Limits and policies for the view selectors.
#[derive(Debug, Clone)]
pub struct ViewSettings {
    pub ongoing_lookback: TimeDelta,
    pub ongoing_per_calendar_limit: u32,
    pub search_max_limit: usize,
    pub next_event_candidates: u32,
    pub excluded_titles: Vec<Regex>,
    pub primary_calendar_id: String,
    pub event_location: Option<String>,
}

impl ViewSettings {
    /// # Errors
    /// Returns `WhenisError::Config` when an excluded title pattern does not
    /// compile.
    pub fn from_config(query: &QueryConfig, calendar: &CalendarConfig) -> Result<Self> {
        let excluded_titles = query
            .excluded_title_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    WhenisError::Config(format!("invalid excluded title pattern {pattern:?}: {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            ongoing_lookback: TimeDelta::days(query.ongoing_lookback_days),
            ongoing_per_calendar_limit: query.ongoing_per_calendar_limit,
            search_max_limit: query.search_max_limit,
            next_event_candidates: query.next_event_candidates,
            excluded_titles,
            primary_calendar_id: calendar.primary_calendar_id.clone(),
            event_location: calendar.event_location.clone(),
        })
    }

    fn is_excluded(&self, title: &str) -> bool {
        self.excluded_titles.iter().any(|re| re.is_match(title))
    }
}

/// Caller-facing calendar operations.
pub struct CalendarService {
    engine: Arc<QueryEngine>,
    writer: Arc<dyn CalendarWriter>,
    clock: Arc<dyn Clock>,
    settings: ViewSettings,
}

impl CalendarService {
    pub fn new(
        engine: Arc<QueryEngine>,
        writer: Arc<dyn CalendarWriter>,
        clock: Arc<dyn Clock>,
        settings: ViewSettings,
    ) -> Self {
        Self { engine, writer, clock, settings }
    }

    pub fn directory(&self) -> &Arc<DirectoryCache> {
        self.engine.directory()
    }

    /// Upcoming events matching `text`, earliest first.
    ///
    /// # Errors
    /// `InvalidInput` for a zero limit, `AllSourcesFailed` when no calendar
    /// answered.
    #[instrument(skip(self, ctx))]
    pub async fn search(
        &self,
        text: &str,
        limit: usize,
        ctx: &RequestContext,
    ) -> Result<QueryResult> {
        if limit == 0 {
            return Err(WhenisError::InvalidInput("limit must be at least 1".into()));
        }
        let limit = limit.min(self.settings.search_max_limit);
        let filter = EventFilter::new(u32::try_from(limit).unwrap_or(u32::MAX))
            .with_text(text)
            .time_min(self.clock.utc_now());

        self.engine.query_all(&filter, Some(limit), ctx).await
    }

    /// Earliest upcoming event of any calendar whose name contains `text`.
    ///
    /// Exact start ties go to the calendar listed first in the directory.
    #[instrument(skip(self, ctx))]
    pub async fn query_by_calendar_title(
        &self,
        text: &str,
        ctx: &RequestContext,
    ) -> Result<Option<EventRecord>> {
        Ok(self.title_match(text, ctx).await?.events.into_iter().next())
    }

    /// Events that started within the lookback window and have not ended.
    #[instrument(skip(self, ctx))]
    pub async fn ongoing(&self, ctx: &RequestContext) -> Result<QueryResult> {
        let now = self.clock.utc_now();
        let window_start = now - self.settings.ongoing_lookback;
        let filter = EventFilter::new(self.settings.ongoing_per_calendar_limit)
            .time_min(window_start)
            .time_max(now);

        let mut result = self.engine.query_all(&filter, None, ctx).await?;
        let model = *self.engine.time_model();

        let candidates = std::mem::take(&mut result.events);
        for record in candidates {
            let start = match model.start_instant(&record) {
                Ok(start) => start,
                Err(malformed) => {
                    result.rejected.push(malformed);
                    continue;
                }
            };
            match model.end_instant(&record) {
                Ok(end) if start >= window_start && end > now => result.events.push(record),
                Ok(_) => {}
                Err(malformed) => result.rejected.push(malformed),
            }
        }

        debug!(ongoing = result.events.len(), "ongoing events selected");
        Ok(result)
    }

    /// The next upcoming event across all calendars, skipping titles that
    /// match an excluded pattern.
    #[instrument(skip(self, ctx))]
    pub async fn next_event(&self, ctx: &RequestContext) -> Result<QueryResult> {
        let now = self.clock.utc_now();
        let filter = EventFilter::new(self.settings.next_event_candidates).time_min(now);

        let mut result = self.engine.query_all(&filter, None, ctx).await?;
        let model = *self.engine.time_model();

        let next = result.events.drain(..).find(|record| {
            !self.settings.is_excluded(&record.title)
                && model.start_instant(record).is_ok_and(|start| start > now)
        });
        result.events = next.into_iter().collect();
        Ok(result)
    }

    /// Best single answer for `text`: content search first, calendar names
    /// second.
    #[instrument(skip(self, ctx))]
    pub async fn lookup(&self, text: &str, ctx: &RequestContext) -> Result<QueryResult> {
        let by_content = self.search(text, 1, ctx).await?;
        if !by_content.events.is_empty() {
            return Ok(by_content);
        }

        debug!("no content match, trying calendar names");
        let mut by_title = self.title_match(text, ctx).await?;
        merge_errors(&mut by_title.errors, by_content.errors);
        by_title.rejected.extend(by_content.rejected);
        Ok(by_title)
    }

    /// Names of the listable calendars.
    pub async fn directory_names(&self, ctx: &RequestContext) -> Result<Vec<String>> {
        ctx.run("calendar directory", self.directory().names()).await
    }

    /// Create an event on the primary calendar.
    ///
    /// # Errors
    /// `InvalidInput` for an empty title, a non-positive duration, a start
    /// in the past or an end past the representable range.
    #[instrument(skip(self, event, ctx), fields(title = %event.title, creator = %event.creator))]
    pub async fn add_event(&self, mut event: NewEvent, ctx: &RequestContext) -> Result<EventRecord> {
        if event.title.trim().is_empty() {
            return Err(WhenisError::InvalidInput("event title must not be empty".into()));
        }
        if event.duration <= TimeDelta::zero() {
            return Err(WhenisError::InvalidInput("event duration must be positive".into()));
        }
        if event.end().is_none() {
            return Err(WhenisError::InvalidInput("event end is out of range".into()));
        }
        if event.start < self.clock.utc_now() - START_GRACE {
            return Err(WhenisError::InvalidInput("event must not start in the past".into()));
        }
        if event.location.is_none() {
            event.location.clone_from(&self.settings.event_location);
        }

        let calendar_id = self.settings.primary_calendar_id.as_str();
        let created = ctx
            .run("insert event", async {
                self.writer.insert_event(calendar_id, &event).await.map_err(WhenisError::from)
            })
            .await?;

        info!(event_id = %created.id, "event created");
        Ok(created)
    }

    async fn title_match(&self, text: &str, ctx: &RequestContext) -> Result<QueryResult> {
        let ids = ctx.run("calendar directory", self.directory().ids_matching(text)).await?;
        if ids.is_empty() {
            return Ok(QueryResult::default());
        }

        let filter = EventFilter::new(1).time_min(self.clock.utc_now());
        self.engine.query_calendars(&ids, &filter, Some(1), ctx).await
    }
}

/// Append `extra` errors for calendars not already reported.
fn merge_errors(errors: &mut Vec<SourceError>, extra: Vec<SourceError>) {
    for err in extra {
        if !errors.iter().any(|known| known.calendar_id == err.calendar_id) {
            errors.push(err);
        }
    }
}
