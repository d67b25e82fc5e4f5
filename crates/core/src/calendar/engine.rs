//! Scatter-gather query engine
//!
//! One task per calendar, owned by a `JoinSet` that lives only as long as the
//! aggregate call. Every task races the request deadline and a child
//! cancellation token, so a silent calendar costs at most the deadline and
//! dropping the aggregate aborts everything still in flight.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout_at;
use tracing::{debug, error, instrument, warn};
use whenis_domain::{
    EventFilter, EventRecord, QueryResult, Result, SourceError, SourceErrorKind, WhenisError,
};

use super::directory::DirectoryCache;
use super::time::EventTimeModel;
use crate::calendar_ports::CalendarSource;
use crate::context::RequestContext;

type Outcome = std::result::Result<Vec<EventRecord>, SourceError>;

/// Fans a query out to every calendar and merges the answers.
pub struct QueryEngine {
    source: Arc<dyn CalendarSource>,
    directory: Arc<DirectoryCache>,
    time_model: EventTimeModel,
    max_concurrency: usize,
}

impl QueryEngine {
    /// Engine issuing at most `max_concurrency` calendar calls at once
    /// (at least one).
    pub fn new(
        source: Arc<dyn CalendarSource>,
        directory: Arc<DirectoryCache>,
        time_model: EventTimeModel,
        max_concurrency: usize,
    ) -> Self {
        Self { source, directory, time_model, max_concurrency: max_concurrency.max(1) }
    }

    /// The directory every whole-directory query reads.
    pub fn directory(&self) -> &Arc<DirectoryCache> {
        &self.directory
    }

    /// Time model used to order merged events.
    pub fn time_model(&self) -> &EventTimeModel {
        &self.time_model
    }

    /// Query every calendar in the directory.
    ///
    /// `total_limit` truncates the merged, sorted list once; `None` keeps
    /// everything.
    pub async fn query_all(
        &self,
        filter: &EventFilter,
        total_limit: Option<usize>,
        ctx: &RequestContext,
    ) -> Result<QueryResult> {
        let ids = ctx.run("calendar directory", self.directory.ids()).await?;
        self.query_calendars(&ids, filter, total_limit, ctx).await
    }

    /// Query an explicit set of calendars.
    ///
    /// Completes once every calendar has answered, failed, timed out or been
    /// cancelled. Fails only when all of them failed.
    #[instrument(skip(self, ids, filter, ctx), fields(calendars = ids.len(), query = ?filter.text))]
    pub async fn query_calendars(
        &self,
        ids: &[String],
        filter: &EventFilter,
        total_limit: Option<usize>,
        ctx: &RequestContext,
    ) -> Result<QueryResult> {
        let started = Instant::now();
        let expected = ids.len();

        let outcomes = self.gather(ids, filter, ctx).await;

        if ctx.is_cancelled() {
            return Err(WhenisError::Cancelled);
        }

        let mut result = self.merge(ids, outcomes);

        if expected > 0 && result.errors.len() == expected {
            error!(
                calendars = expected,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "every calendar failed"
            );
            return Err(WhenisError::AllSourcesFailed { errors: result.errors });
        }

        if let Some(limit) = total_limit {
            result.events.truncate(limit);
        }

        debug!(
            events = result.events.len(),
            failed = result.errors.len(),
            rejected = result.rejected.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scatter-gather complete"
        );
        Ok(result)
    }

    /// Run one task per calendar and wait for all of them. The returned
    /// vector is indexed like `ids`.
    async fn gather(
        &self,
        ids: &[String],
        filter: &EventFilter,
        ctx: &RequestContext,
    ) -> Vec<Option<Outcome>> {
        let scope = ctx.child();
        let _cancel_on_drop = scope.cancel_token().clone().drop_guard();
        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for (index, id) in ids.iter().enumerate() {
            let source = Arc::clone(&self.source);
            let permits = Arc::clone(&permits);
            let filter = filter.clone();
            let scope = scope.clone();
            let id = id.clone();

            tasks.spawn(async move {
                let call = async {
                    let _permit = permits.acquire_owned().await.map_err(|_| {
                        SourceError::new(&id, SourceErrorKind::Cancelled, "worker pool closed")
                    })?;
                    source.list_events(&id, &filter).await
                };

                let outcome = tokio::select! {
                    biased;
                    () = scope.cancel_token().cancelled() => Err(SourceError::cancelled(&id)),
                    answer = timeout_at(scope.deadline(), call) => {
                        answer.unwrap_or_else(|_| Err(SourceError::timeout(&id)))
                    }
                };
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<Outcome>> = vec![None; ids.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(err) => error!(error = %err, "calendar query task aborted"),
            }
        }
        outcomes
    }

    /// Merge per-calendar answers in directory order, then sort by start.
    ///
    /// The sort is stable on `(start, calendar index)`, so the result does not
    /// depend on which calendar answered first.
    fn merge(&self, ids: &[String], outcomes: Vec<Option<Outcome>>) -> QueryResult {
        let mut result = QueryResult::default();
        let mut timed: Vec<(DateTime<Utc>, usize, EventRecord)> = Vec::new();

        for (index, (id, outcome)) in ids.iter().zip(outcomes).enumerate() {
            let outcome = outcome.unwrap_or_else(|| {
                Err(SourceError::new(id, SourceErrorKind::Other, "query task did not complete"))
            });

            match outcome {
                Ok(records) => {
                    for mut record in records {
                        if record.source_calendar.is_empty() {
                            record.source_calendar.clone_from(id);
                        }
                        match self.time_model.start_instant(&record) {
                            Ok(start) => timed.push((start, index, record)),
                            Err(malformed) => {
                                warn!(
                                    calendar_id = %id,
                                    error = %malformed,
                                    "event excluded from ordering"
                                );
                                result.rejected.push(malformed);
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(
                        calendar_id = %err.calendar_id,
                        kind = %err.kind,
                        error = %err.message,
                        "calendar query failed"
                    );
                    result.errors.push(err);
                }
            }
        }

        timed.sort_by_key(|(start, index, _)| (*start, *index));
        result.events = timed.into_iter().map(|(_, _, record)| record).collect();
        result
    }
}
