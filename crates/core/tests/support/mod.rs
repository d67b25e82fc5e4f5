//! Shared test helpers for `whenis-core` integration tests.
//!
//! These helpers provide a scripted calendar backend and a wiring helper so
//! that engine and selector tests can focus on behaviour instead of
//! boilerplate.

#![allow(dead_code)]

pub mod calendar;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use whenis_common::testing::MockClock;
use whenis_core::{
    CalendarService, DirectoryCache, DirectorySettings, EventTimeModel, QueryEngine,
    RequestContext, ViewSettings,
};
use whenis_domain::{CalendarConfig, QueryConfig};

pub use self::calendar::{event, Behaviour, FakeCalendarSource};

/// Fixed wall clock origin for every test.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn ctx(timeout: Duration) -> RequestContext {
    RequestContext::with_timeout(timeout)
}

/// Engine, cache and service wired around one fake source.
pub struct Harness {
    pub source: Arc<FakeCalendarSource>,
    pub clock: MockClock,
    pub directory: Arc<DirectoryCache>,
    pub engine: Arc<QueryEngine>,
    pub service: CalendarService,
}

impl Harness {
    pub fn new(source: FakeCalendarSource) -> Self {
        Self::with_concurrency(source, 16)
    }

    pub fn with_concurrency(source: FakeCalendarSource, max_concurrency: usize) -> Self {
        let source = Arc::new(source);
        let clock = MockClock::at(base_time());
        let directory = Arc::new(DirectoryCache::new(
            source.clone(),
            Arc::new(clock.clone()),
            DirectorySettings { page_size: 2, ..DirectorySettings::default() },
        ));
        let engine = Arc::new(QueryEngine::new(
            source.clone(),
            Arc::clone(&directory),
            EventTimeModel::default(),
            max_concurrency,
        ));
        let settings =
            ViewSettings::from_config(&QueryConfig::default(), &CalendarConfig::default())
                .unwrap();
        let service = CalendarService::new(
            Arc::clone(&engine),
            source.clone(),
            Arc::new(clock.clone()),
            settings,
        );
        Self { source, clock, directory, engine, service }
    }
}
