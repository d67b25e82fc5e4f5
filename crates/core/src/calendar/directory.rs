//! Calendar directory cache
//!
//! Holds the set of known calendars behind an `RwLock<Arc<DirectorySnapshot>>`.
//! Readers clone the `Arc`; a refresh builds a complete new snapshot off-lock
//! and swaps it in under the write lock. At most one refresh runs at a time.
//!
//! Once the directory has loaded, readers never wait for a refresh: a reader
//! that finds the snapshot due refreshes inline only if no other refresh is
//! running, otherwise it serves what is already there. Only the very first
//! load is waited on.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::{debug, info, instrument, warn};
use whenis_common::Clock;
use whenis_domain::constants::FEED_NAME_PREFIX;
use whenis_domain::{
    CalendarConfig, CalendarRef, DirectoryConfig, DirectoryFetch, Result, SourceError, WhenisError,
};

use crate::calendar_ports::CalendarSource;

/// Tuning for [`DirectoryCache`].
#[derive(Debug, Clone)]
pub struct DirectorySettings {
    pub refresh_interval: Duration,
    pub page_size: u32,
    pub max_pages: u32,
    pub primary_calendar_id: String,
}

impl DirectorySettings {
    pub fn from_config(directory: &DirectoryConfig, calendar: &CalendarConfig) -> Self {
        Self {
            refresh_interval: directory.refresh_interval(),
            page_size: directory.page_size,
            max_pages: directory.max_pages,
            primary_calendar_id: calendar.primary_calendar_id.clone(),
        }
    }
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self::from_config(&DirectoryConfig::default(), &CalendarConfig::default())
    }
}

/// Immutable view of the directory at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorySnapshot {
    pub entries: Vec<CalendarRef>,
    pub change_token: Option<String>,
}

impl DirectorySnapshot {
    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|c| c.id.clone()).collect()
    }
}

/// What a refresh did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The interval has not elapsed since the last attempt.
    Fresh,
    /// The source reported no change; the snapshot is untouched.
    NotModified,
    /// A new snapshot with this many calendars was installed.
    Replaced(usize),
    /// The fetch failed and the previous snapshot is served.
    Stale,
}

#[derive(Debug, Default, Clone, Copy)]
struct RefreshState {
    last_attempt: Option<Instant>,
    loaded: bool,
}

/// Cached calendar directory, shared by the engine and view selectors.
pub struct DirectoryCache {
    source: Arc<dyn CalendarSource>,
    clock: Arc<dyn Clock>,
    settings: DirectorySettings,
    snapshot: RwLock<Arc<DirectorySnapshot>>,
    // Never held across an await.
    state: Mutex<RefreshState>,
    // Held for the whole refresh, network call included. Readers of a loaded
    // cache only ever `try_lock` it.
    refresh_gate: AsyncMutex<()>,
}

impl DirectoryCache {
    pub fn new(
        source: Arc<dyn CalendarSource>,
        clock: Arc<dyn Clock>,
        settings: DirectorySettings,
    ) -> Self {
        Self {
            source,
            clock,
            settings,
            snapshot: RwLock::new(Arc::new(DirectorySnapshot::default())),
            state: Mutex::new(RefreshState::default()),
            refresh_gate: AsyncMutex::new(()),
        }
    }

    pub fn settings(&self) -> &DirectorySettings {
        &self.settings
    }

    /// All calendars in directory order.
    pub async fn list(&self) -> Result<Vec<CalendarRef>> {
        Ok(self.current().await?.entries.clone())
    }

    /// Ids of every calendar, primary included.
    pub async fn ids(&self) -> Result<Vec<String>> {
        Ok(self.current().await?.ids())
    }

    /// Ids of non-primary calendars whose display name contains `needle`,
    /// ignoring case.
    pub async fn ids_matching(&self, needle: &str) -> Result<Vec<String>> {
        let snapshot = self.current().await?;
        Ok(snapshot
            .entries
            .iter()
            .filter(|c| !self.is_primary(c) && c.name_contains(needle))
            .map(|c| c.id.clone())
            .collect())
    }

    /// Display names for listing. Skips the primary calendar and feed
    /// subscriptions whose name is a URL.
    pub async fn names(&self) -> Result<Vec<String>> {
        let snapshot = self.current().await?;
        Ok(snapshot
            .entries
            .iter()
            .filter(|c| !self.is_primary(c) && !c.display_name.starts_with(FEED_NAME_PREFIX))
            .map(|c| c.display_name.clone())
            .collect())
    }

    /// The snapshot readers currently see, without triggering a refresh.
    pub async fn snapshot(&self) -> Arc<DirectorySnapshot> {
        Arc::clone(&*self.snapshot.read().await)
    }

    /// Make the next access refresh regardless of the interval. A loaded
    /// snapshot keeps being served if that refresh fails.
    pub fn invalidate(&self) {
        self.state.lock().last_attempt = None;
    }

    /// Refresh if the interval has elapsed (or nothing was ever loaded).
    /// Waits for a refresh already in flight, then re-checks.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        if !self.is_due() {
            return Ok(RefreshOutcome::Fresh);
        }
        let _gate = self.refresh_gate.lock().await;
        if !self.is_due() {
            return Ok(RefreshOutcome::Fresh);
        }
        self.refresh_locked().await
    }

    /// Refresh now, ignoring the interval.
    #[instrument(skip(self))]
    pub async fn force_refresh(&self) -> Result<RefreshOutcome> {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_locked().await
    }

    async fn current(&self) -> Result<Arc<DirectorySnapshot>> {
        if !self.is_due() {
            return Ok(self.snapshot().await);
        }

        if !self.state.lock().loaded {
            self.refresh().await?;
            return Ok(self.snapshot().await);
        }

        // Loaded but due: refresh only if nobody else is.
        if let Ok(_gate) = self.refresh_gate.try_lock() {
            if self.is_due() {
                self.refresh_locked().await?;
            }
        } else {
            debug!("calendar directory refresh in flight, serving current snapshot");
        }
        Ok(self.snapshot().await)
    }

    fn is_due(&self) -> bool {
        let state = *self.state.lock();
        match state.last_attempt {
            _ if !state.loaded => true,
            None => true,
            Some(at) => self.clock.now().duration_since(at) >= self.settings.refresh_interval,
        }
    }

    fn is_primary(&self, calendar: &CalendarRef) -> bool {
        calendar.is_primary || calendar.id == self.settings.primary_calendar_id
    }

    /// Caller holds `refresh_gate`.
    async fn refresh_locked(&self) -> Result<RefreshOutcome> {
        let loaded = self.state.lock().loaded;
        let previous = self.snapshot().await;
        let token = if loaded { previous.change_token.as_deref() } else { None };

        let fetched = self.fetch_all(token).await;
        self.state.lock().last_attempt = Some(self.clock.now());

        match fetched {
            Ok(None) => {
                debug!("calendar directory not modified");
                Ok(RefreshOutcome::NotModified)
            }
            Ok(Some(next)) => {
                let count = next.entries.len();
                *self.snapshot.write().await = Arc::new(next);
                self.state.lock().loaded = true;
                info!(calendars = count, "calendar directory refreshed");
                Ok(RefreshOutcome::Replaced(count))
            }
            Err(err) if loaded => {
                warn!(error = %err, "calendar directory refresh failed, serving previous snapshot");
                Ok(RefreshOutcome::Stale)
            }
            Err(err) => {
                warn!(error = %err, "calendar directory has never loaded");
                Err(WhenisError::DirectoryUnavailable(err.to_string()))
            }
        }
    }

    /// Fetch every page. `Ok(None)` means the source reported no change.
    async fn fetch_all(
        &self,
        change_token: Option<&str>,
    ) -> std::result::Result<Option<DirectorySnapshot>, SourceError> {
        let page_size = self.settings.page_size;
        let first = match self.source.fetch_directory(change_token, None, page_size).await? {
            DirectoryFetch::NotModified => return Ok(None),
            DirectoryFetch::Page(page) => page,
        };

        let mut snapshot =
            DirectorySnapshot { entries: first.entries, change_token: first.change_token };
        let mut next_page = first.next_page_token;
        let mut pages = 1;

        while let Some(page_token) = next_page.take() {
            if pages >= self.settings.max_pages {
                warn!(
                    pages,
                    calendars = snapshot.entries.len(),
                    "calendar directory exceeds page limit, remaining pages skipped"
                );
                break;
            }

            match self.source.fetch_directory(None, Some(&page_token), page_size).await? {
                DirectoryFetch::Page(page) => {
                    snapshot.entries.extend(page.entries);
                    next_page = page.next_page_token;
                    pages += 1;
                }
                DirectoryFetch::NotModified => {
                    warn!(pages, "unexpected not-modified answer for a follow-up directory page");
                }
            }
        }

        dedup_by_id(&mut snapshot.entries);
        debug!(pages, calendars = snapshot.entries.len(), "calendar directory fetched");
        Ok(Some(snapshot))
    }
}

fn dedup_by_id(entries: &mut Vec<CalendarRef>) {
    let mut seen = std::collections::HashSet::new();
    entries.retain(|c| seen.insert(c.id.clone()));
}
