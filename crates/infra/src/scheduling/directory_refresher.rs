//! Periodic calendar directory refresh
//!
//! Keeps the directory warm so queries rarely pay for a calendar list fetch.
//! Each tick forces a refresh; the cache's own single-flight gate means a
//! query-triggered refresh and a tick never hit the source together.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use whenis_core::{DirectoryCache, RefreshOutcome};
use whenis_domain::DirectoryConfig;

use super::error::{SchedulerError, SchedulerResult};

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct RefresherConfig {
    pub interval: Duration,
    /// Upper bound for one refresh, pagination included.
    pub refresh_timeout: Duration,
}

impl RefresherConfig {
    pub fn from_directory(config: &DirectoryConfig, refresh_timeout: Duration) -> Self {
        Self { interval: config.refresh_interval(), refresh_timeout }
    }
}

impl Default for RefresherConfig {
    fn default() -> Self {
        Self { interval: DirectoryConfig::default().refresh_interval(), refresh_timeout: Duration::from_secs(30) }
    }
}

/// Background directory refresher with explicit start/stop.
pub struct DirectoryRefresher {
    directory: Arc<DirectoryCache>,
    config: RefresherConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl DirectoryRefresher {
    pub fn new(directory: Arc<DirectoryCache>, config: RefresherConfig) -> Self {
        Self {
            directory,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawn the refresh loop. The first refresh happens one interval from
    /// now; callers warm the cache themselves if they need it sooner.
    ///
    /// # Errors
    /// `AlreadyRunning` if the loop is live.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running().await {
            return Err(SchedulerError::AlreadyRunning);
        }

        // Fresh token so a stopped refresher can be started again.
        self.cancellation_token = CancellationToken::new();

        let directory = Arc::clone(&self.directory);
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();
        let handle = tokio::spawn(async move {
            Self::refresh_loop(directory, config, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);
        info!(interval_secs = self.config.interval.as_secs(), "directory refresher started");
        Ok(())
    }

    /// Cancel the loop and wait for it to exit.
    ///
    /// # Errors
    /// `NotRunning`, `Timeout` if the task ignores cancellation, or
    /// `TaskJoinFailed` if it panicked.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running().await {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            match tokio::time::timeout(STOP_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(error = %e, "directory refresher task panicked");
                    return Err(SchedulerError::TaskJoinFailed(e.to_string()));
                }
                Err(_) => {
                    warn!("directory refresher did not stop within timeout");
                    return Err(SchedulerError::Timeout { seconds: STOP_TIMEOUT.as_secs() });
                }
            }
        }

        info!("directory refresher stopped");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        let guard = self.task_handle.lock().await;
        guard.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    async fn refresh_loop(
        directory: Arc<DirectoryCache>,
        config: RefresherConfig,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("directory refresh loop cancelled");
                    break;
                }
                () = tokio::time::sleep(config.interval) => {
                    Self::tick(&directory, config.refresh_timeout, &cancel).await;
                }
            }
        }
    }

    async fn tick(directory: &DirectoryCache, limit: Duration, cancel: &CancellationToken) {
        let refresh = tokio::time::timeout(limit, directory.force_refresh());
        let outcome = tokio::select! {
            () = cancel.cancelled() => return,
            outcome = refresh => outcome,
        };

        match outcome {
            Ok(Ok(RefreshOutcome::Stale)) => warn!("background directory refresh failed"),
            Ok(Ok(outcome)) => debug!(?outcome, "background directory refresh"),
            Ok(Err(err)) => warn!(error = %err, "background directory refresh failed"),
            Err(_) => warn!(timeout_secs = limit.as_secs(), "background directory refresh timed out"),
        }
    }
}

impl Drop for DirectoryRefresher {
    fn drop(&mut self) {
        if !self.cancellation_token.is_cancelled() {
            self.cancellation_token.cancel();
            if self.task_handle.try_lock().is_ok_and(|guard| guard.is_some()) {
                warn!("directory refresher dropped without stop(); loop cancelled");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use whenis_common::testing::MockClock;
    use whenis_core::{CalendarSource, DirectorySettings};
    use whenis_domain::{
        CalendarRef, DirectoryFetch, DirectoryPage, EventFilter, EventRecord, SourceError,
    };

    use super::*;

    #[derive(Default)]
    struct CountingDirectory {
        fetches: SyncMutex<usize>,
    }

    #[async_trait]
    impl CalendarSource for CountingDirectory {
        async fn list_events(
            &self,
            _calendar_id: &str,
            _filter: &EventFilter,
        ) -> Result<Vec<EventRecord>, SourceError> {
            Ok(Vec::new())
        }

        async fn fetch_directory(
            &self,
            _if_none_match: Option<&str>,
            _page_token: Option<&str>,
            _page_size: u32,
        ) -> Result<DirectoryFetch, SourceError> {
            *self.fetches.lock() += 1;
            Ok(DirectoryFetch::Page(DirectoryPage {
                entries: vec![CalendarRef::new("f1", "Formula 1")],
                change_token: None,
                next_page_token: None,
            }))
        }
    }

    fn refresher(interval: Duration) -> (Arc<CountingDirectory>, DirectoryRefresher) {
        let source = Arc::new(CountingDirectory::default());
        let cache = Arc::new(DirectoryCache::new(
            Arc::clone(&source) as Arc<dyn CalendarSource>,
            Arc::new(MockClock::new()),
            DirectorySettings::default(),
        ));
        let config = RefresherConfig { interval, refresh_timeout: Duration::from_secs(1) };
        (source, DirectoryRefresher::new(cache, config))
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_every_interval() {
        let (source, mut refresher) = refresher(Duration::from_secs(60));
        refresher.start().await.unwrap();

        tokio::time::sleep(Duration::from_secs(150)).await;
        assert_eq!(*source.fetches.lock(), 2);

        refresher.stop().await.unwrap();
        assert!(!refresher.is_running().await);
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let (_source, mut refresher) = refresher(Duration::from_secs(60));
        refresher.start().await.unwrap();
        assert!(matches!(refresher.start().await, Err(SchedulerError::AlreadyRunning)));
        refresher.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_without_start_is_rejected() {
        let (_source, mut refresher) = refresher(Duration::from_secs(60));
        assert!(matches!(refresher.stop().await, Err(SchedulerError::NotRunning)));
    }

    #[tokio::test]
    async fn can_restart_after_stop() {
        let (_source, mut refresher) = refresher(Duration::from_secs(60));
        refresher.start().await.unwrap();
        refresher.stop().await.unwrap();
        refresher.start().await.unwrap();
        assert!(refresher.is_running().await);
        refresher.stop().await.unwrap();
    }
}
