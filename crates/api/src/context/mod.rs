//! Application context - dependency injection container

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};
use whenis_common::{Clock, SystemClock};
use whenis_core::{
    CalendarService, CalendarSource, CalendarWriter, DirectoryCache, DirectorySettings,
    EventTimeModel, QueryEngine, RequestContext, ViewSettings,
};
use whenis_domain::{Config, Result};
use whenis_infra::scheduling::{DirectoryRefresher, RefresherConfig};
use whenis_infra::GoogleCalendarSource;

/// Application context - holds the wired services
pub struct AppContext {
    pub config: Config,
    pub directory: Arc<DirectoryCache>,
    pub service: Arc<CalendarService>,
    pub time_model: EventTimeModel,
    refresher: Mutex<Option<DirectoryRefresher>>,
}

impl AppContext {
    /// Wire the Google Calendar adapter from `config`.
    ///
    /// # Errors
    /// Fails on invalid configuration, a missing access token or a refresher
    /// that cannot start.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let google = Arc::new(GoogleCalendarSource::from_config(&config)?);
        Self::with_ports(config, google.clone(), google, Arc::new(SystemClock)).await
    }

    /// Wire explicit ports. Tests inject fakes and a mock clock here.
    ///
    /// # Errors
    /// See [`AppContext::new`].
    pub async fn with_ports(
        config: Config,
        source: Arc<dyn CalendarSource>,
        writer: Arc<dyn CalendarWriter>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let directory = Arc::new(DirectoryCache::new(
            Arc::clone(&source),
            Arc::clone(&clock),
            DirectorySettings::from_config(&config.directory, &config.calendar),
        ));
        let time_model = EventTimeModel::new(config.calendar.tz()?);
        let engine = Arc::new(QueryEngine::new(
            source,
            Arc::clone(&directory),
            time_model,
            config.query.max_concurrency,
        ));
        let settings = ViewSettings::from_config(&config.query, &config.calendar)?;
        let service = Arc::new(CalendarService::new(engine, writer, clock, settings));

        let refresher = if config.directory.background_refresh {
            let mut refresher = DirectoryRefresher::new(
                Arc::clone(&directory),
                RefresherConfig::from_directory(&config.directory, config.query.deadline()),
            );
            refresher.start().await?;
            Some(refresher)
        } else {
            None
        };

        info!(
            background_refresh = refresher.is_some(),
            max_concurrency = config.query.max_concurrency,
            "application context ready"
        );

        Ok(Self { config, directory, service, time_model, refresher: Mutex::new(refresher) })
    }

    /// A fresh context carrying the configured per-request deadline.
    pub fn request_context(&self) -> RequestContext {
        RequestContext::with_timeout(self.config.query.deadline())
    }

    pub async fn has_background_refresh(&self) -> bool {
        match self.refresher.lock().await.as_ref() {
            Some(refresher) => refresher.is_running().await,
            None => false,
        }
    }

    /// Stop background work. Safe to call more than once.
    ///
    /// # Errors
    /// Returns the refresher's stop error (timeout or panicked task).
    pub async fn shutdown(&self) -> Result<()> {
        info!("shutdown called on AppContext");

        let Some(mut refresher) = self.refresher.lock().await.take() else {
            return Ok(());
        };
        if let Err(err) = refresher.stop().await {
            warn!(error = %err, "directory refresher did not stop cleanly");
            return Err(err.into());
        }
        Ok(())
    }
}
