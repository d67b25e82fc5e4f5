//! Calendar v3 REST adapter

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{ETAG, IF_NONE_MATCH};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use whenis_core::{CalendarSource, CalendarWriter};
use whenis_domain::{
    Config, DirectoryFetch, DirectoryPage, EventFilter, EventRecord, NewEvent, Result,
    SourceError, SourceErrorKind,
};

use super::auth::{AccessTokenProvider, StaticTokenProvider};
use super::types::{CalendarListResponse, EventsResponse, GoogleEvent};
use crate::errors::{source_error_from_domain, source_error_from_status};
use crate::http::HttpClient;

/// Label used in errors raised while listing calendars.
const DIRECTORY_LABEL: &str = "calendarList";

/// Google Calendar backed [`CalendarSource`] and [`CalendarWriter`].
#[derive(Clone)]
pub struct GoogleCalendarSource {
    http: HttpClient,
    base_url: String,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl GoogleCalendarSource {
    pub fn new(
        http: HttpClient,
        base_url: impl Into<String>,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url, tokens }
    }

    /// # Errors
    /// Fails when the HTTP client cannot be built or no token is configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = HttpClient::from_config(&config.http)?;
        let tokens = Arc::new(StaticTokenProvider::from_config(config)?);
        Ok(Self::new(http, config.calendar.api_base_url.clone(), tokens))
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!("{}/calendars/{}/events", self.base_url, urlencoding::encode(calendar_id))
    }

    /// Attach the bearer token and send, keeping failures scoped to `label`.
    async fn execute(
        &self,
        label: &str,
        builder: RequestBuilder,
    ) -> std::result::Result<Response, SourceError> {
        let token =
            self.tokens.access_token().await.map_err(|e| source_error_from_domain(label, e))?;
        self.http
            .send(builder.bearer_auth(token))
            .await
            .map_err(|e| source_error_from_domain(label, e))
    }
}

/// Turn a non-success response into a classified error.
async fn reject(label: &str, response: Response) -> SourceError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    source_error_from_status(label, status, &body)
}

async fn decode<T: DeserializeOwned>(
    label: &str,
    response: Response,
) -> std::result::Result<T, SourceError> {
    response.json::<T>().await.map_err(|e| {
        SourceError::new(label, SourceErrorKind::InvalidResponse, format!("undecodable body: {e}"))
    })
}

fn events_query(filter: &EventFilter) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("showDeleted", (!filter.exclude_deleted).to_string()),
        ("singleEvents", filter.expand_recurring.to_string()),
        ("maxResults", filter.max_results.to_string()),
    ];
    // The API only orders by start when recurring events are expanded.
    if filter.order_by_start && filter.expand_recurring {
        query.push(("orderBy", "startTime".to_string()));
    }
    if let Some(text) = filter.text.as_deref().filter(|t| !t.is_empty()) {
        query.push(("q", text.to_string()));
    }
    if let Some(at) = filter.time_min {
        query.push(("timeMin", at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)));
    }
    if let Some(at) = filter.time_max {
        query.push(("timeMax", at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)));
    }
    query
}

#[async_trait]
impl CalendarSource for GoogleCalendarSource {
    #[instrument(skip(self, filter), fields(max_results = filter.max_results))]
    async fn list_events(
        &self,
        calendar_id: &str,
        filter: &EventFilter,
    ) -> std::result::Result<Vec<EventRecord>, SourceError> {
        let builder =
            self.http.request(Method::GET, self.events_url(calendar_id)).query(&events_query(filter));
        let response = self.execute(calendar_id, builder).await?;
        if !response.status().is_success() {
            return Err(reject(calendar_id, response).await);
        }

        let payload: EventsResponse = decode(calendar_id, response).await?;
        let records: Vec<EventRecord> = payload
            .items
            .into_iter()
            .filter(|event| !event.is_cancelled())
            .map(|event| event.into_record(calendar_id))
            .collect();

        debug!(events = records.len(), "calendar events fetched");
        Ok(records)
    }

    #[instrument(skip(self))]
    async fn fetch_directory(
        &self,
        if_none_match: Option<&str>,
        page_token: Option<&str>,
        page_size: u32,
    ) -> std::result::Result<DirectoryFetch, SourceError> {
        let mut builder = self
            .http
            .request(Method::GET, format!("{}/users/me/calendarList", self.base_url))
            .query(&[("maxResults", page_size.to_string())]);
        if let Some(token) = page_token {
            builder = builder.query(&[("pageToken", token)]);
        }
        if let Some(tag) = if_none_match {
            builder = builder.header(IF_NONE_MATCH, tag);
        }

        let response = self.execute(DIRECTORY_LABEL, builder).await?;
        if response.status() == StatusCode::NOT_MODIFIED {
            debug!("calendar list not modified");
            return Ok(DirectoryFetch::NotModified);
        }
        if !response.status().is_success() {
            return Err(reject(DIRECTORY_LABEL, response).await);
        }

        let header_tag =
            response.headers().get(ETAG).and_then(|v| v.to_str().ok()).map(str::to_string);
        let payload: CalendarListResponse = decode(DIRECTORY_LABEL, response).await?;

        Ok(DirectoryFetch::Page(DirectoryPage {
            entries: payload.items.into_iter().map(Into::into).collect(),
            change_token: payload.etag.or(header_tag),
            next_page_token: payload.next_page_token.filter(|t| !t.is_empty()),
        }))
    }
}

#[async_trait]
impl CalendarWriter for GoogleCalendarSource {
    #[instrument(skip(self, event), fields(title = %event.title))]
    async fn insert_event(
        &self,
        calendar_id: &str,
        event: &NewEvent,
    ) -> std::result::Result<EventRecord, SourceError> {
        let builder = self
            .http
            .request(Method::POST, self.events_url(calendar_id))
            .json(&GoogleEvent::from(event));
        let response = self.execute(calendar_id, builder).await?;
        if !response.status().is_success() {
            return Err(reject(calendar_id, response).await);
        }

        let created: GoogleEvent = decode(calendar_id, response).await?;
        Ok(created.into_record(calendar_id))
    }
}
