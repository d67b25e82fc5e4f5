use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response, StatusCode};
use tracing::debug;
use whenis_domain::{HttpConfig, WhenisError};

use crate::errors::InfraError;

/// Longest `Retry-After` the client will sleep for. The caller's request
/// deadline usually cuts in well before this.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// HTTP client for the calendar API.
///
/// Retries transport failures, server errors and rate limiting (`429`) with
/// exponential backoff, or after the server's `Retry-After` when it sends
/// one. Other client errors are returned untouched; classifying them is the
/// adapter's job. Once attempts run out the last response is returned as is.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Client tuned from the `[http]` config section.
    pub fn from_config(config: &HttpConfig) -> Result<Self, WhenisError> {
        Self::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .max_attempts(config.max_attempts)
            .base_backoff(Duration::from_millis(config.base_backoff_ms))
            .user_agent(concat!("whenis/", env!("CARGO_PKG_VERSION")))
            .build()
    }

    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Send `builder`, retrying what is worth retrying.
    ///
    /// The body must be cloneable; every request the adapter makes is
    /// buffered JSON or empty.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, WhenisError> {
        let mut attempt = 1;
        loop {
            let request = builder
                .try_clone()
                .ok_or_else(|| WhenisError::Internal("streaming request body cannot be retried".into()))?
                .build()
                .map_err(|err| WhenisError::from(InfraError::from(err)))?;
            let method = request.method().clone();
            let path = request.url().path().to_string();
            let last = attempt >= self.max_attempts;

            let delay = match self.client.execute(request).await {
                Ok(response) if !last && is_retryable_status(response.status()) => {
                    let delay = retry_after(response.headers())
                        .unwrap_or_else(|| self.backoff_delay(attempt));
                    debug!(
                        attempt,
                        %method,
                        %path,
                        status = %response.status(),
                        delay_ms = delay.as_millis() as u64,
                        "calendar request will be retried"
                    );
                    delay
                }
                Ok(response) => {
                    debug!(attempt, %method, %path, status = %response.status(), "calendar response");
                    return Ok(response);
                }
                Err(err) if !last && is_retryable_error(&err) => {
                    let delay = self.backoff_delay(attempt);
                    debug!(
                        attempt,
                        %method,
                        %path,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "calendar request failed, will be retried"
                    );
                    delay
                }
                Err(err) => return Err(InfraError::from(err).into()),
            };

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }

    /// Backoff before retry number `retry` (1-based): base, 2x base, 4x base...
    fn backoff_delay(&self, retry: usize) -> Duration {
        let shift = retry.saturating_sub(1).min(8) as u32;
        self.base_backoff.saturating_mul(1u32 << shift)
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        let defaults = HttpConfig::default();
        Self {
            timeout: Duration::from_secs(defaults.timeout_secs),
            max_attempts: defaults.max_attempts,
            base_backoff: Duration::from_millis(defaults.base_backoff_ms),
            user_agent: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<HttpClient, WhenisError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder.build().map_err(|err| WhenisError::from(InfraError::from(err)))?;

        Ok(HttpClient { client, max_attempts: self.max_attempts.max(1), base_backoff: self.base_backoff })
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_request() || err.is_connect()
}

/// `Retry-After` in its delta-seconds form, capped. HTTP dates are ignored
/// and fall back to backoff.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let seconds: u64 = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()?;
    Some(Duration::from_secs(seconds).min(MAX_RETRY_AFTER))
}
