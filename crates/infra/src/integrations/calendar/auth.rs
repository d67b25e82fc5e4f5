//! Bearer token supply for the calendar API

use async_trait::async_trait;
use whenis_domain::{Config, Result, WhenisError};

/// Source of access tokens. Refreshing them is the implementor's concern.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// A fixed token, typically from `WHENIS_ACCESS_TOKEN`.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    /// # Errors
    /// Returns `WhenisError::Auth` when no token is configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        config
            .calendar
            .access_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .map(Self::new)
            .ok_or_else(|| WhenisError::Auth("no calendar access token configured".into()))
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider").field("token", &"<redacted>").finish()
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}
