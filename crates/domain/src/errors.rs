//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::impl_label_conversions;

/// Main error type for Whenis
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum WhenisError {
    #[error(transparent)]
    Source(SourceError),

    #[error("all {} calendars failed to answer", errors.len())]
    AllSourcesFailed { errors: Vec<SourceError> },

    #[error(transparent)]
    MalformedTime(MalformedTimeError),

    #[error("Calendar directory unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SourceError> for WhenisError {
    fn from(value: SourceError) -> Self {
        Self::Source(value)
    }
}

impl From<MalformedTimeError> for WhenisError {
    fn from(value: MalformedTimeError) -> Self {
        Self::MalformedTime(value)
    }
}

/// Result type alias for Whenis operations
pub type Result<T> = std::result::Result<T, WhenisError>;

/// Coarse classification of a single calendar's failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    Network,
    Auth,
    Quota,
    NotFound,
    InvalidResponse,
    Timeout,
    Cancelled,
    Other,
}

impl_label_conversions!(SourceErrorKind {
    Network => "network",
    Auth => "auth",
    Quota => "quota",
    NotFound => "not_found",
    InvalidResponse => "invalid_response",
    Timeout => "timeout",
    Cancelled => "cancelled",
    Other => "other",
});

/// One calendar's call failed. Captured per calendar, never thrown on its own
/// from an aggregate query.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("calendar {calendar_id:?} failed ({kind}): {message}")]
pub struct SourceError {
    pub calendar_id: String,
    pub kind: SourceErrorKind,
    pub message: String,
}

impl SourceError {
    pub fn new(
        calendar_id: impl Into<String>,
        kind: SourceErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self { calendar_id: calendar_id.into(), kind, message: message.into() }
    }

    /// The calendar did not answer before the request deadline.
    pub fn timeout(calendar_id: impl Into<String>) -> Self {
        Self::new(calendar_id, SourceErrorKind::Timeout, "deadline exceeded")
    }

    /// The aggregate call was cancelled while this calendar was in flight.
    pub fn cancelled(calendar_id: impl Into<String>) -> Self {
        Self::new(calendar_id, SourceErrorKind::Cancelled, "request cancelled")
    }

    /// Whether retrying later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            SourceErrorKind::Network | SourceErrorKind::Quota | SourceErrorKind::Timeout
        )
    }
}

/// Which boundary of an event could not be normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeField {
    Start,
    End,
}

impl_label_conversions!(TimeField {
    Start => "start",
    End => "end",
});

/// An event's start or end could not be turned into an instant.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("event {event_id:?} has an invalid {field} time {value:?}: {reason}")]
pub struct MalformedTimeError {
    pub event_id: String,
    pub field: TimeField,
    pub value: String,
    pub reason: String,
}
