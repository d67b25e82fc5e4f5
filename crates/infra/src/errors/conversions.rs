//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use reqwest::StatusCode;
use whenis_domain::{SourceError, SourceErrorKind, WhenisError};

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub WhenisError);

impl From<InfraError> for WhenisError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<WhenisError> for InfraError {
    fn from(value: WhenisError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoWhenisError {
    fn into_whenis(self) -> WhenisError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → WhenisError */
/* -------------------------------------------------------------------------- */

impl IntoWhenisError for HttpError {
    fn into_whenis(self) -> WhenisError {
        if self.is_timeout() {
            return WhenisError::DeadlineExceeded("HTTP request timed out".into());
        }

        if self.is_connect() {
            return WhenisError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let message = status_message(status);
            return match status.as_u16() {
                401 | 403 => WhenisError::Auth(message),
                404 => WhenisError::NotFound(message),
                429 => WhenisError::Network(message),
                400..=499 => WhenisError::InvalidInput(message),
                _ => WhenisError::Network(message),
            };
        }

        if self.is_decode() {
            return WhenisError::Internal(format!("failed to decode HTTP response: {self}"));
        }

        WhenisError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_whenis())
    }
}

/* -------------------------------------------------------------------------- */
/* HTTP status → SourceError */
/* -------------------------------------------------------------------------- */

/// Google reports quota exhaustion as 403 with one of these reasons.
const QUOTA_REASONS: &[&str] =
    &["rateLimitExceeded", "userRateLimitExceeded", "quotaExceeded", "dailyLimitExceeded"];

/// Classify a non-success response from the calendar API.
pub fn source_error_from_status(calendar_id: &str, status: StatusCode, body: &str) -> SourceError {
    let kind = match status.as_u16() {
        403 if QUOTA_REASONS.iter().any(|reason| body.contains(reason)) => SourceErrorKind::Quota,
        401 | 403 => SourceErrorKind::Auth,
        404 | 410 => SourceErrorKind::NotFound,
        429 => SourceErrorKind::Quota,
        408 => SourceErrorKind::Timeout,
        500..=599 => SourceErrorKind::Network,
        _ => SourceErrorKind::InvalidResponse,
    };

    let mut message = status_message(status);
    let detail = body.trim();
    if !detail.is_empty() {
        message.push_str(": ");
        message.extend(detail.chars().take(200));
    }
    SourceError::new(calendar_id, kind, message)
}

/// Scope a transport-level domain error to one calendar.
pub fn source_error_from_domain(calendar_id: &str, err: WhenisError) -> SourceError {
    let kind = match &err {
        WhenisError::Network(_) => SourceErrorKind::Network,
        WhenisError::DeadlineExceeded(_) => SourceErrorKind::Timeout,
        WhenisError::Auth(_) => SourceErrorKind::Auth,
        WhenisError::NotFound(_) => SourceErrorKind::NotFound,
        WhenisError::Cancelled => SourceErrorKind::Cancelled,
        WhenisError::Source(inner) => inner.kind,
        _ => SourceErrorKind::Other,
    };
    SourceError::new(calendar_id, kind, err.to_string())
}

fn status_message(status: StatusCode) -> String {
    format!("HTTP {} {}", status.as_u16(), status.canonical_reason().unwrap_or("unknown status"))
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
