use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use whenis_domain::WhenisError;

/// Install the global subscriber. `RUST_LOG` wins; `info` otherwise.
///
/// Logs go to stderr so command output on stdout stays machine readable.
/// Calling this twice is harmless; the second call is ignored.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    let installed = if json {
        builder.json().with_current_span(false).try_init()
    } else {
        builder.with_target(false).try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Log the outcome of a command execution with structured fields.
///
/// `command` is a stable identifier such as `"calendar::search_events"`;
/// never pass user input through it.
#[inline]
pub fn log_command_execution(command: &str, elapsed: Duration, error_type: Option<&str>) {
    let duration_ms = elapsed.as_millis() as u64;

    match error_type {
        None => info!(command, duration_ms, "command_execution_success"),
        Some(error_type) => {
            warn!(command, duration_ms, error_type, "command_execution_failure");
        }
    }
}

/// Stable label for a `WhenisError`, suitable for log fields.
#[inline]
pub fn error_label(error: &WhenisError) -> &'static str {
    match error {
        WhenisError::Source(_) => "source",
        WhenisError::AllSourcesFailed { .. } => "all_sources_failed",
        WhenisError::MalformedTime(_) => "malformed_time",
        WhenisError::DirectoryUnavailable(_) => "directory_unavailable",
        WhenisError::Config(_) => "config",
        WhenisError::Network(_) => "network",
        WhenisError::Auth(_) => "auth",
        WhenisError::NotFound(_) => "not_found",
        WhenisError::InvalidInput(_) => "invalid_input",
        WhenisError::Cancelled => "cancelled",
        WhenisError::DeadlineExceeded(_) => "deadline_exceeded",
        WhenisError::Internal(_) => "internal",
    }
}
