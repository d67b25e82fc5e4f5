//! Scheduler error types

use thiserror::Error;
use whenis_domain::WhenisError;

use crate::errors::InfraError;

/// Background task lifecycle errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Scheduler already running")]
    AlreadyRunning,

    #[error("Scheduler not running")]
    NotRunning,

    #[error("Operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Task join failed: {0}")]
    TaskJoinFailed(String),
}

impl From<SchedulerError> for InfraError {
    fn from(err: SchedulerError) -> Self {
        let whenis_err = match err {
            SchedulerError::AlreadyRunning | SchedulerError::NotRunning => {
                WhenisError::InvalidInput(err.to_string())
            }
            SchedulerError::Timeout { .. } => WhenisError::DeadlineExceeded(err.to_string()),
            SchedulerError::TaskJoinFailed(_) => WhenisError::Internal(err.to_string()),
        };
        InfraError(whenis_err)
    }
}

impl From<SchedulerError> for WhenisError {
    fn from(err: SchedulerError) -> Self {
        InfraError::from(err).into()
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
