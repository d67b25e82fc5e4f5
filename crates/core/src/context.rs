//! Per-request deadline and cancellation

use std::future::Future;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use whenis_domain::{Result, WhenisError};

/// Deadline and cancellation signal carried by every caller-facing call.
///
/// Cloning shares the token; use [`RequestContext::child`] to scope a
/// cancellation to one sub-operation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Instant,
}

impl RequestContext {
    /// Context driven by an existing token, e.g. one a CLI signal handler
    /// cancels.
    pub fn new(cancel: CancellationToken, deadline: Instant) -> Self {
        Self { cancel, deadline }
    }

    /// Fresh token, deadline `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(CancellationToken::new(), Instant::now() + timeout)
    }

    /// Same deadline, token cancelled together with this context but
    /// cancellable on its own.
    pub fn child(&self) -> Self {
        Self::new(self.cancel.child_token(), self.deadline)
    }

    /// The token tasks select on to notice cancellation.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Absolute deadline, shared by every child.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Cancel this context and its children. Parents are unaffected.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether this context or any parent was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Drive `fut` under this context.
    ///
    /// Cancellation wins over completion; the deadline surfaces as
    /// [`WhenisError::DeadlineExceeded`] naming `operation`.
    pub async fn run<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(WhenisError::Cancelled),
            outcome = timeout_at(self.deadline, fut) => match outcome {
                Ok(result) => result,
                Err(_) => Err(WhenisError::DeadlineExceeded(operation.to_string())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn run_reports_deadline() {
        let ctx = RequestContext::with_timeout(Duration::from_millis(50));
        let err = ctx
            .run("directory refresh", async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(())
            })
            .await
            .unwrap_err();
        assert_eq!(err, WhenisError::DeadlineExceeded("directory refresh".into()));
    }

    #[tokio::test]
    async fn run_honours_cancellation() {
        let ctx = RequestContext::with_timeout(Duration::from_secs(5));
        ctx.cancel();
        let err = ctx.run("insert", async { Ok(1) }).await.unwrap_err();
        assert_eq!(err, WhenisError::Cancelled);
    }

    #[tokio::test]
    async fn child_follows_parent_cancellation() {
        let parent = RequestContext::with_timeout(Duration::from_secs(5));
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_cancelled());

        let other = parent.child();
        parent.cancel();
        assert!(other.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_saturates_at_zero() {
        let ctx = RequestContext::with_timeout(Duration::from_millis(10));
        tokio::time::advance(Duration::from_millis(20)).await;
        assert_eq!(ctx.remaining(), Duration::ZERO);
    }
}
