//! Per-call deadlines and cancellation.
//!
//! Every provider and store call the orchestrator makes is run through a
//! [`CallContext`]. When the deadline passes or the token is cancelled, the
//! in-flight future is dropped, which aborts any HTTP request it owns and
//! returns its pooled connection.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{RagError, Result};

/// Caller-supplied bounds for one orchestrator operation.
///
/// The default context has no deadline and is never cancelled.
///
/// # Example
///
/// ```rust,ignore
/// use std::time::Duration;
/// use ragline::CallContext;
///
/// let ctx = CallContext::new().with_timeout(Duration::from_secs(30));
/// let id = orchestrator.ingest(&ctx, "some text").await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the call to `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Bound the call to an absolute deadline. An earlier deadline wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// Tie the call to an existing cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// A handle that cancels every call made under this context.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run `fut` to completion unless the context is cancelled or expires.
    ///
    /// # Errors
    ///
    /// [`RagError::Cancelled`] or [`RagError::Timeout`]; otherwise the
    /// future's own result.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(RagError::Cancelled);
        }

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.cancel.cancelled() => Err(RagError::Cancelled),
                    res = tokio::time::timeout_at(deadline, fut) => match res {
                        Ok(inner) => inner,
                        Err(_) => Err(RagError::Timeout),
                    },
                }
            }
            None => {
                tokio::select! {
                    _ = self.cancel.cancelled() => Err(RagError::Cancelled),
                    res = fut => res,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn expired_deadline_times_out() {
        let ctx = CallContext::new().with_timeout(Duration::from_millis(10));
        let res: Result<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(res, Err(RagError::Timeout)));
    }

    #[tokio::test]
    async fn cancelled_context_fails_fast() {
        let ctx = CallContext::new();
        ctx.cancellation_token().cancel();
        let res = ctx.run(async { Ok(1) }).await;
        assert!(matches!(res, Err(RagError::Cancelled)));
    }

    #[tokio::test]
    async fn cancellation_aborts_in_flight_call() {
        let ctx = CallContext::new();
        let token = ctx.cancellation_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });
        let res: Result<()> = ctx.run(futures::future::pending()).await;
        assert!(matches!(res, Err(RagError::Cancelled)));
    }

    #[tokio::test]
    async fn inner_error_passes_through() {
        let ctx = CallContext::new().with_timeout(Duration::from_secs(5));
        let res: Result<()> = ctx.run(async { Err(RagError::NotFound { id: "x".into() }) }).await;
        assert!(res.unwrap_err().is_not_found());
    }

    #[test]
    fn earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = CallContext::new()
            .with_deadline(now + Duration::from_secs(1))
            .with_deadline(now + Duration::from_secs(10));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
    }
}
