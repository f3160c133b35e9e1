//! Request-scoped cancellation and deadlines.
//!
//! Every store and broker call made on behalf of a caller is wrapped in
//! [`RequestContext::run`], so a cancelled token or an elapsed deadline
//! aborts the in-flight future and surfaces [`PlaneError::Cancelled`].

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::error::{PlaneError, PlaneResult};

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context driven by the caller's cancellation token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Bound the context by a relative timeout. An earlier existing
    /// deadline wins.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing <= candidate => existing,
            _ => candidate,
        };
        Self {
            token: self.token,
            deadline: Some(deadline),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Fail fast if the context is already done.
    pub fn check(&self) -> PlaneResult<()> {
        if self.token.is_cancelled() {
            return Err(PlaneError::Cancelled {
                reason: "cancelled by caller".into(),
            });
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(PlaneError::Cancelled {
                    reason: "deadline exceeded".into(),
                });
            }
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the context is cancelled or its
    /// deadline passes first. The future is dropped on cancellation.
    pub async fn run<T, F>(&self, fut: F) -> PlaneResult<T>
    where
        F: Future<Output = PlaneResult<T>>,
    {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(PlaneError::Cancelled {
                reason: "cancelled by caller".into(),
            }),
            _ = deadline => Err(PlaneError::Cancelled {
                reason: "deadline exceeded".into(),
            }),
            result = fut => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_returns_inner_result() {
        let ctx = RequestContext::background();
        let value = ctx.run(async { Ok::<_, PlaneError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let ctx = RequestContext::background();
        ctx.cancel();
        let err = ctx
            .run(async { Ok::<_, PlaneError>(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, PlaneError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn cancellation_aborts_pending_future() {
        let token = CancellationToken::new();
        let ctx = RequestContext::with_token(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let err = ctx
            .run(async {
                std::future::pending::<()>().await;
                Ok::<_, PlaneError>(())
            })
            .await
            .unwrap_err();
        canceller.await.unwrap();
        assert!(matches!(err, PlaneError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn deadline_surfaces_cancelled() {
        let ctx = RequestContext::background().with_timeout(Duration::from_millis(10));
        let err = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, PlaneError>(())
            })
            .await
            .unwrap_err();
        match err {
            PlaneError::Cancelled { reason } => assert_eq!(reason, "deadline exceeded"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn earlier_deadline_wins() {
        let ctx = RequestContext::background()
            .with_timeout(Duration::from_millis(5))
            .with_timeout(Duration::from_secs(60));
        let deadline = ctx.deadline.unwrap();
        assert!(deadline <= Instant::now() + Duration::from_millis(5));
    }
}
