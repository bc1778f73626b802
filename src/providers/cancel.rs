//! Scoped deadlines for provider calls.
//!
//! [`with_deadline`] runs one call under a child cancellation token and a
//! timer. Both are owned by the call's stack frame: the timer is dropped
//! with the `timeout` future, and a drop guard cancels the child token,
//! on success, failure, timeout and when the caller itself is dropped.
//! Work that outlives the call and watches the token stops with it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::traits::{CallContext, ProviderAdapter};
use crate::types::ProviderReply;
use crate::{Result, SportmlError};

/// Run `f` under `deadline`, cancelling its scoped context on every exit path.
///
/// `f` receives the scoped context; the future it returns must use that
/// context (not the parent) for its I/O so the timeout reaches it.
pub async fn with_deadline<T, F, Fut>(ctx: &CallContext, deadline: Duration, f: F) -> Result<T>
where
    F: FnOnce(CallContext) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let scoped = ctx.child();
    let _guard = scoped.token().clone().drop_guard();

    match tokio::time::timeout(deadline, scoped.run(f(scoped.clone()))).await {
        Ok(result) => result,
        Err(_) => Err(SportmlError::Timeout(deadline)),
    }
}

/// Decorator that bounds every `invoke` of the inner adapter by a deadline.
///
/// A timed-out call fails with [`SportmlError::Timeout`]; the in-flight
/// request is dropped and its scoped token cancelled.
pub struct TimeoutAdapter {
    inner: Arc<dyn ProviderAdapter>,
    timeout: Duration,
}

impl TimeoutAdapter {
    /// Wrap an adapter with a per-call deadline.
    pub fn new(inner: Arc<dyn ProviderAdapter>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl ProviderAdapter for TimeoutAdapter {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn is_configured(&self) -> bool {
        self.inner.is_configured()
    }

    async fn invoke(&self, message: &str, ctx: &CallContext) -> Result<ProviderReply> {
        let inner = &self.inner;
        let result = with_deadline(ctx, self.timeout, |scoped| async move {
            inner.invoke(message, &scoped).await
        })
        .await;

        if let Err(SportmlError::Timeout(after)) = &result {
            warn!(
                provider = self.inner.name(),
                timeout_ms = after.as_millis() as u64,
                "provider call timed out"
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn deadline_elapsing_yields_timeout() {
        let ctx = CallContext::default();
        let result: Result<()> = with_deadline(&ctx, Duration::from_secs(15), |_| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(SportmlError::Timeout(d)) if d == Duration::from_secs(15)));
    }

    #[tokio::test(start_paused = true)]
    async fn scoped_token_cancelled_after_success() {
        let ctx = CallContext::default();
        let mut seen = None;
        let value = with_deadline(&ctx, Duration::from_secs(1), |scoped| {
            seen = Some(scoped.token().clone());
            async { Ok(7) }
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert!(seen.unwrap().is_cancelled());
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn scoped_token_cancelled_after_timeout() {
        let ctx = CallContext::default();
        let mut seen = None;
        let result: Result<()> = with_deadline(&ctx, Duration::from_millis(10), |scoped| {
            seen = Some(scoped.token().clone());
            std::future::pending()
        })
        .await;

        assert!(result.is_err());
        assert!(seen.unwrap().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn parent_cancellation_reaches_the_call() {
        let ctx = CallContext::default();
        ctx.token().cancel();
        let result: Result<()> =
            with_deadline(&ctx, Duration::from_secs(5), |_| std::future::pending()).await;
        assert!(matches!(result, Err(SportmlError::Cancelled)));
    }
}
