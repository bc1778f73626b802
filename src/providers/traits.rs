//! The provider adapter contract.
//!
//! Every upstream (hosted chat completion, local generation, enrichment
//! wrapper) implements [`ProviderAdapter`]. The registry and orchestrator
//! depend only on this trait, so decorators such as
//! [`RetryingAdapter`](super::RetryingAdapter) and
//! [`TimeoutAdapter`](super::TimeoutAdapter) stack freely.
//!
//! # Failure semantics
//!
//! `invoke` returns `Ok(ProviderReply)` on success. Any `Err` is a failed
//! attempt; the registry moves on to the next provider regardless of the
//! error kind, and records [`SportmlError::reason`](crate::SportmlError::reason)
//! for attribution.

use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::types::ProviderReply;
use crate::{Result, SportmlError};

/// Per-call context handed to every adapter.
///
/// Carries the cancellation token for the call. Adapters race their
/// outbound I/O against it via [`CallContext::run`], so cancelling the
/// token aborts the in-flight request.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
}

impl CallContext {
    /// Context driven by an existing token.
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Derive a context that is cancelled with this one, and can also be
    /// cancelled on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Drive `fut` to completion unless the call is cancelled first.
    ///
    /// On cancellation `fut` is dropped, which aborts any in-flight
    /// request it owns, and [`SportmlError::Cancelled`] is returned.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(SportmlError::Cancelled),
            result = fut => result,
        }
    }
}

/// One upstream chat provider, normalised to a single call shape.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider name for logging, metrics and attribution.
    fn name(&self) -> &str;

    /// Whether the provider has everything it needs to be called.
    ///
    /// Providers that require a credential and have none report `false`;
    /// the registry then skips them without counting an attempt.
    fn is_configured(&self) -> bool {
        true
    }

    /// Answer `message`, honouring cancellation through `ctx`.
    async fn invoke(&self, message: &str, ctx: &CallContext) -> Result<ProviderReply>;
}
