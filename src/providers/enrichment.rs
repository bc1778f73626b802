//! Enrichment decorator: schedule context for motorsport questions.
//!
//! [`EnrichingAdapter`] wraps another adapter. When the message mentions
//! one of the configured keywords, it first fetches the next events of the
//! configured league and prepends them to the message. The fetch is best
//! effort: on any failure the message goes through unchanged, and the
//! failure is only logged and counted.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::telemetry;

use super::schedule::{ScheduleClient, ScheduleEvent};
use super::traits::{CallContext, ProviderAdapter};
use crate::types::ProviderReply;
use crate::{Result, SportmlError};

/// Formula 1 on TheSportsDB.
pub const DEFAULT_ENRICHMENT_LEAGUE: &str = "4370";

/// Keywords that trigger enrichment, matched case-insensitively.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "formula 1",
    "formula one",
    "f1",
    "grand prix",
    "motogp",
    "pole position",
    "nascar",
    "indycar",
];

/// Which messages get enriched, and from which league.
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    pub keywords: Vec<String>,
    pub league: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| (*k).to_owned()).collect(),
            league: DEFAULT_ENRICHMENT_LEAGUE.to_owned(),
        }
    }
}

impl EnrichmentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords
            .into_iter()
            .map(|k| k.into().to_lowercase())
            .collect();
        self
    }

    pub fn league(mut self, league: impl Into<String>) -> Self {
        self.league = league.into();
        self
    }

    /// Whether `message` mentions any keyword.
    pub fn matches(&self, message: &str) -> bool {
        let lowered = message.to_lowercase();
        self.keywords
            .iter()
            .any(|keyword| !keyword.is_empty() && lowered.contains(keyword.as_str()))
    }
}

/// Decorator that augments matching messages with schedule context.
pub struct EnrichingAdapter {
    inner: Arc<dyn ProviderAdapter>,
    schedule: Arc<ScheduleClient>,
    config: EnrichmentConfig,
}

impl EnrichingAdapter {
    pub fn new(
        inner: Arc<dyn ProviderAdapter>,
        schedule: Arc<ScheduleClient>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            inner,
            schedule,
            config,
        }
    }

    /// The message to send upstream, with context when it could be fetched.
    async fn enrich(&self, message: &str, ctx: &CallContext) -> Result<String> {
        if !self.config.matches(message) {
            return Ok(message.to_owned());
        }

        match self
            .schedule
            .next_events(Some(self.config.league.as_str()), ctx)
            .await
        {
            Ok(events) if events.is_empty() => Ok(message.to_owned()),
            Ok(events) => {
                debug!(provider = self.inner.name(), events = events.len(), "message enriched");
                Ok(with_context(&events, message))
            }
            // The whole call was cancelled, not just the side fetch.
            Err(SportmlError::Cancelled) if ctx.is_cancelled() => Err(SportmlError::Cancelled),
            Err(e) => {
                metrics::counter!(telemetry::ENRICHMENT_FAILURES_TOTAL).increment(1);
                warn!(
                    provider = self.inner.name(),
                    reason = %e.reason(),
                    error = %e,
                    "schedule enrichment skipped"
                );
                Ok(message.to_owned())
            }
        }
    }
}

#[async_trait]
impl ProviderAdapter for EnrichingAdapter {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn is_configured(&self) -> bool {
        self.inner.is_configured()
    }

    async fn invoke(&self, message: &str, ctx: &CallContext) -> Result<ProviderReply> {
        let prompt = self.enrich(message, ctx).await?;
        self.inner.invoke(&prompt, ctx).await
    }
}

/// Prefix `message` with a bullet list of upcoming events.
pub fn with_context(events: &[ScheduleEvent], message: &str) -> String {
    let mut out = String::from("Upcoming events:\n");
    for event in events {
        out.push_str("- ");
        out.push_str(&event.summary());
        out.push('\n');
    }
    out.push_str("\nQuestion: ");
    out.push_str(message);
    out
}
