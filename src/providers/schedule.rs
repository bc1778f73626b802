//! Client for a TheSportsDB-style schedule feed.
//!
//! Reads `{base}/eventsnextleague.php?id=<league>`, which answers
//! `{"events": [{strEvent, dateEvent, strTime, strLeague, ...}]}` or
//! `{"events": null}` for a league with nothing scheduled.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::cancel::with_deadline;
use super::http::{build_client, check_status, read_json};
use super::traits::CallContext;
use crate::{Result, SportmlError};

/// Public test key of the free TheSportsDB tier.
pub const DEFAULT_SCHEDULE_BASE_URL: &str = "https://www.thesportsdb.com/api/v1/json/123";

/// English Premier League.
pub const DEFAULT_LEAGUE: &str = "4328";

/// Configuration for the schedule feed.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Feed base URL, without trailing slash. Default: TheSportsDB v1.
    pub base_url: String,
    /// League used when the caller names none. Default: `4328`.
    pub default_league: String,
    /// Maximum events returned per query. Default: 5.
    pub limit: usize,
    /// Deadline for one feed request. Default: 5 seconds.
    pub timeout: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SCHEDULE_BASE_URL.to_owned(),
            default_league: DEFAULT_LEAGUE.to_owned(),
            limit: 5,
            timeout: Duration::from_secs(5),
        }
    }
}

impl ScheduleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn default_league(mut self, league: impl Into<String>) -> Self {
        self.default_league = league.into();
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// One upcoming event, in the shape served by `/api/next-events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleEvent {
    pub event: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub league: Option<String>,
}

impl ScheduleEvent {
    /// One-line rendering used in enrichment context.
    pub fn summary(&self) -> String {
        let mut line = self.event.clone().unwrap_or_else(|| "Unnamed event".to_owned());
        if let Some(date) = &self.date {
            line.push_str(&format!(" on {date}"));
        }
        if let Some(time) = &self.time {
            line.push_str(&format!(" at {time}"));
        }
        line
    }
}

/// Schedule feed client.
pub struct ScheduleClient {
    config: ScheduleConfig,
    http: reqwest::Client,
}

impl ScheduleClient {
    pub fn new(config: ScheduleConfig) -> Result<Self> {
        Ok(Self::with_client(config, build_client(Duration::from_secs(3))?))
    }

    pub fn with_client(config: ScheduleConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Next scheduled events for `league`, or for the default league when
    /// `league` is `None` or blank. At most `limit` entries.
    #[instrument(skip(self, ctx), fields(operation = "next_events"))]
    pub async fn next_events(
        &self,
        league: Option<&str>,
        ctx: &CallContext,
    ) -> Result<Vec<ScheduleEvent>> {
        let league = league
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(&self.config.default_league);
        let url = format!(
            "{}/eventsnextleague.php",
            self.config.base_url.trim_end_matches('/')
        );

        let feed: FeedResponse = with_deadline(ctx, self.config.timeout, |scoped| async move {
            scoped
                .run(async {
                    let response = self
                        .http
                        .get(&url)
                        .query(&[("id", league)])
                        .send()
                        .await
                        .map_err(SportmlError::from_transport)?;
                    let response = check_status(response).await?;
                    read_json(response).await
                })
                .await
        })
        .await?;

        let events: Vec<ScheduleEvent> = feed
            .events
            .unwrap_or_default()
            .into_iter()
            .take(self.config.limit)
            .map(FeedEvent::into_event)
            .collect();
        debug!(league, count = events.len(), "schedule feed answered");
        Ok(events)
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Deserialize)]
struct FeedResponse {
    #[serde(default)]
    events: Option<Vec<FeedEvent>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedEvent {
    #[serde(default)]
    str_event: Option<String>,
    #[serde(default)]
    date_event: Option<String>,
    #[serde(default)]
    str_time: Option<String>,
    #[serde(default)]
    str_league: Option<String>,
}

impl FeedEvent {
    fn into_event(self) -> ScheduleEvent {
        ScheduleEvent {
            event: self.str_event,
            date: self.date_event,
            time: self.str_time,
            league: self.str_league,
        }
    }
}
