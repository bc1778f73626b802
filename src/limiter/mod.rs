//! Per-client sliding-window admission control.
//!
//! Each client identity owns an ordered queue of request timestamps from
//! the trailing window. A request is admitted when, after dropping
//! timestamps older than the window, fewer than `max_requests` remain; the
//! new timestamp is then appended. Rejections leave the window untouched
//! apart from that pruning.
//!
//! State lives in process memory and resets on restart. There is no
//! background task: the caller's own window is pruned on every call, and at
//! most once per window length `admit` also sweeps the whole table, dropping
//! clients whose window has emptied. [`RateLimiter::purge_idle`] runs the
//! same sweep on demand.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::telemetry;

/// Configuration for the rate limiter.
///
/// ```rust
/// # use sportml::RateLimitConfig;
/// # use std::time::Duration;
/// let config = RateLimitConfig::new()
///     .max_requests(20)
///     .window(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests admitted per client within one window. Default: 25.
    pub max_requests: usize,
    /// Sliding window length. Default: 60 seconds.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 25,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of requests admitted per window.
    pub fn max_requests(mut self, n: usize) -> Self {
        self.max_requests = n;
        self
    }

    /// Set the sliding window length.
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

/// Sliding-window rate limiter keyed on client identity.
///
/// Safe to share across tasks; the table is guarded by a mutex held only
/// for the synchronous prune-check-append step, never across an await.
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<Table>,
}

struct Table {
    windows: HashMap<String, VecDeque<Instant>>,
    last_sweep: Instant,
}

impl Table {
    fn sweep(&mut self, now: Instant, length: Duration) {
        let before = self.windows.len();
        self.windows.retain(|_, window| {
            prune(window, now, length);
            !window.is_empty()
        });
        self.last_sweep = now;
        let dropped = before - self.windows.len();
        if dropped > 0 {
            debug!(dropped, remaining = self.windows.len(), "purged idle clients");
        }
    }
}

impl RateLimiter {
    /// Create a limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Mutex::new(Table {
                windows: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    /// The configuration this limiter enforces.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Decide whether a request from `client_id` may proceed.
    ///
    /// Returns `true` and records the request when the client is under its
    /// ceiling. Unknown clients start with an empty window.
    pub fn admit(&self, client_id: &str) -> bool {
        let now = Instant::now();
        let mut table = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if now.duration_since(table.last_sweep) >= self.config.window {
            table.sweep(now, self.config.window);
        }

        let windows = &mut table.windows;
        let window = windows.entry(client_id.to_owned()).or_default();
        prune(window, now, self.config.window);

        if window.len() >= self.config.max_requests {
            debug!(client = client_id, in_window = window.len(), "rate limit reached");
            metrics::counter!(telemetry::RATE_LIMITED_TOTAL).increment(1);
            if window.is_empty() {
                // max_requests == 0: nothing to remember for this client
                windows.remove(client_id);
            }
            return false;
        }

        window.push_back(now);
        true
    }

    /// Requests currently counted against `client_id` in the trailing window.
    pub fn in_window(&self, client_id: &str) -> usize {
        let now = Instant::now();
        let mut table = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match table.windows.get_mut(client_id) {
            Some(window) => {
                prune(window, now, self.config.window);
                window.len()
            }
            None => 0,
        }
    }

    /// Drop every client whose window has fully expired.
    pub fn purge_idle(&self) {
        let now = Instant::now();
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sweep(now, self.config.window);
    }

    /// Number of clients with a tracked window.
    pub fn tracked_clients(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .windows
            .len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

/// Remove timestamps that fell out of the window.
///
/// Timestamps are appended in order, so expired ones are always at the front.
fn prune(window: &mut VecDeque<Instant>, now: Instant, length: Duration) {
    while let Some(&oldest) = window.front() {
        if now.duration_since(oldest) >= length {
            window.pop_front();
        } else {
            break;
        }
    }
}
