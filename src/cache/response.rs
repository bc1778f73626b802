//! Reply cache keyed on the normalised user message.
//!
//! [`ResponseCache`] maps a message (trimmed and lowercased) to the reply
//! a provider gave for it. Entries expire `ttl` after they were written
//! and the map is bounded: when an insert pushes it over `max_entries`,
//! expired entries are dropped first, then the oldest-written entries in
//! one batch of `evict_batch`, so inserts stay cheap between evictions.
//!
//! # Architecture
//!
//! The cache sits in [`RequestOrchestrator`](crate::gateway::RequestOrchestrator)
//! in front of the [`ProviderRegistry`](crate::providers::ProviderRegistry)
//! fallback chain. A hit bypasses rate-limited providers entirely; a miss
//! is written through after the first provider success. The cache is an
//! optimisation only: an orchestrator built without one behaves the same,
//! minus the shortcut.
//!
//! # Future extensibility: shared caching
//!
//! The store is in process memory and owned per orchestrator. For
//! multi-instance deployments, extract a trait over `get`/`put` and
//! inject a redis-backed implementation through the builder; key
//! normalisation ([`normalize_key`]) is backend-agnostic.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::telemetry;

/// Configuration for the response cache.
///
/// ```rust
/// # use sportml::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(50)
///     .ttl(Duration::from_secs(300))
///     .evict_batch(10);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 100.
    pub max_entries: usize,
    /// Time-to-live for cached entries. Default: 15 minutes.
    pub ttl: Duration,
    /// Oldest entries dropped at once when over capacity. Default: 20.
    pub evict_batch: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            ttl: Duration::from_secs(15 * 60),
            evict_batch: 20,
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set how many of the oldest entries are evicted when over capacity.
    pub fn evict_batch(mut self, n: usize) -> Self {
        self.evict_batch = n;
        self
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    reply: String,
    created_at: Instant,
    /// Write order; breaks ties between entries written at the same instant.
    seq: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    next_seq: u64,
}

/// In-memory reply cache with TTL expiry and oldest-first eviction.
pub struct ResponseCache {
    config: CacheConfig,
    state: Mutex<CacheState>,
}

impl ResponseCache {
    /// Create a new response cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            config: config.clone(),
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Look up the cached reply for `message`.
    ///
    /// An entry older than the TTL is removed and reported as a miss.
    pub fn get(&self, message: &str) -> Option<String> {
        let key = normalize_key(message);
        let now = Instant::now();
        let mut state = self.lock();

        let expired = match state.entries.get(&key) {
            Some(entry) => now.duration_since(entry.created_at) >= self.config.ttl,
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                return None;
            }
        };

        if expired {
            state.entries.remove(&key);
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "cause" => "ttl").increment(1);
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
            return None;
        }

        metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
        state.entries.get(&key).map(|entry| entry.reply.clone())
    }

    /// Insert or overwrite the reply for `message`.
    ///
    /// Overwriting restarts the entry's TTL. If the map grows past
    /// `max_entries`, expired entries go first, then the oldest batch.
    pub fn put(&self, message: &str, reply: impl Into<String>) {
        let key = normalize_key(message);
        let now = Instant::now();
        let mut state = self.lock();

        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.insert(
            key,
            CacheEntry {
                reply: reply.into(),
                created_at: now,
                seq,
            },
        );

        if state.entries.len() > self.config.max_entries {
            self.shrink(&mut state, now);
        }
    }

    /// Number of entries currently stored (expired ones included until touched).
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict all entries.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        // Every mutation leaves the map consistent, so a panic elsewhere
        // while holding the lock does not invalidate it.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn shrink(&self, state: &mut CacheState, now: Instant) {
        let ttl = self.config.ttl;
        let before = state.entries.len();
        state
            .entries
            .retain(|_, entry| now.duration_since(entry.created_at) < ttl);
        let expired = before - state.entries.len();
        if expired > 0 {
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "cause" => "ttl")
                .increment(expired as u64);
        }

        let len = state.entries.len();
        if len <= self.config.max_entries {
            return;
        }

        let overflow = len - self.config.max_entries;
        let count = self.config.evict_batch.max(overflow).min(len);

        let mut by_age: Vec<(u64, String)> = state
            .entries
            .iter()
            .map(|(key, entry)| (entry.seq, key.clone()))
            .collect();
        by_age.sort_unstable_by_key(|(seq, _)| *seq);

        for (_, key) in by_age.into_iter().take(count) {
            state.entries.remove(&key);
        }
        metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "cause" => "capacity")
            .increment(count as u64);
        debug!(evicted = count, remaining = state.entries.len(), "response cache shrunk");
    }
}

/// Normalise a message into its cache key: trimmed and lowercased.
pub fn normalize_key(message: &str) -> String {
    message.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_folds_case() {
        assert_eq!(normalize_key("  Who WON the Derby?\n"), "who won the derby?");
    }

    #[test]
    fn normalize_folds_non_ascii() {
        assert_eq!(normalize_key("ȘTEAUA"), "șteaua");
    }

    #[test]
    fn overflow_larger_than_batch_still_reaches_capacity() {
        let cache = ResponseCache::new(&CacheConfig::new().max_entries(2).evict_batch(0));
        cache.put("a", "1");
        cache.put("b", "2");
        cache.put("c", "3");
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
    }
}
