//! Caching subsystem.
//!
//! [`ResponseCache`] stores provider replies keyed on the normalised user
//! message, with TTL expiry and bounded, oldest-first eviction. Activated
//! via the builder's `.response_cache()` method; without it the
//! orchestrator is a pure passthrough to the providers.

pub mod response;

pub use response::{CacheConfig, ResponseCache, normalize_key};
