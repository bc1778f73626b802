//! sportml - Chat gateway for sports questions
//!
//! This crate answers chat messages by walking a priority-ordered chain of
//! upstream model providers, behind a per-client rate limiter and a reply
//! cache. The [`RequestOrchestrator`] is transport-agnostic; the optional
//! `server` feature exposes it over HTTP.
//!
//! # Example
//!
//! ```rust,no_run
//! use sportml::{CacheConfig, ProviderDescriptor, RateLimitConfig, Sportml};
//!
//! #[tokio::main]
//! async fn main() -> sportml::Result<()> {
//!     let orchestrator = Sportml::builder()
//!         .rate_limit(RateLimitConfig::new().max_requests(25))
//!         .response_cache(CacheConfig::new())
//!         .hosted(
//!             ProviderDescriptor::new("groq", "https://api.groq.com/openai/v1/chat/completions")
//!                 .priority(1)
//!                 .models(["llama-3.1-8b-instant"])
//!                 .credential(std::env::var("GROQ_API_KEY").ok()),
//!         )
//!         .local(
//!             ProviderDescriptor::new("ollama", "http://localhost:11434")
//!                 .priority(2)
//!                 .models(["llama3.2:3b"]),
//!         )
//!         .build()?;
//!
//!     let reply = orchestrator
//!         .chat("203.0.113.7", "Who won the 2022 World Cup?")
//!         .await?;
//!     println!("{} ({:?})", reply.reply, reply.provider);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;
pub mod gateway;
pub mod limiter;
pub mod providers;
#[cfg(feature = "server")]
pub mod server;
pub mod telemetry;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use error::{FailureReason, Result, SportmlError};
pub use gateway::{ProviderOptions, RequestOrchestrator, Sportml, SportmlBuilder};

pub use cache::{CacheConfig, ResponseCache};
pub use limiter::{RateLimitConfig, RateLimiter};
pub use providers::{
    CallContext, EnrichmentConfig, ProviderAdapter, ProviderRegistry, RetryConfig, RetryDecision,
    ScheduleConfig, ScheduleEvent,
};
pub use types::{ChatReply, ChatRequest, Message, ProviderDescriptor, ProviderReply, Role};
pub use version::{PKG_VERSION, version_string};
