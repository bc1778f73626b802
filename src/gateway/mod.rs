//! Orchestrator and its builder

mod builder;
mod orchestrator;

pub use builder::{DEFAULT_CALL_TIMEOUT, ProviderOptions, Sportml, SportmlBuilder};
pub use orchestrator::RequestOrchestrator;
