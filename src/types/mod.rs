//! Public types for the sportml API.

mod message;
mod provider;
mod request;
mod response;

pub use message::{Message, Role};
pub use provider::{DEFAULT_SYSTEM_PROMPT, ProviderDescriptor};
pub use request::{ChatRequest, DEFAULT_MAX_MESSAGE_CHARS};
pub use response::{CACHE_PROVIDER_LABEL, ChatReply, ProviderReply};
