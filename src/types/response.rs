//! Provider replies and the outbound chat reply body

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A successful provider call, normalised across providers.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReply {
    /// Reply text, trimmed and non-empty.
    pub text: String,
    /// Name of the provider that answered.
    pub provider: String,
    /// Model that produced the reply.
    pub model: String,
    /// Provider-specific usage metadata, passed through untouched.
    pub usage: Option<Value>,
}

impl ProviderReply {
    /// Attribution label, e.g. `groq (llama-3.1-8b-instant)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.provider, self.model)
    }
}

/// Label used for replies served from the response cache.
pub const CACHE_PROVIDER_LABEL: &str = "cache";

/// Body of a successful chat response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub cached: bool,
    /// Wall-clock handling time in milliseconds.
    pub response_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
}

impl ChatReply {
    /// Reply served from the response cache.
    pub fn from_cache(reply: String, response_time: u64) -> Self {
        Self {
            reply,
            provider: Some(CACHE_PROVIDER_LABEL.to_owned()),
            cached: true,
            response_time,
            usage: None,
        }
    }

    /// Reply produced by a provider on this request.
    pub fn from_provider(reply: ProviderReply, response_time: u64) -> Self {
        Self {
            provider: Some(reply.label()),
            reply: reply.text,
            cached: false,
            response_time,
            usage: reply.usage,
        }
    }
}
