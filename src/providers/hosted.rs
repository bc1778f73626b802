//! Hosted chat-completion adapter (OpenAI-compatible endpoints).
//!
//! Sends `{model, messages, max_tokens, temperature, stream: false}` to a
//! chat-completions endpoint and reads `choices[0].message.content`.
//!
//! The adapter sweeps its candidate models in configured order. Any
//! failure on one model (429, other non-2xx, network error, missing or
//! empty content) moves straight to the next model with no delay. Only
//! when every model has failed does the adapter return
//! [`SportmlError::AllModelsUnavailable`], flagged `retryable` if at least
//! one model failed transiently.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::http::{build_client, check_status, read_json};
use super::traits::{CallContext, ProviderAdapter};
use crate::types::{Message, ProviderDescriptor, ProviderReply};
use crate::{Result, SportmlError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Adapter for a hosted, credentialed chat-completion provider.
pub struct HostedChatAdapter {
    descriptor: ProviderDescriptor,
    http: reqwest::Client,
}

impl HostedChatAdapter {
    /// Create an adapter with its own HTTP client.
    pub fn new(descriptor: ProviderDescriptor) -> Result<Self> {
        Ok(Self::with_client(descriptor, build_client(CONNECT_TIMEOUT)?))
    }

    /// Create an adapter sharing an existing HTTP client.
    pub fn with_client(descriptor: ProviderDescriptor, http: reqwest::Client) -> Self {
        Self { descriptor, http }
    }

    pub fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn call_model(
        &self,
        model: &str,
        message: &str,
        ctx: &CallContext,
    ) -> Result<ProviderReply> {
        let body = ChatCompletionRequest {
            model,
            messages: vec![
                Message::system(self.descriptor.system_prompt.as_str()),
                Message::user(message),
            ],
            max_tokens: self.descriptor.max_tokens,
            temperature: self.descriptor.temperature,
            stream: false,
        };

        let mut request = self.http.post(&self.descriptor.endpoint).json(&body);
        if let Some(key) = &self.descriptor.credential {
            request = request.bearer_auth(key);
        }
        for (name, value) in &self.descriptor.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let parsed: ChatCompletionResponse = ctx
            .run(async {
                let response = request.send().await.map_err(SportmlError::from_transport)?;
                let response = check_status(response).await?;
                read_json(response).await
            })
            .await?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|content| content.trim().to_owned())
            .filter(|content| !content.is_empty())
            .ok_or(SportmlError::EmptyResponse)?;

        Ok(ProviderReply {
            text,
            provider: self.descriptor.name.clone(),
            model: model.to_owned(),
            usage: parsed.usage,
        })
    }
}

#[async_trait]
impl ProviderAdapter for HostedChatAdapter {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn is_configured(&self) -> bool {
        self.descriptor.is_configured()
    }

    async fn invoke(&self, message: &str, ctx: &CallContext) -> Result<ProviderReply> {
        let mut tried = 0;
        let mut retryable = false;

        for model in &self.descriptor.models {
            tried += 1;
            match self.call_model(model, message, ctx).await {
                Ok(reply) => {
                    debug!(provider = %self.descriptor.name, model = %model, "model answered");
                    return Ok(reply);
                }
                Err(SportmlError::Cancelled) => return Err(SportmlError::Cancelled),
                Err(e) => {
                    retryable |= e.is_transient();
                    warn!(
                        provider = %self.descriptor.name,
                        model = %model,
                        reason = %e.reason(),
                        error = %e,
                        "model failed, trying next"
                    );
                }
            }
        }

        Err(SportmlError::AllModelsUnavailable { tried, retryable })
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Value>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
