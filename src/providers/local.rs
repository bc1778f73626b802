//! Local generation adapter (Ollama HTTP API).
//!
//! Two calls per invocation:
//!
//! 1. `GET {base}/api/tags` lists installed models. Any failure here means
//!    the local service is not reachable: [`SportmlError::ServiceDown`].
//! 2. `POST {base}/api/generate` against the selected model, non-streaming,
//!    with stop sequences that cut the model off before it invents a
//!    follow-up question.
//!
//! Model selection takes the first configured candidate whose base name
//! (before any `:tag`) appears in an installed model name, else the first
//! installed model. An empty install list is [`SportmlError::NoSuitableModel`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::http::{build_client, check_status, read_json};
use super::traits::{CallContext, ProviderAdapter};
use crate::types::{ProviderDescriptor, ProviderReply};
use crate::{Result, SportmlError};

/// Stop sequences passed to every generation call.
pub const STOP_SEQUENCES: [&str; 3] = ["\nQuestion:", "\nQ:", "Question:"];

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Adapter for a local, credential-free generation service.
pub struct LocalGenerateAdapter {
    descriptor: ProviderDescriptor,
    base_url: String,
    http: reqwest::Client,
}

impl LocalGenerateAdapter {
    /// Create an adapter with its own HTTP client.
    ///
    /// `descriptor.endpoint` is the service base URL, e.g. `http://localhost:11434`.
    pub fn new(descriptor: ProviderDescriptor) -> Result<Self> {
        Ok(Self::with_client(descriptor, build_client(CONNECT_TIMEOUT)?))
    }

    /// Create an adapter sharing an existing HTTP client.
    pub fn with_client(descriptor: ProviderDescriptor, http: reqwest::Client) -> Self {
        let base_url = descriptor.endpoint.trim_end_matches('/').to_owned();
        Self {
            descriptor,
            base_url,
            http,
        }
    }

    async fn installed_models(&self, ctx: &CallContext) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        let listing: TagsResponse = ctx
            .run(async {
                let response = self
                    .http
                    .get(&url)
                    .send()
                    .await
                    .map_err(SportmlError::from_transport)?;
                let response = check_status(response).await?;
                read_json(response).await
            })
            .await
            .map_err(|e| match e {
                SportmlError::Cancelled => SportmlError::Cancelled,
                other => SportmlError::ServiceDown(other.to_string()),
            })?;

        Ok(listing.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl ProviderAdapter for LocalGenerateAdapter {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn is_configured(&self) -> bool {
        self.descriptor.is_configured()
    }

    async fn invoke(&self, message: &str, ctx: &CallContext) -> Result<ProviderReply> {
        let installed = self.installed_models(ctx).await?;
        let model = select_model(&self.descriptor.models, &installed)
            .ok_or(SportmlError::NoSuitableModel)?
            .to_owned();
        debug!(provider = %self.descriptor.name, model = %model, "selected local model");

        let body = GenerateRequest {
            model: &model,
            prompt: build_prompt(&self.descriptor.system_prompt, message),
            stream: false,
            options: json!({
                "temperature": self.descriptor.temperature,
                "num_predict": self.descriptor.max_tokens,
                "stop": STOP_SEQUENCES,
            }),
        };

        let url = format!("{}/api/generate", self.base_url);
        let generated: GenerateResponse = ctx
            .run(async {
                let response = self
                    .http
                    .post(&url)
                    .json(&body)
                    .send()
                    .await
                    .map_err(SportmlError::from_transport)?;
                let response = check_status(response).await?;
                read_json(response).await
            })
            .await?;

        let text = generated.response.trim().to_owned();
        if text.is_empty() {
            return Err(SportmlError::EmptyResponse);
        }

        Ok(ProviderReply {
            text,
            provider: self.descriptor.name.clone(),
            model,
            usage: generated
                .total_duration
                .map(|ns| json!({ "total_duration": ns })),
        })
    }
}

/// Pick the model to run from the installed list.
pub fn select_model<'a>(candidates: &[String], installed: &'a [String]) -> Option<&'a str> {
    candidates
        .iter()
        .find_map(|candidate| {
            let base = candidate.split(':').next().unwrap_or(candidate.as_str());
            installed.iter().find(|name| name.contains(base))
        })
        .or_else(|| installed.first())
        .map(String::as_str)
}

/// Single-turn prompt ending in an open answer slot.
fn build_prompt(system_prompt: &str, message: &str) -> String {
    format!("{system_prompt}\n\nQuestion: {message}\nAnswer:")
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<InstalledModel>,
}

#[derive(Deserialize)]
struct InstalledModel {
    name: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    total_duration: Option<u64>,
}
