//! Provider descriptors.

use std::fmt;

/// Default system prompt for sports-only assistants.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are SportML Chat, an assistant specialised exclusively in sport.

Rules:
- Answer ONLY questions about sport (football, tennis, basketball, handball, athletics, swimming, gymnastics, wrestling, boxing, MMA, Formula 1, cycling, volleyball, Olympic sports, etc.)
- For any other topic reply: \"Sorry, I only cover sport. Ask me about football, tennis, basketball or any other sport!\"
- Keep answers concise, clear and informative
- Friendly tone, enthusiastic about sport
- If you do not know something, say so openly
- No special formatting
- Reply in the language the user writes in

Focus on: results, standings, transfers, statistics, history, records, competitions, teams, players.";

/// Static description of one upstream provider.
///
/// Providers are attempted in ascending `priority` (lower first). A
/// provider that `requires_credential` but has none is skipped by the
/// registry without counting as a failed attempt.
#[derive(Clone)]
pub struct ProviderDescriptor {
    pub name: String,
    pub priority: u32,
    /// Chat-completion URL (hosted) or base URL (local).
    pub endpoint: String,
    /// Candidate model identifiers, in preference order.
    pub models: Vec<String>,
    pub credential: Option<String>,
    pub requires_credential: bool,
    pub max_tokens: u32,
    pub temperature: f32,
    pub system_prompt: String,
    /// Extra static headers sent with every call (e.g. attribution headers).
    pub headers: Vec<(String, String)>,
}

impl ProviderDescriptor {
    /// Create a descriptor with sensible defaults (priority 0, 1000 tokens, 0.7).
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            endpoint: endpoint.into(),
            models: Vec::new(),
            credential: None,
            requires_credential: false,
            max_tokens: 1000,
            temperature: 0.7,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
            headers: Vec::new(),
        }
    }

    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the provider as requiring a credential and set it (if known).
    ///
    /// Passing `None` keeps the requirement, so the provider is skipped.
    pub fn credential(mut self, credential: Option<String>) -> Self {
        self.requires_credential = true;
        self.credential = credential.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Whether everything needed to call the provider is present.
    pub fn is_configured(&self) -> bool {
        !self.requires_credential || self.credential.is_some()
    }
}

// Hand-written so credentials never reach logs.
impl fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("endpoint", &self.endpoint)
            .field("models", &self.models)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("requires_credential", &self.requires_credential)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}
