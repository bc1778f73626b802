//! Configuration loading for sportmld.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.sportml/config.toml` (user)
//! 3. `/etc/sportml/config.toml` (system)
//!
//! When none exists, the built-in defaults apply (Groq, then local Ollama,
//! then OpenRouter).
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.sportml/secrets.toml` (user, must be 0600)
//! 2. `/etc/sportml/secrets.toml` (system, must be 0600)

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::cache::CacheConfig;
use crate::gateway::{ProviderOptions, Sportml, SportmlBuilder};
use crate::limiter::RateLimitConfig;
use crate::providers::enrichment::{DEFAULT_ENRICHMENT_LEAGUE, DEFAULT_KEYWORDS};
use crate::providers::schedule::{DEFAULT_LEAGUE, DEFAULT_SCHEDULE_BASE_URL};
use crate::providers::{EnrichmentConfig, RetryConfig, ScheduleConfig};
use crate::types::{DEFAULT_SYSTEM_PROMPT, ProviderDescriptor};
use crate::{Result, SportmlError};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub schedule: ScheduleSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            limits: LimitsConfig::default(),
            cache: CacheSection::default(),
            retry: RetrySection::default(),
            providers: default_providers(),
            schedule: ScheduleSection::default(),
        }
    }
}

/// Deployment environment; `development` exposes error details in 500 bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

/// Server network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:3000).
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default)]
    pub environment: Environment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            environment: Environment::default(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:3000".to_string()
}

/// Admission and request limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Requests per client per window (default: 25).
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: usize,
    /// Sliding window length in seconds (default: 60).
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Maximum message length in characters (default: 2000).
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
    /// Deadline for one provider call in seconds (default: 15).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            window_secs: default_window_secs(),
            max_message_chars: default_max_message_chars(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_requests_per_minute() -> usize {
    25
}

fn default_window_secs() -> u64 {
    60
}

fn default_max_message_chars() -> usize {
    crate::types::DEFAULT_MAX_MESSAGE_CHARS
}

fn default_request_timeout() -> u64 {
    15
}

/// Reply cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_evict_batch")]
    pub evict_batch: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
            evict_batch: default_evict_batch(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_ttl_secs() -> u64 {
    15 * 60
}

fn default_max_entries() -> usize {
    100
}

fn default_evict_batch() -> usize {
    20
}

/// Retry policy for providers with `retry` enabled.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    4000
}

/// Which adapter serves a provider entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions, credentialed.
    Hosted,
    /// Ollama-compatible local generation, no credential.
    Local,
}

/// One `[[providers]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub name: String,
    pub priority: u32,
    pub endpoint: String,
    #[serde(default)]
    pub models: Vec<String>,
    /// Environment variable holding the API key when the secrets file has none.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Retry transient failures. Default: on for hosted, off for local.
    #[serde(default)]
    pub retry: Option<bool>,
    /// Wrap with schedule enrichment.
    #[serde(default)]
    pub enrich: bool,
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_temperature() -> f32 {
    0.7
}

impl ProviderConfig {
    /// Resolve into a descriptor, attaching the credential for hosted kinds.
    pub fn descriptor(&self, secrets: &Secrets) -> ProviderDescriptor {
        let mut descriptor = ProviderDescriptor::new(&self.name, &self.endpoint)
            .priority(self.priority)
            .models(self.models.iter().cloned())
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .system_prompt(
                self.system_prompt
                    .as_deref()
                    .unwrap_or(DEFAULT_SYSTEM_PROMPT),
            );
        if self.kind == ProviderKind::Hosted {
            descriptor =
                descriptor.credential(secrets.api_key(&self.name, self.api_key_env.as_deref()));
        }
        for (name, value) in &self.headers {
            descriptor = descriptor.header(name, value);
        }
        descriptor
    }

    fn options(&self) -> ProviderOptions {
        ProviderOptions {
            retry: self.retry.unwrap_or(self.kind == ProviderKind::Hosted),
            enrich: self.enrich,
        }
    }
}

fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig {
            kind: ProviderKind::Hosted,
            name: "groq".into(),
            priority: 1,
            endpoint: "https://api.groq.com/openai/v1/chat/completions".into(),
            models: vec![
                "llama-3.1-70b-versatile".into(),
                "llama-3.1-8b-instant".into(),
                "mixtral-8x7b-32768".into(),
            ],
            api_key_env: Some("GROQ_API_KEY".into()),
            max_tokens: 1000,
            temperature: 0.7,
            system_prompt: None,
            headers: BTreeMap::new(),
            retry: None,
            enrich: false,
        },
        ProviderConfig {
            kind: ProviderKind::Local,
            name: "ollama".into(),
            priority: 2,
            endpoint: "http://localhost:11434".into(),
            models: vec!["llama3.2:3b".into(), "llama3.2:1b".into(), "phi3".into()],
            api_key_env: None,
            max_tokens: 800,
            temperature: 0.7,
            system_prompt: None,
            headers: BTreeMap::new(),
            retry: None,
            enrich: false,
        },
        ProviderConfig {
            kind: ProviderKind::Hosted,
            name: "openrouter".into(),
            priority: 3,
            endpoint: "https://openrouter.ai/api/v1/chat/completions".into(),
            models: vec!["deepseek/deepseek-r1".into()],
            api_key_env: Some("OPENROUTER_API_KEY".into()),
            max_tokens: 1000,
            temperature: 0.7,
            system_prompt: None,
            headers: BTreeMap::from([
                ("HTTP-Referer".into(), "http://localhost:3000".into()),
                ("X-Title".into(), "SportML Chat".into()),
            ]),
            retry: None,
            enrich: true,
        },
    ]
}

/// Schedule feed settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSection {
    #[serde(default = "default_schedule_base_url")]
    pub base_url: String,
    /// League served by `/api/next-events` without `leagueId`.
    #[serde(default = "default_league")]
    pub default_league: String,
    #[serde(default = "default_event_limit")]
    pub limit: usize,
    #[serde(default = "default_schedule_timeout")]
    pub timeout_secs: u64,
    /// Enrichment trigger keywords.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    /// League fetched for enrichment context.
    #[serde(default = "default_enrichment_league")]
    pub league: String,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            base_url: default_schedule_base_url(),
            default_league: default_league(),
            limit: default_event_limit(),
            timeout_secs: default_schedule_timeout(),
            keywords: default_keywords(),
            league: default_enrichment_league(),
        }
    }
}

fn default_schedule_base_url() -> String {
    DEFAULT_SCHEDULE_BASE_URL.to_string()
}

fn default_league() -> String {
    DEFAULT_LEAGUE.to_string()
}

fn default_event_limit() -> usize {
    5
}

fn default_schedule_timeout() -> u64 {
    5
}

fn default_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.iter().map(|k| (*k).to_string()).collect()
}

fn default_enrichment_league() -> String {
    DEFAULT_ENRICHMENT_LEAGUE.to_string()
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided; must exist)
    /// 2. `~/.sportml/config.toml`
    /// 3. `/etc/sportml/config.toml`
    /// 4. Built-in defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let Some(path) = Self::resolve_config_path(explicit_path)? else {
            info!("no config file found, using built-in defaults");
            return Ok(Self::default());
        };
        let content = fs::read_to_string(&path).map_err(|e| {
            SportmlError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        let config = Self::from_toml(&content).map_err(|e| {
            SportmlError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| SportmlError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the server unusable.
    pub fn validate(&self) -> Result<()> {
        if self.limits.window_secs == 0 {
            return Err(SportmlError::Configuration(
                "limits.window_secs must be greater than 0".into(),
            ));
        }
        if self.limits.request_timeout_secs == 0 {
            return Err(SportmlError::Configuration(
                "limits.request_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.limits.max_message_chars == 0 {
            return Err(SportmlError::Configuration(
                "limits.max_message_chars must be greater than 0".into(),
            ));
        }
        if self.providers.is_empty() {
            return Err(SportmlError::Configuration(
                "at least one [[providers]] entry is required".into(),
            ));
        }
        for provider in &self.providers {
            if provider.endpoint.trim().is_empty() {
                return Err(SportmlError::Configuration(format!(
                    "provider {} has an empty endpoint",
                    provider.name
                )));
            }
            if provider.kind == ProviderKind::Hosted && provider.models.is_empty() {
                return Err(SportmlError::Configuration(format!(
                    "hosted provider {} lists no models",
                    provider.name
                )));
            }
        }
        Ok(())
    }

    /// Translate into an orchestrator builder.
    pub fn builder(&self, secrets: &Secrets) -> SportmlBuilder {
        let mut builder = Sportml::builder()
            .rate_limit(
                RateLimitConfig::new()
                    .max_requests(self.limits.requests_per_minute)
                    .window(Duration::from_secs(self.limits.window_secs)),
            )
            .max_message_chars(self.limits.max_message_chars)
            .call_timeout(Duration::from_secs(self.limits.request_timeout_secs))
            .retry_config(
                RetryConfig::new()
                    .max_attempts(self.retry.max_attempts)
                    .initial_delay(Duration::from_millis(self.retry.initial_delay_ms))
                    .max_delay(Duration::from_millis(self.retry.max_delay_ms)),
            )
            .schedule(
                ScheduleConfig::new()
                    .base_url(&self.schedule.base_url)
                    .default_league(&self.schedule.default_league)
                    .limit(self.schedule.limit)
                    .timeout(Duration::from_secs(self.schedule.timeout_secs)),
            )
            .enrichment(
                EnrichmentConfig::new()
                    .keywords(self.schedule.keywords.iter().cloned())
                    .league(&self.schedule.league),
            );

        if self.cache.enabled {
            builder = builder.response_cache(
                CacheConfig::new()
                    .ttl(Duration::from_secs(self.cache.ttl_secs))
                    .max_entries(self.cache.max_entries)
                    .evict_batch(self.cache.evict_batch),
            );
        }

        for provider in &self.providers {
            let descriptor = provider.descriptor(secrets);
            builder = match provider.kind {
                ProviderKind::Hosted => builder.hosted_with(descriptor, provider.options()),
                ProviderKind::Local => builder.local_with(descriptor, provider.options()),
            };
        }
        builder
    }

    /// Resolve the config file path; `None` when no file exists.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(SportmlError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".sportml").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/sportml/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

/// Secrets configuration (API keys), one table per provider name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Secrets {
    providers: HashMap<String, ApiKeySecret>,
}

/// A single API key secret.
#[derive(Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

impl fmt::Debug for ApiKeySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeySecret")
            .field("api_key", &"[redacted]")
            .finish()
    }
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Resolution order:
    /// 1. `~/.sportml/secrets.toml` (if exists, must be 0600)
    /// 2. `/etc/sportml/secrets.toml` (if exists, must be 0600)
    ///
    /// Returns empty secrets if no file exists (providers may use env vars).
    pub fn load() -> Result<Self> {
        // Try user secrets first
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".sportml").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_path(&user_secrets);
            }
        }

        // Try system secrets
        let system_secrets = PathBuf::from("/etc/sportml/secrets.toml");
        if system_secrets.exists() {
            return Self::load_from_path(&system_secrets);
        }

        Ok(Secrets::default())
    }

    /// Load one secrets file after checking its permissions.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            SportmlError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            SportmlError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            SportmlError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            return Err(SportmlError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// API key for `provider`, falling back to the `env_var` environment variable.
    ///
    /// Blank values count as missing.
    pub fn api_key(&self, provider: &str, env_var: Option<&str>) -> Option<String> {
        self.providers
            .get(provider)
            .map(|s| s.api_key.trim().to_owned())
            .filter(|key| !key.is_empty())
            .or_else(|| {
                env_var
                    .and_then(|name| std::env::var(name).ok())
                    .map(|key| key.trim().to_owned())
                    .filter(|key| !key.is_empty())
            })
    }
}
