//! Tests for config and secrets file loading.
#![cfg(feature = "server")]

use std::io::Write;

use sportml::SportmlError;
use sportml::server::config::{Config, Environment, ProviderKind, Secrets};

const SAMPLE: &str = r#"
[server]
address = "0.0.0.0:8080"
environment = "development"

[limits]
requests_per_minute = 10
max_message_chars = 500

[cache]
enabled = false

[[providers]]
kind = "hosted"
name = "groq"
priority = 1
endpoint = "https://api.groq.com/openai/v1/chat/completions"
models = ["llama-3.1-8b-instant"]
api_key_env = "SPORTML_TEST_GROQ_KEY_UNSET"

[[providers]]
kind = "local"
name = "ollama"
priority = 2
endpoint = "http://localhost:11434"
models = ["phi3"]
max_tokens = 800

[[providers]]
kind = "hosted"
name = "openrouter"
priority = 3
endpoint = "https://openrouter.ai/api/v1/chat/completions"
models = ["deepseek/deepseek-r1"]
enrich = true
retry = false

[providers.headers]
"X-Title" = "SportML Chat"
"#;

fn write_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn loads_explicit_config_file() {
    let file = write_file(SAMPLE);
    let config = Config::load(Some(file.path())).unwrap();

    assert_eq!(config.server.address, "0.0.0.0:8080");
    assert_eq!(config.server.environment, Environment::Development);
    assert_eq!(config.limits.requests_per_minute, 10);
    assert_eq!(config.limits.window_secs, 60);
    assert_eq!(config.limits.max_message_chars, 500);
    assert!(!config.cache.enabled);

    assert_eq!(config.providers.len(), 3);
    assert_eq!(config.providers[0].kind, ProviderKind::Hosted);
    assert_eq!(config.providers[1].kind, ProviderKind::Local);
    assert_eq!(config.providers[1].max_tokens, 800);
    assert_eq!(config.providers[2].headers["X-Title"], "SportML Chat");
    assert!(config.providers[2].enrich);
}

#[test]
fn explicit_missing_file_is_an_error() {
    let err = Config::load(Some(std::path::Path::new("/nonexistent/sportml.toml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
}

#[test]
fn unparsable_file_is_an_error() {
    let file = write_file("[server\naddress = ");
    let err = Config::load(Some(file.path())).unwrap_err();
    assert!(matches!(err, SportmlError::Configuration(_)));
}

#[test]
fn empty_document_uses_defaults() {
    let config = Config::from_toml("").unwrap();
    assert_eq!(config.providers.len(), 3);
    assert_eq!(config.limits.requests_per_minute, 25);
    assert!(config.cache.enabled);
}

#[test]
fn validation_rejects_unusable_settings() {
    let zero_window = "[limits]\nwindow_secs = 0\n";
    assert!(Config::from_toml(zero_window).is_err());

    let hosted_without_models = r#"
        [[providers]]
        kind = "hosted"
        name = "groq"
        priority = 1
        endpoint = "https://api.groq.com/openai/v1/chat/completions"
    "#;
    let err = Config::from_toml(hosted_without_models).unwrap_err();
    assert!(err.to_string().contains("groq"));
}

#[test]
fn unknown_provider_kind_is_rejected() {
    let doc = r#"
        [[providers]]
        kind = "carrier-pigeon"
        name = "x"
        priority = 1
        endpoint = "http://x"
    "#;
    assert!(Config::from_toml(doc).is_err());
}

#[test]
fn config_builds_an_orchestrator() {
    let config = Config::from_toml(SAMPLE).unwrap();
    let orchestrator = config.builder(&Secrets::default()).build().unwrap();

    let registry = orchestrator.registry();
    assert_eq!(registry.provider_names(), vec!["groq", "ollama", "openrouter"]);
    // Both hosted providers lack keys in this environment.
    assert_eq!(registry.usable(), 1);
    assert!(orchestrator.cache().is_none());
    assert_eq!(orchestrator.limiter().config().max_requests, 10);
}

#[cfg(unix)]
mod secrets {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn secrets_file(mode: u32) -> tempfile::NamedTempFile {
        let file = write_file("[groq]\napi_key = \"gsk-test\"\n\n[openrouter]\napi_key = \"  \"\n");
        fs::set_permissions(file.path(), fs::Permissions::from_mode(mode)).unwrap();
        file
    }

    #[test]
    fn owner_only_file_is_accepted() {
        let file = secrets_file(0o600);
        let secrets = Secrets::load_from_path(file.path()).unwrap();
        assert_eq!(secrets.api_key("groq", None).as_deref(), Some("gsk-test"));
    }

    #[test]
    fn read_only_file_is_accepted() {
        let file = secrets_file(0o400);
        assert!(Secrets::load_from_path(file.path()).is_ok());
    }

    #[test]
    fn world_readable_file_is_rejected() {
        let file = secrets_file(0o644);
        let err = Secrets::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("insecure permissions"));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let file = secrets_file(0o600);
        let secrets = Secrets::load_from_path(file.path()).unwrap();
        assert_eq!(secrets.api_key("openrouter", None), None);
    }

    #[test]
    fn secrets_make_hosted_provider_usable() {
        let file = secrets_file(0o600);
        let secrets = Secrets::load_from_path(file.path()).unwrap();
        let config = Config::from_toml(SAMPLE).unwrap();

        let groq = config.providers[0].descriptor(&secrets);
        assert!(groq.is_configured());
        assert_eq!(groq.credential.as_deref(), Some("gsk-test"));

        let openrouter = config.providers[2].descriptor(&secrets);
        assert!(!openrouter.is_configured());
    }
}
