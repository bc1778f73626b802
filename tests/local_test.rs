//! Integration tests for the local generation adapter against a mock server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sportml::providers::LocalGenerateAdapter;
use sportml::{CallContext, ProviderAdapter, ProviderDescriptor, SportmlError};

fn adapter(server: &MockServer, models: &[&str]) -> LocalGenerateAdapter {
    // Trailing slash is tolerated.
    let descriptor = ProviderDescriptor::new("ollama", format!("{}/", server.uri()))
        .priority(2)
        .models(models.iter().copied())
        .system_prompt("Answer sport questions only.");
    LocalGenerateAdapter::new(descriptor).unwrap()
}

async fn mount_tags(server: &MockServer, names: &[&str]) {
    let models: Vec<_> = names.iter().map(|n| json!({ "name": n })).collect();
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": models })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn generates_with_matching_installed_model() {
    let server = MockServer::start().await;
    mount_tags(&server, &["phi3:latest", "llama3.2:1b"]).await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "llama3.2:1b",
            "stream": false,
            "options": {
                "num_predict": 1000,
                "stop": ["\nQuestion:", "\nQ:", "Question:"]
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": " Lionel Messi. ",
            "done": true,
            "total_duration": 1_234_000_000u64
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = adapter(&server, &["llama3.2:3b"])
        .invoke("Who won the 2022 Ballon d'Or?", &CallContext::default())
        .await
        .unwrap();

    assert_eq!(reply.text, "Lionel Messi.");
    assert_eq!(reply.provider, "ollama");
    assert_eq!(reply.model, "llama3.2:1b");
    assert_eq!(reply.usage.unwrap()["total_duration"], 1_234_000_000u64);
}

#[tokio::test]
async fn prompt_carries_system_prompt_and_question() {
    let server = MockServer::start().await;
    mount_tags(&server, &["phi3:latest"]).await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "prompt": "Answer sport questions only.\n\nQuestion: Who is the GOAT?\nAnswer:"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "Depends." })))
        .expect(1)
        .mount(&server)
        .await;

    adapter(&server, &["phi3"])
        .invoke("Who is the GOAT?", &CallContext::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn no_candidate_match_uses_first_installed() {
    let server = MockServer::start().await;
    mount_tags(&server, &["gemma:2b", "qwen:0.5b"]).await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({ "model": "gemma:2b" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = adapter(&server, &["mistral"])
        .invoke("q", &CallContext::default())
        .await
        .unwrap();
    assert_eq!(reply.model, "gemma:2b");
}

#[tokio::test]
async fn nothing_installed_is_no_suitable_model() {
    let server = MockServer::start().await;
    mount_tags(&server, &[]).await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = adapter(&server, &["phi3"])
        .invoke("q", &CallContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SportmlError::NoSuitableModel));
}

#[tokio::test]
async fn tags_failure_is_service_down() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = adapter(&server, &["phi3"])
        .invoke("q", &CallContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SportmlError::ServiceDown(_)));
}

#[tokio::test]
async fn unreachable_service_is_service_down() {
    let descriptor = ProviderDescriptor::new("ollama", "http://127.0.0.1:9").models(["phi3"]);
    let err = LocalGenerateAdapter::new(descriptor)
        .unwrap()
        .invoke("q", &CallContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SportmlError::ServiceDown(_)));
}

#[tokio::test]
async fn blank_generation_is_empty_response() {
    let server = MockServer::start().await;
    mount_tags(&server, &["phi3:latest"]).await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "  \n" })))
        .mount(&server)
        .await;

    let err = adapter(&server, &["phi3"])
        .invoke("q", &CallContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SportmlError::EmptyResponse));
}

#[tokio::test]
async fn generate_error_status_is_reported() {
    let server = MockServer::start().await;
    mount_tags(&server, &["phi3:latest"]).await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
        .mount(&server)
        .await;

    let err = adapter(&server, &["phi3"])
        .invoke("q", &CallContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SportmlError::Api { status: 404, .. }));
}

#[test]
fn local_provider_needs_no_credential() {
    let descriptor = ProviderDescriptor::new("ollama", "http://localhost:11434");
    let adapter = LocalGenerateAdapter::new(descriptor).unwrap();
    assert!(adapter.is_configured());
}
