//! Integration tests for the hosted chat-completion adapter against a mock server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sportml::providers::HostedChatAdapter;
use sportml::{CallContext, ProviderAdapter, ProviderDescriptor, SportmlError};

fn descriptor(server: &MockServer, models: &[&str]) -> ProviderDescriptor {
    ProviderDescriptor::new("groq", format!("{}/openai/v1/chat/completions", server.uri()))
        .priority(1)
        .models(models.iter().copied())
        .credential(Some("gsk_test".into()))
}

fn completion(text: &str) -> serde_json::Value {
    json!({
        "choices": [{ "message": { "role": "assistant", "content": text } }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 5 }
    })
}

#[tokio::test]
async fn answers_with_first_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(header("Authorization", "Bearer gsk_test"))
        .and(body_partial_json(json!({
            "model": "m1",
            "max_tokens": 1000,
            "stream": false,
            "messages": [{ "role": "system" }, { "role": "user", "content": "Who won the 2022 World Cup?" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("  Argentina.  ")))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = HostedChatAdapter::new(descriptor(&server, &["m1", "m2"])).unwrap();
    let reply = adapter
        .invoke("Who won the 2022 World Cup?", &CallContext::default())
        .await
        .unwrap();

    assert_eq!(reply.text, "Argentina.");
    assert_eq!(reply.provider, "groq");
    assert_eq!(reply.model, "m1");
    assert_eq!(reply.usage.unwrap()["completion_tokens"], 5);
}

#[tokio::test]
async fn rate_limited_model_falls_through_to_next() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "model": "m1" })))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "model": "m2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Real Madrid.")))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = HostedChatAdapter::new(descriptor(&server, &["m1", "m2"])).unwrap();
    let reply = adapter
        .invoke("Who won the 2024 Champions League?", &CallContext::default())
        .await
        .unwrap();

    assert_eq!(reply.model, "m2");
    assert_eq!(reply.label(), "groq (m2)");
}

#[tokio::test]
async fn empty_content_falls_through_to_next_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "model": "m1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("   ")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "model": "m2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "model": "m3" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Yes.")))
        .mount(&server)
        .await;

    let adapter = HostedChatAdapter::new(descriptor(&server, &["m1", "m2", "m3"])).unwrap();
    let reply = adapter
        .invoke("q", &CallContext::default())
        .await
        .unwrap();
    assert_eq!(reply.model, "m3");
}

#[tokio::test]
async fn all_models_failing_transiently_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "model": "m1" })))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "model": "m2" })))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    let adapter = HostedChatAdapter::new(descriptor(&server, &["m1", "m2"])).unwrap();
    let err = adapter
        .invoke("q", &CallContext::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SportmlError::AllModelsUnavailable {
            tried: 2,
            retryable: true
        }
    ));
    assert!(err.is_transient());
}

#[tokio::test]
async fn all_models_failing_permanently_is_not_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "invalid key" })))
        .expect(2)
        .mount(&server)
        .await;

    let adapter = HostedChatAdapter::new(descriptor(&server, &["m1", "m2"])).unwrap();
    let err = adapter
        .invoke("q", &CallContext::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SportmlError::AllModelsUnavailable {
            tried: 2,
            retryable: false
        }
    ));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn malformed_body_falls_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "model": "m1" })))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "model": "m2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .mount(&server)
        .await;

    let adapter = HostedChatAdapter::new(descriptor(&server, &["m1", "m2"])).unwrap();
    let reply = adapter
        .invoke("q", &CallContext::default())
        .await
        .unwrap();
    assert_eq!(reply.model, "m2");
}

#[tokio::test]
async fn extra_headers_and_settings_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("HTTP-Referer", "https://sportml.example"))
        .and(header("X-Title", "SportML Chat"))
        .and(body_partial_json(json!({ "max_tokens": 500 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let descriptor = descriptor(&server, &["m1"])
        .max_tokens(500)
        .temperature(0.2)
        .header("HTTP-Referer", "https://sportml.example")
        .header("X-Title", "SportML Chat");
    let adapter = HostedChatAdapter::new(descriptor).unwrap();
    adapter
        .invoke("q", &CallContext::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn unreachable_endpoint_is_retryable() {
    // Nothing listens on port 9 of localhost in the test environment.
    let descriptor = ProviderDescriptor::new("groq", "http://127.0.0.1:9/v1/chat/completions")
        .models(["m1"])
        .credential(Some("k".into()));
    let adapter = HostedChatAdapter::new(descriptor).unwrap();
    let err = adapter
        .invoke("q", &CallContext::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SportmlError::AllModelsUnavailable {
            retryable: true,
            ..
        }
    ));
}

#[tokio::test]
async fn missing_credential_reports_unconfigured() {
    let server = MockServer::start().await;
    let descriptor = ProviderDescriptor::new("groq", server.uri())
        .models(["m1"])
        .credential(None);
    let adapter = HostedChatAdapter::new(descriptor).unwrap();
    assert!(!adapter.is_configured());
}

#[tokio::test]
async fn cancelled_context_aborts_sweep() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("late")))
        .expect(0)
        .mount(&server)
        .await;

    let adapter = HostedChatAdapter::new(descriptor(&server, &["m1", "m2"])).unwrap();
    let ctx = CallContext::default();
    ctx.token().cancel();
    let err = adapter.invoke("q", &ctx).await.unwrap_err();
    assert!(matches!(err, SportmlError::Cancelled));
}
