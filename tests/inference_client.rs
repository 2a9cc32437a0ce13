//! InferenceClient against a simulated Ollama backend.
//!
//! Each test starts its own backend (`wiremock`, or a raw TCP listener for
//! misbehaving servers), so tests run independently and in parallel.

use std::sync::Arc;
use std::time::Duration;

use llm_relay::inference::{
    BackendConfig, GenerationError, GenerationRequest, InferenceClient, ModelInfo,
};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "qwen3:0.6b";

fn client_for(server: &MockServer) -> InferenceClient {
    InferenceClient::new(BackendConfig::new(server.uri(), MODEL))
}

/// A base URL on which nothing is listening.
fn unreachable_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

async fn mount_tags(server: &MockServer, names: &[&str]) {
    let models: Vec<_> = names
        .iter()
        .map(|n| json!({"name": n, "size": 522653767, "details": {"family": "qwen3"}}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": models })))
        .mount(server)
        .await;
}

// ─── check_health ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_true_when_model_listed() {
    let server = MockServer::start().await;
    mount_tags(&server, &["llama3:8b", MODEL]).await;

    assert!(client_for(&server).check_health().await);
}

#[tokio::test]
async fn test_health_false_when_model_missing() {
    let server = MockServer::start().await;
    mount_tags(&server, &["other-model"]).await;

    assert!(!client_for(&server).check_health().await);
}

#[tokio::test]
async fn test_health_requires_exact_name_match() {
    let server = MockServer::start().await;
    mount_tags(&server, &["qwen3:0.6b-q8_0", "QWEN3:0.6B"]).await;

    assert!(!client_for(&server).check_health().await);
}

#[tokio::test]
async fn test_health_false_on_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    assert!(!client_for(&server).check_health().await);
}

#[tokio::test]
async fn test_health_false_on_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    assert!(!client_for(&server).check_health().await);
}

#[tokio::test]
async fn test_health_false_when_unreachable() {
    let client = InferenceClient::new(BackendConfig::new(unreachable_base_url(), MODEL));
    assert!(!client.check_health().await);
}

#[tokio::test]
async fn test_health_false_on_readiness_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"models": [{"name": MODEL}]}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let cfg = BackendConfig {
        readiness_timeout_ms: 100,
        ..BackendConfig::new(server.uri(), MODEL)
    };
    assert!(!InferenceClient::new(cfg).check_health().await);
}

// ─── generate ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_generate_relays_response_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_json(json!({
            "model": MODEL,
            "prompt": "2+2=",
            "stream": false,
            "options": {"num_predict": 10, "temperature": 0.0}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": MODEL,
            "response": "4",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = GenerationRequest::new("2+2=").max_tokens(10).temperature(0.0);
    let result = client_for(&server).generate(&request).await.unwrap();
    assert_eq!(result.text, "4");
}

#[tokio::test]
async fn test_generate_sends_default_options() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "hi"})))
        .mount(&server)
        .await;

    client_for(&server)
        .generate(&GenerationRequest::new("hello"))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["options"]["num_predict"], 100);
    assert!((body["options"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    assert_eq!(body["stream"], false);
}

#[tokio::test]
async fn test_generate_keeps_text_verbatim() {
    let text = "  line one\n\tline two  \u{1F600}\n";
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": text })))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .generate(&GenerationRequest::new("x"))
        .await
        .unwrap();
    assert_eq!(result.text, text);
}

#[tokio::test]
async fn test_generate_missing_response_uses_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"done": true})))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .generate(&GenerationRequest::new("x"))
        .await
        .unwrap();
    assert_eq!(result.text, "No response generated");
}

#[tokio::test]
async fn test_generate_missing_response_uses_configured_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": null})))
        .mount(&server)
        .await;

    let cfg = BackendConfig {
        fallback_text: String::new(),
        ..BackendConfig::new(server.uri(), MODEL)
    };
    let result = InferenceClient::new(cfg)
        .generate(&GenerationRequest::new("x"))
        .await
        .unwrap();
    assert_eq!(result.text, "");
}

#[tokio::test]
async fn test_generate_timeout_is_reported_as_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"response": "late"}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let cfg = BackendConfig {
        generation_timeout_ms: 150,
        ..BackendConfig::new(server.uri(), MODEL)
    };
    let err = InferenceClient::new(cfg)
        .generate(&GenerationRequest::new("x"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, GenerationError::Timeout { duration_ms: 150 }),
        "expected Timeout, got {err:?}"
    );
}

/// Backend that answers every connection with `status_line`, promises a
/// 100-byte body, sends only part of it, then stalls.
async fn stalling_backend(status_line: &'static str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let head = format!(
                    "{status_line}\r\nContent-Type: text/plain\r\n\
                     Content-Length: 100\r\n\r\npartial"
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.flush().await;
                tokio::time::sleep(Duration::from_secs(5)).await;
            });
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_generate_stalled_error_body_is_timeout() {
    let base_url = stalling_backend("HTTP/1.1 500 Internal Server Error").await;
    let cfg = BackendConfig {
        generation_timeout_ms: 300,
        ..BackendConfig::new(base_url, MODEL)
    };
    let err = InferenceClient::new(cfg)
        .generate(&GenerationRequest::new("x"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, GenerationError::Timeout { duration_ms: 300 }),
        "expected Timeout, got {err:?}"
    );
}

#[tokio::test]
async fn test_generate_stalled_success_body_is_timeout() {
    let base_url = stalling_backend("HTTP/1.1 200 OK").await;
    let cfg = BackendConfig {
        generation_timeout_ms: 300,
        ..BackendConfig::new(base_url, MODEL)
    };
    let err = InferenceClient::new(cfg)
        .generate(&GenerationRequest::new("x"))
        .await
        .unwrap_err();

    assert!(err.is_timeout(), "expected Timeout, got {err:?}");
}

#[tokio::test]
async fn test_generate_non_success_is_backend_rejected() {
    let body = r#"{"error":"model 'qwen3:0.6b' not found, try pulling it first"}"#;
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(404).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .generate(&GenerationRequest::new("x"))
        .await
        .unwrap_err();

    match err {
        GenerationError::BackendRejected { status, body: got } => {
            assert_eq!(status, 404);
            assert_eq!(got, body);
        }
        other => panic!("expected BackendRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_generate_server_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .generate(&GenerationRequest::new("x"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
    // `expect(1)` is verified when the server drops.
}

#[tokio::test]
async fn test_generate_unreachable_is_transport_failure() {
    let client = InferenceClient::new(BackendConfig::new(unreachable_base_url(), MODEL));
    let err = client
        .generate(&GenerationRequest::new("x"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, GenerationError::TransportFailure { .. }),
        "expected TransportFailure, got {err:?}"
    );
}

#[tokio::test]
async fn test_generate_malformed_success_body_is_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{truncated"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .generate(&GenerationRequest::new("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::TransportFailure { .. }));
}

#[tokio::test]
async fn test_repeated_generate_is_not_cached_or_altered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "4"})))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let request = GenerationRequest::new("2+2=").max_tokens(10).temperature(0.0);
    let first = client.generate(&request).await.unwrap();
    let second = client.generate(&request).await.unwrap();
    assert_eq!(first, second);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].body, requests[1].body);
}

#[tokio::test]
async fn test_concurrent_generate_calls_share_one_client() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "ok"})))
        .expect(8)
        .mount(&server)
        .await;

    let client = Arc::new(client_for(&server));
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                client
                    .generate(&GenerationRequest::new(format!("prompt {i}")))
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().text, "ok");
    }
}

// ─── get_model_info ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_model_info_passes_metadata_through() {
    let metadata = json!({
        "modelfile": "FROM qwen3:0.6b",
        "parameters": "temperature 0.6",
        "details": {"family": "qwen3", "parameter_size": "751.63M"},
        "model_info": {"general.architecture": "qwen3"}
    });
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/show"))
        .and(body_json(json!({ "name": MODEL })))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata.clone()))
        .mount(&server)
        .await;

    let info = client_for(&server).get_model_info().await;
    assert_eq!(info, ModelInfo::Metadata(metadata));
}

#[tokio::test]
async fn test_model_info_error_status_is_error_value() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/show"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let info = client_for(&server).get_model_info().await;
    match info {
        ModelInfo::Unavailable { error } => assert!(error.contains("404"), "{error}"),
        other => panic!("expected Unavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_model_info_unreachable_is_error_value() {
    let client = InferenceClient::new(BackendConfig::new(unreachable_base_url(), MODEL));
    let info = client.get_model_info().await;
    assert!(!info.is_available());
    let json = serde_json::to_value(&info).unwrap();
    assert!(json["error"].is_string());
}
