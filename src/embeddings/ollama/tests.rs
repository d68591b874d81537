use super::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> OllamaConfig {
    let url = Url::parse(&server.uri()).expect("mock server uri is a url");
    OllamaConfig {
        host: url.host_str().expect("mock server has a host").to_string(),
        port: url.port().expect("mock server has a port"),
        embedding_dimension: 64,
        batch_size: 2,
        retry_attempts: 2,
        ..OllamaConfig::default()
    }
}

fn vector(seed: f32) -> Vec<f32> {
    (0..64).map(|i| seed + i as f32).collect()
}

#[test]
fn client_configuration() {
    let config = OllamaConfig {
        protocol: "http".to_string(),
        host: "test-host".to_string(),
        port: 1234,
        embedding_model: "test-model".to_string(),
        batch_size: 128,
        embedding_dimension: 768,
        retry_attempts: 4,
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    assert_eq!(client.model(), "test-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, 4);
    assert_eq!(client.dimension(), Some(768));
}

#[test]
fn client_builder_methods() {
    let client = OllamaClient::new(&OllamaConfig::default())
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(0)
        .with_any_dimension();

    assert_eq!(client.retry_attempts, 1);
    assert_eq!(client.dimension(), None);
}

#[test]
fn model_name_matching() {
    let client = OllamaClient::new(&OllamaConfig::default()).expect("Failed to create client");
    assert!(client.is_configured_model("all-minilm"));
    assert!(client.is_configured_model("all-minilm:latest"));
    assert!(!client.is_configured_model("all-minilm:l6-v2"));
    assert!(!client.is_configured_model("nomic-embed-text:latest"));
}

#[tokio::test]
async fn embeds_in_batches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"input": ["a", "b"]})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"embeddings": [vector(0.0), vector(1.0)]})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"input": ["c"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [vector(2.0)]})))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("Failed to create client");
    let embeddings = tokio::task::spawn_blocking(move || {
        client.embed(&["a".to_string(), "b".to_string(), "c".to_string()])
    })
    .await
    .expect("blocking task should finish")
    .expect("embedding should succeed");

    assert_eq!(embeddings, vec![vector(0.0), vector(1.0), vector(2.0)]);
}

#[tokio::test]
async fn rejects_unexpected_dimension() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[0.1, 0.2]]})))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("Failed to create client");
    let result = tokio::task::spawn_blocking(move || client.embed_query("penalty"))
        .await
        .expect("blocking task should finish");

    assert!(matches!(
        result,
        Err(EmbeddingError::DimensionMismatch {
            expected: 64,
            actual: 2
        })
    ));
}

#[tokio::test]
async fn rejects_count_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [vector(0.0)]})))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("Failed to create client");
    let result = tokio::task::spawn_blocking(move || {
        client.embed(&["a".to_string(), "b".to_string()])
    })
    .await
    .expect("blocking task should finish");

    assert!(matches!(
        result,
        Err(EmbeddingError::CountMismatch {
            expected: 2,
            actual: 1
        })
    ));
}

#[tokio::test]
async fn query_embedding_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("Failed to create client");
    let result = tokio::task::spawn_blocking(move || client.embed_query("penalty"))
        .await
        .expect("blocking task should finish");

    assert!(matches!(result, Err(EmbeddingError::Unavailable(_))));
}

#[tokio::test]
async fn corpus_embedding_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("Failed to create client");
    let result = tokio::task::spawn_blocking(move || client.embed(&["a".to_string()]))
        .await
        .expect("blocking task should finish");

    assert!(matches!(result, Err(EmbeddingError::Unavailable(_))));
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("Failed to create client");
    let result = tokio::task::spawn_blocking(move || client.embed(&["a".to_string()]))
        .await
        .expect("blocking task should finish");

    assert!(matches!(result, Err(EmbeddingError::Rejected(_))));
}

#[tokio::test]
async fn health_check_requires_model() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "all-minilm:latest", "size": 45_000_000}]
        })))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let client = OllamaClient::new(&config).expect("Failed to create client");
    let healthy = tokio::task::spawn_blocking(move || client.health_check())
        .await
        .expect("blocking task should finish");
    assert!(healthy.is_ok());

    let other = OllamaConfig {
        embedding_model: "nomic-embed-text".to_string(),
        ..config
    };
    let client = OllamaClient::new(&other).expect("Failed to create client");
    let unhealthy = tokio::task::spawn_blocking(move || client.health_check())
        .await
        .expect("blocking task should finish");
    assert!(matches!(unhealthy, Err(EmbeddingError::Unavailable(_))));
}

#[test]
fn empty_input_makes_no_request() {
    let config = OllamaConfig {
        host: "unreachable.invalid".to_string(),
        ..OllamaConfig::default()
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");
    let embeddings = client.embed(&[]).expect("empty input is a no-op");
    assert!(embeddings.is_empty());
}
