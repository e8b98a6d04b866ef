use super::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, batch_size: u32) -> OllamaClient {
    let address = server.address();
    let config = OllamaConfig {
        host: address.ip().to_string(),
        port: address.port(),
        model: "all-minilm:latest".to_string(),
        batch_size,
        ..OllamaConfig::default()
    };
    OllamaClient::new(&config)
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(5))
        .with_backoff_unit(Duration::from_millis(1))
}

#[test]
fn client_configuration() {
    let config = OllamaConfig {
        protocol: "http".to_string(),
        host: "test-host".to_string(),
        port: 1234,
        model: "test-model".to_string(),
        batch_size: 128,
        embedding_dimension: 384,
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    assert_eq!(client.model, "test-model");
    assert_eq!(client.model_id(), "test-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
}

#[test]
fn client_builder_methods() {
    let client = OllamaClient::new(&OllamaConfig::default())
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5);
    assert_eq!(client.retry_attempts, 5);

    let client = client.with_retry_attempts(0);
    assert_eq!(client.retry_attempts, 1);
}

#[tokio::test]
async fn single_embedding_uses_embed_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({
            "model": "all-minilm:latest",
            "input": ["how often should I feed my baby"]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [[0.1, 0.2, 0.3]] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 16);
    let vector = tokio::task::spawn_blocking(move || client.embed("how often should I feed my baby"))
        .await
        .expect("task should join")
        .expect("embedding should succeed");

    assert_eq!(vector, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn batch_embeddings_are_split_by_batch_size() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({ "input": ["a", "b"] })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "embeddings": [[1.0, 0.0], [0.0, 1.0]] })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({ "input": ["c"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [[0.5, 0.5]] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 2);
    let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let vectors = tokio::task::spawn_blocking(move || client.embed_batch(&texts))
        .await
        .expect("task should join")
        .expect("batch embedding should succeed");

    assert_eq!(
        vectors,
        vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]]
    );
}

#[tokio::test]
async fn count_mismatch_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [[1.0]] })))
        .mount(&server)
        .await;

    let client = client_for(&server, 16);
    let texts = vec!["a".to_string(), "b".to_string()];
    let result = tokio::task::spawn_blocking(move || client.embed_batch(&texts))
        .await
        .expect("task should join");

    assert!(matches!(result, Err(RagError::Embedding(_))));
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [[0.7]] })))
        .mount(&server)
        .await;

    let client = client_for(&server, 16);
    let vector = tokio::task::spawn_blocking(move || client.embed("retry me"))
        .await
        .expect("task should join")
        .expect("second attempt should succeed");

    assert_eq!(vector, vec![0.7]);
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

    let client = client_for(&server, 16);
    let result = tokio::task::spawn_blocking(move || client.embed("missing model"))
        .await
        .expect("task should join");

    assert!(result.is_err());
}

#[tokio::test]
async fn health_check_validates_model() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{ "name": "all-minilm:latest", "size": 45960996 }]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, 16);
    let other = client.clone();
    let healthy = tokio::task::spawn_blocking(move || client.health_check())
        .await
        .expect("task should join");
    assert!(healthy.is_ok(), "health check failed: {healthy:?}");

    let other = OllamaClient {
        model: "nomic-embed-text:latest".to_string(),
        ..other
    };
    let unhealthy = tokio::task::spawn_blocking(move || other.health_check())
        .await
        .expect("task should join");
    assert!(unhealthy.is_err());
}
