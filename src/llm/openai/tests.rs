use super::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OpenAiClient {
    let config = LlmConfig {
        base_url: format!("{}/v1/", server.uri()),
        model: "gpt-4o".to_string(),
        ..LlmConfig::default()
    };
    OpenAiClient::new(&config, ApiKey("sk-test".to_string())).expect("client should build")
}

async fn generate(client: OpenAiClient, prompt: &'static str) -> Result<String> {
    tokio::task::spawn_blocking(move || client.generate(prompt))
        .await
        .expect("task should join")
}

#[test]
fn endpoint_is_derived_from_base_url() {
    let client = OpenAiClient::new(&LlmConfig::default(), ApiKey("k".to_string()))
        .expect("client should build");
    assert_eq!(
        client.endpoint.as_str(),
        "https://api.openai.com/v1/chat/completions"
    );
    assert_eq!(client.model(), "gpt-4o");
    assert_eq!(client.timeout, Duration::from_secs(60));
}

#[tokio::test]
async fn answer_is_trimmed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "messages": [{ "role": "user", "content": "prompt text" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": "\n  Feed on demand.  \n" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let answer = generate(client_for(&server), "prompt text")
        .await
        .expect("generation should succeed");
    assert_eq!(answer, "Feed on demand.");
}

#[tokio::test]
async fn rejected_key_is_an_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = generate(client_for(&server), "prompt").await;
    assert!(matches!(result, Err(RagError::Authentication(_))));
}

#[tokio::test]
async fn rate_limit_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let result = generate(client_for(&server), "prompt").await;
    assert!(matches!(result, Err(RagError::Upstream(_))));
}

#[tokio::test]
async fn server_error_is_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let result = generate(client_for(&server), "prompt").await;
    assert!(matches!(result, Err(RagError::Upstream(_))));
}

#[tokio::test]
async fn malformed_response_is_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let result = generate(client_for(&server), "prompt").await;
    assert!(matches!(result, Err(RagError::Upstream(_))));
}

#[tokio::test]
async fn empty_choices_is_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let result = generate(client_for(&server), "prompt").await;
    assert!(matches!(result, Err(RagError::Upstream(_))));
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(3))
                .set_body_json(json!({ "choices": [] })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).with_timeout(Duration::from_millis(200));
    let result = generate(client, "prompt").await;
    assert!(matches!(result, Err(RagError::Upstream(_))));
}
