#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{AnswerGenerator, ApiKey};
use crate::config::LlmConfig;
use crate::{RagError, Result};

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
///
/// Requests are never retried: a failed call fails the current chat turn.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    endpoint: Url,
    model: String,
    temperature: f32,
    timeout: Duration,
    api_key: ApiKey,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiClient {
    #[inline]
    pub fn new(config: &LlmConfig, api_key: ApiKey) -> Result<Self> {
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| RagError::Config(format!("Invalid LLM endpoint {endpoint}: {e}")))?;
        let timeout = Duration::from_secs(config.timeout_secs);

        Ok(Self {
            endpoint,
            model: config.model.clone(),
            temperature: config.temperature,
            timeout,
            api_key,
            agent: Self::build_agent(timeout),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.agent = Self::build_agent(timeout);
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_agent(timeout: Duration) -> ureq::Agent {
        ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into()
    }

    fn classify(&self, error: ureq::Error) -> RagError {
        match error {
            ureq::Error::StatusCode(status @ (401 | 403)) => RagError::Authentication(format!(
                "the language model rejected the API key (HTTP {status})"
            )),
            ureq::Error::StatusCode(429) => {
                RagError::Upstream("rate limited by the language model (HTTP 429)".to_string())
            }
            ureq::Error::StatusCode(status) => {
                RagError::Upstream(format!("language model returned HTTP {status}"))
            }
            ureq::Error::Timeout(_) => RagError::Upstream(format!(
                "no response from the language model within {}s",
                self.timeout.as_secs()
            )),
            other => RagError::Upstream(format!("request to the language model failed: {other}")),
        }
    }
}

impl AnswerGenerator for OpenAiClient {
    fn generate(&self, prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| RagError::Upstream(format!("Failed to serialize request: {e}")))?;

        debug!(
            "Requesting completion from {} (model {}, prompt length {})",
            self.endpoint,
            self.model,
            prompt.len()
        );

        let response_text = self
            .agent
            .post(self.endpoint.as_str())
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| {
                let error = self.classify(e);
                warn!("Completion request failed: {}", error);
                error
            })?;

        let response: ChatCompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Upstream(format!("malformed completion response: {e}")))?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                RagError::Upstream("completion response contained no answer".to_string())
            })?;

        debug!("Received answer of {} characters", answer.len());
        Ok(answer.trim().to_string())
    }
}
