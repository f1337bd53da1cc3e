//! Ollama chat provider (non-streaming)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{status_error, transport_error, ChatMessage, GenerationRequest, Generator};
use crate::errors::GenerationError;

pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaGenerator {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, GenerationError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = OllamaChatRequest {
            model: &self.model,
            messages: &request.messages,
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        debug!(url = %url, model = %self.model, "Calling Ollama chat");
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let content = parsed.message.content.trim().to_string();
        if content.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(content)
    }
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_is_not_streaming() {
        let request = GenerationRequest::grounded("q", "ctx", 0.0, 64);
        let body = OllamaChatRequest {
            model: "qwen2.5:7b-instruct",
            messages: &request.messages,
            stream: false,
            options: OllamaOptions {
                temperature: 0.0,
                num_predict: 64,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 64);
        assert_eq!(json["messages"][2]["content"], "Question: q");
    }

    #[test]
    fn test_response_parsing() {
        let parsed: OllamaChatResponse = serde_json::from_str(
            r#"{"model":"m","message":{"role":"assistant","content":"Eight hours."},"done":true}"#,
        )
        .unwrap();
        assert_eq!(parsed.message.content, "Eight hours.");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transient() {
        let generator =
            OllamaGenerator::new("http://127.0.0.1:9", "m", Duration::from_millis(200)).unwrap();
        let request = GenerationRequest::grounded("q", "c", 0.0, 8);
        let err = generator.generate(&request).await.unwrap_err();
        assert!(err.is_transient());
    }
}
