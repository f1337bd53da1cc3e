//! Grounded answer generation
//!
//! The language model is an external collaborator reached over HTTP. Two
//! providers are supported: OpenAI-compatible chat completions and a local
//! Ollama server. Both sit behind the [`Generator`] trait and are wrapped in
//! a [`RetryPolicy`] for transient failures.

pub mod ollama;
pub mod openai;
pub mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::errors::GenerationError;

pub use ollama::OllamaGenerator;
pub use openai::OpenAiGenerator;
pub use retry::RetryPolicy;

/// System message for grounded answers
pub const SYSTEM_PROMPT: &str = "You are a legal assistant. Answer ONLY from the extracts provided. \
If the extracts do not contain the answer, reply: \
'I cannot answer this question because it is not covered by my legal knowledge base.' \
Always cite your sources.";

/// Instruction placed before the packed context
pub const INSTRUCTION_PROMPT: &str =
    "Use only the following extracts. Do not introduce any outside information.";

/// Which service generates answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationProvider {
    #[serde(rename = "openai")]
    OpenAi,
    Ollama,
}

impl fmt::Display for GenerationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationProvider::OpenAi => write!(f, "openai"),
            GenerationProvider::Ollama => write!(f, "ollama"),
        }
    }
}

/// Chat role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Provider-independent generation request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl GenerationRequest {
    /// System prompt, then the instruction with the context, then the question
    pub fn grounded(question: &str, context: &str, temperature: f32, max_tokens: usize) -> Self {
        Self {
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(format!("{}\n\nContext:\n{}", INSTRUCTION_PROMPT, context)),
                ChatMessage::user(format!("Question: {}", question)),
            ],
            temperature,
            max_tokens,
        }
    }
}

/// Text generation capability
#[async_trait]
pub trait Generator: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Produce a trimmed, non-empty completion
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Generator handle shared across requests
pub type SharedGenerator = Arc<dyn Generator>;

/// Retries transient failures of an inner generator
pub struct RetryingGenerator<G> {
    inner: G,
    policy: RetryPolicy,
}

impl<G: Generator> RetryingGenerator<G> {
    pub fn new(inner: G, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<G: Generator> Generator for RetryingGenerator<G> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.policy.run(|| self.inner.generate(request)).await
    }
}

/// Build the configured provider wrapped in its retry policy
pub fn build_generator(
    config: &GenerationConfig,
    api_key: Option<String>,
) -> Result<SharedGenerator, GenerationError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let policy = RetryPolicy::new(config.max_retries);

    match config.provider {
        GenerationProvider::OpenAi => {
            let api_key = api_key.ok_or_else(|| {
                GenerationError::Misconfigured(format!(
                    "environment variable {} is not set",
                    config.api_key_env
                ))
            })?;
            let provider = OpenAiGenerator::new(&config.base_url, &config.model, &api_key, timeout)?;
            Ok(Arc::new(RetryingGenerator::new(provider, policy)))
        }
        GenerationProvider::Ollama => {
            let provider = OllamaGenerator::new(&config.base_url, &config.model, timeout)?;
            Ok(Arc::new(RetryingGenerator::new(provider, policy)))
        }
    }
}

/// Map a transport error, keeping timeouts distinct
pub(crate) fn transport_error(error: reqwest::Error, timeout: Duration) -> GenerationError {
    if error.is_timeout() {
        GenerationError::Timeout {
            duration_ms: timeout.as_millis() as u64,
        }
    } else {
        GenerationError::Http(error)
    }
}

/// Turn a non-success response into a status error
pub(crate) async fn status_error(response: reqwest::Response) -> GenerationError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    GenerationError::Status { status, body }
}
