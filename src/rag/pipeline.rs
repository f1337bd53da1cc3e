// End-to-end answer pipeline
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::Answer;
use crate::config::Config;
use crate::errors::{LexError, Result};
use crate::generation::{GenerationRequest, SharedGenerator};
use crate::retrieval::{
    filter_relevant, AssembledContext, ContextBuilder, Retriever, SearchParams, SearchResult,
};

/// Answer plus the intermediate retrieval state, for interactive display
#[derive(Debug, Clone)]
pub struct AnswerTrace {
    pub answer: Answer,
    /// Chunks kept after relevance filtering
    pub retained: Vec<SearchResult>,
    pub context: Option<AssembledContext>,
}

/// retrieve -> filter -> pack -> generate
#[derive(Clone)]
pub struct AnswerPipeline {
    retriever: Retriever,
    generator: SharedGenerator,
    params: SearchParams,
    context_builder: ContextBuilder,
    temperature: f32,
    max_tokens: usize,
}

impl AnswerPipeline {
    /// Create a pipeline with retrieval and generation knobs from `config`
    pub fn new(retriever: Retriever, generator: SharedGenerator, config: &Config) -> Self {
        Self {
            retriever,
            generator,
            params: SearchParams {
                top_k: config.retrieval.top_k,
                threshold: config.retrieval.distance_threshold,
                fallback_count: config.retrieval.fallback_count,
            },
            context_builder: ContextBuilder::new(
                config.retrieval.max_context_chars,
                config.retrieval.packing,
            ),
            temperature: config.generation.temperature,
            max_tokens: config.generation.max_tokens,
        }
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Retrieved and filtered chunks for `question`, without generation.
    ///
    /// Fails with [`LexError::NoRelevantContext`] when nothing is retained.
    pub async fn retrieve_relevant(&self, question: &str) -> Result<Vec<SearchResult>> {
        let retriever = self.retriever.clone();
        let query = question.to_string();
        let top_k = self.params.top_k;

        // Embedding is CPU-bound
        let results = tokio::task::spawn_blocking(move || retriever.retrieve(&query, top_k))
            .await
            .map_err(|e| LexError::Internal(format!("retrieval task failed: {}", e)))??;

        let retained = filter_relevant(results, self.params.threshold, self.params.fallback_count);
        if retained.is_empty() {
            return Err(LexError::NoRelevantContext);
        }
        Ok(retained)
    }

    /// Answer `question`.
    ///
    /// Embedding failures are errors. Generation failures are not: they
    /// yield a marked answer with `context_found = true`.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        Ok(self.answer_with_trace(question).await?.answer)
    }

    pub async fn answer_with_trace(&self, question: &str) -> Result<AnswerTrace> {
        let question = question.trim();
        if question.is_empty() {
            debug!("Empty question, refusing");
            return Ok(refused());
        }

        let retained = match self.retrieve_relevant(question).await {
            Ok(retained) => retained,
            Err(LexError::NoRelevantContext) => {
                info!("No chunk retrieved, refusing");
                return Ok(refused());
            }
            Err(e) => return Err(e),
        };

        let context = self.context_builder.build(&retained);
        debug!(
            chunks = retained.len(),
            blocks = context.block_count,
            chars = context.text.chars().count(),
            "Context packed"
        );

        let request =
            GenerationRequest::grounded(question, &context.text, self.temperature, self.max_tokens);
        let generated = match self.generator.generate(&request).await {
            Ok(text) => Ok(text),
            Err(e) => {
                warn!(provider = self.generator.name(), error = %e, "Generation failed");
                Err(e.to_string())
            }
        };

        Ok(AnswerTrace {
            answer: Answer::grounded(&retained, generated),
            retained,
            context: Some(context),
        })
    }
}

fn refused() -> AnswerTrace {
    AnswerTrace {
        answer: Answer::refused(),
        retained: Vec::new(),
        context: None,
    }
}

/// Shared pipeline handle for request handlers
pub type SharedPipeline = Arc<AnswerPipeline>;
