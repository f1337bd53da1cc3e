use serde::{Deserialize, Serialize};

use crate::retrieval::{collect_articles, split_articles, SearchResult};

/// Fixed answer when no chunk survives retrieval
pub const REFUSAL_MESSAGE: &str =
    "I cannot answer this question because it is not covered by my legal knowledge base.";

/// Prefix of the `answer` field when generation failed
pub const GENERATION_FAILURE_MARKER: &str = "[generation unavailable]";

/// How the answer text was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// Generated from retrieved context
    Generated,
    /// Nothing retrieved; fixed refusal, no generation call
    Refused,
    /// Context was found but the generation service failed
    GenerationFailed { reason: String },
}

/// Citation for one retained chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub source: String,
    pub articles: Vec<String>,
}

impl From<&SearchResult> for SourceRef {
    fn from(result: &SearchResult) -> Self {
        Self {
            source: result.source.clone(),
            articles: result
                .article
                .as_deref()
                .map(split_articles)
                .unwrap_or_default(),
        }
    }
}

/// Response to a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub context_found: bool,
    /// One entry per retained chunk, in ranked order
    pub sources: Vec<SourceRef>,
    /// Distinct article labels across retained chunks, sorted
    pub articles: Vec<String>,
    pub count_chunks: usize,
    pub outcome: AnswerOutcome,
}

impl Answer {
    pub fn refused() -> Self {
        Self {
            answer: REFUSAL_MESSAGE.to_string(),
            context_found: false,
            sources: Vec::new(),
            articles: Vec::new(),
            count_chunks: 0,
            outcome: AnswerOutcome::Refused,
        }
    }

    /// Answer grounded on `retained`, carrying either the generated text
    /// or a marked failure message
    pub fn grounded(retained: &[SearchResult], generated: Result<String, String>) -> Self {
        let (answer, outcome) = match generated {
            Ok(text) => (text, AnswerOutcome::Generated),
            Err(reason) => (
                format!("{} {}", GENERATION_FAILURE_MARKER, reason),
                AnswerOutcome::GenerationFailed { reason },
            ),
        };

        Self {
            answer,
            context_found: true,
            sources: retained.iter().map(SourceRef::from).collect(),
            articles: collect_articles(retained),
            count_chunks: retained.len(),
            outcome,
        }
    }

    pub fn is_refusal(&self) -> bool {
        self.outcome == AnswerOutcome::Refused
    }
}
