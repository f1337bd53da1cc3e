//! Document segmentation
//!
//! Turns cleaned document text into ordered chunks. Two strategies share
//! the [`Segmenter`] trait and are selected by configuration:
//! - Sentences: greedy sentence accumulation under a character budget, with
//!   bounded backward overlap
//! - Articles: one chunk per structural marker ("Article 12" up to the next one)

pub mod articles;
pub mod corpus;
pub mod preprocess;
pub mod sentences;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ChunkingConfig;
use crate::errors::Result;

pub use articles::{ArticleSegmenter, DEFAULT_ARTICLE_PATTERN};
pub use corpus::{read_corpus, segment_document, source_name, write_corpus, CorpusRecord};
pub use preprocess::clean_text;
pub use sentences::{chunk_sentences, split_sentences, SentenceSegmenter};

/// One chunk produced by a segmenter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    /// Structural label, only set by the article strategy
    pub article: Option<String>,
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            article: None,
        }
    }
}

/// Text → ordered chunk sequence
pub trait Segmenter: Send + Sync {
    /// Strategy name, recorded in the build manifest
    fn name(&self) -> &str;

    /// Split cleaned text. Empty input yields no segments.
    fn segment(&self, text: &str) -> Vec<Segment>;
}

/// Which segmentation strategy to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SegmenterKind {
    Sentences,
    Articles,
}

impl fmt::Display for SegmenterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmenterKind::Sentences => write!(f, "sentences"),
            SegmenterKind::Articles => write!(f, "articles"),
        }
    }
}

/// Build the segmenter selected in the configuration
pub fn build_segmenter(config: &ChunkingConfig) -> Result<Box<dyn Segmenter>> {
    match config.strategy {
        SegmenterKind::Sentences => Ok(Box::new(SentenceSegmenter::new(
            config.max_chars,
            config.overlap_sentences,
        ))),
        SegmenterKind::Articles => Ok(Box::new(ArticleSegmenter::with_pattern(
            &config.article_pattern,
        )?)),
    }
}
