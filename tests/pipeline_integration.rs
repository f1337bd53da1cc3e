//! End-to-end tests: raw documents → build → retrieval → answers
//!
//! Uses the deterministic hash embedder and a stub generator, so no model
//! download or network access is needed.

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lexsearch::build::IndexBuilder;
use lexsearch::config::Config;
use lexsearch::embedding::{EmbeddingBackend, HashEmbedder};
use lexsearch::generation::{GenerationRequest, Generator};
use lexsearch::index::{ArtifactPaths, ChunkRecord, IndexArtifact, MetadataStore};
use lexsearch::rag::{AnswerOutcome, AnswerPipeline, REFUSAL_MESSAGE};
use lexsearch::retrieval::Retriever;
use lexsearch::{GenerationError, LexError};

const DIMENSION: usize = 384;

/// Answers with the packed context it was given
struct ContextEcho {
    calls: AtomicUsize,
}

impl ContextEcho {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Generator for ContextEcho {
    fn name(&self) -> &str {
        "context-echo"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(request.messages[1].content.clone())
    }
}

struct Unreachable;

#[async_trait]
impl Generator for Unreachable {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
        Err(GenerationError::Timeout { duration_ms: 60_000 })
    }
}

fn config_in(dir: &Path) -> Config {
    let mut config = Config::default();
    config.paths.data_dir = dir.to_string_lossy().to_string();
    config.embedding.backend = EmbeddingBackend::Hash;
    config.embedding.hash_dimension = DIMENSION;
    config.retrieval.distance_threshold = 1.5;
    config
}

fn write_corpus(dir: &Path) {
    let raw = dir.join("raw_txt");
    std::fs::create_dir_all(&raw).unwrap();
    std::fs::write(
        raw.join("code_travail.txt"),
        "Article 1: Working hours are 8 hours per day.",
    )
    .unwrap();
    std::fs::write(
        raw.join("code_famille.txt"),
        "Marriage registration requires two witnesses.",
    )
    .unwrap();
}

fn build(dir: &Path) -> Config {
    write_corpus(dir);
    let config = config_in(dir);
    IndexBuilder::new(config.clone())
        .run(&HashEmbedder::new(DIMENSION))
        .unwrap();
    config
}

fn retriever(config: &Config) -> Retriever {
    let artifact = IndexArtifact::load(&ArtifactPaths::in_dir(&config.chunks_dir())).unwrap();
    Retriever::new(Arc::new(HashEmbedder::new(DIMENSION)), Arc::new(artifact)).unwrap()
}

#[tokio::test]
async fn test_working_hours_question_is_grounded() {
    let dir = tempfile::tempdir().unwrap();
    let config = build(dir.path());
    let generator = ContextEcho::new();
    let pipeline = AnswerPipeline::new(retriever(&config), generator.clone(), &config);

    let trace = pipeline
        .answer_with_trace("What are the legal working hours?")
        .await
        .unwrap();

    let top = &trace.retained[0];
    assert_eq!(top.source, "code_travail");
    assert!(top.distance < config.retrieval.distance_threshold);
    assert!(trace.answer.context_found);
    assert!(trace.answer.answer.contains("8 hours"));
    assert_eq!(trace.answer.outcome, AnswerOutcome::Generated);
    assert_eq!(trace.answer.count_chunks, trace.retained.len());
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_out_of_domain_question_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let config = build(dir.path());
    let pipeline = AnswerPipeline::new(retriever(&config), ContextEcho::new(), &config);

    let trace = pipeline
        .answer_with_trace("What is the capital of France?")
        .await
        .unwrap();

    assert!(trace.answer.context_found);
    assert_eq!(trace.answer.count_chunks, 2);
    assert!(trace
        .retained
        .iter()
        .all(|r| r.distance >= config.retrieval.distance_threshold));
}

#[test]
fn test_empty_question_refuses_without_generation() {
    let dir = tempfile::tempdir().unwrap();
    let config = build(dir.path());
    let generator = ContextEcho::new();
    let pipeline = AnswerPipeline::new(retriever(&config), generator.clone(), &config);

    let answer = tokio_test::block_on(pipeline.answer("")).unwrap();

    assert_eq!(answer.answer, REFUSAL_MESSAGE);
    assert!(!answer.context_found);
    assert!(answer.sources.is_empty());
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_generation_outage_is_distinguishable() {
    let dir = tempfile::tempdir().unwrap();
    let config = build(dir.path());
    let pipeline = AnswerPipeline::new(retriever(&config), Arc::new(Unreachable), &config);

    let answer = pipeline.answer("working hours").await.unwrap();

    assert!(answer.context_found);
    assert_ne!(answer.answer, REFUSAL_MESSAGE);
    assert!(answer.answer.starts_with("[generation unavailable]"));
    assert!(matches!(answer.outcome, AnswerOutcome::GenerationFailed { .. }));
}

#[test]
fn test_rebuild_is_bit_identical() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let config_a = build(first.path());
    let config_b = build(second.path());

    let paths_a = ArtifactPaths::in_dir(&config_a.chunks_dir());
    let paths_b = ArtifactPaths::in_dir(&config_b.chunks_dir());
    assert_eq!(
        std::fs::read(&paths_a.index).unwrap(),
        std::fs::read(&paths_b.index).unwrap()
    );

    let query = "working hours per day";
    let hits_a = retriever(&config_a).retrieve(query, 5).unwrap();
    let hits_b = retriever(&config_b).retrieve(query, 5).unwrap();
    assert_eq!(hits_a.len(), hits_b.len());
    for (a, b) in hits_a.iter().zip(&hits_b) {
        assert_eq!(a.chunk_id, b.chunk_id);
        assert_eq!(a.distance.to_bits(), b.distance.to_bits());
    }
}

#[test]
fn test_metadata_positions_follow_corpus_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = build(dir.path());
    let paths = ArtifactPaths::in_dir(&config.chunks_dir());

    let corpus = lexsearch::chunking::read_corpus(&paths.corpus).unwrap();
    let artifact = IndexArtifact::load(&paths).unwrap();

    assert_eq!(artifact.len(), corpus.len());
    for (position, record) in corpus.iter().enumerate() {
        assert_eq!(artifact.metadata().get(position).unwrap().chunk_id, record.chunk_id);
    }
}

#[test]
fn test_truncated_metadata_is_rejected_at_load() {
    let dir = tempfile::tempdir().unwrap();
    let config = build(dir.path());
    let paths = ArtifactPaths::in_dir(&config.chunks_dir());

    let store = MetadataStore::load(&paths.metadata).unwrap();
    let shorter: Vec<ChunkRecord> = store.iter().skip(1).cloned().collect();
    MetadataStore::from_records(shorter).persist(&paths.metadata).unwrap();

    let err = IndexArtifact::load(&paths).unwrap_err();
    assert!(matches!(err, LexError::IndexMisaligned { .. }));
}

#[test]
fn test_missing_artifacts_are_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths::in_dir(dir.path());
    assert!(matches!(
        IndexArtifact::load(&paths),
        Err(LexError::ArtifactMissing(_))
    ));
}

#[test]
fn test_embedder_must_match_index() {
    let dir = tempfile::tempdir().unwrap();
    let config = build(dir.path());
    let artifact = IndexArtifact::load(&ArtifactPaths::in_dir(&config.chunks_dir())).unwrap();

    let result = Retriever::new(Arc::new(HashEmbedder::new(DIMENSION / 2)), Arc::new(artifact));
    assert!(result.is_err());
}

#[test]
fn test_article_strategy_labels_sources() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw_txt");
    std::fs::create_dir_all(&raw).unwrap();
    std::fs::write(
        raw.join("code_travail.txt"),
        "Preamble. Article 1 Working hours are 8 hours per day. Article 2 Overtime is paid at 125 percent.",
    )
    .unwrap();

    let mut config = config_in(dir.path());
    config.chunking.strategy = lexsearch::chunking::SegmenterKind::Articles;
    IndexBuilder::new(config.clone())
        .run(&HashEmbedder::new(DIMENSION))
        .unwrap();

    let results = retriever(&config).retrieve("overtime paid", 2).unwrap();
    assert_eq!(results[0].article.as_deref(), Some("2"));
    assert_eq!(results[0].chunk_id, "code_travail_clean_1");
}
