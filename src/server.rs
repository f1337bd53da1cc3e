//! HTTP endpoint for the answer pipeline
//!
//! - `GET /ask?question=…` → [`Answer`] JSON
//! - `GET /health` → index status

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::{error, info};

use crate::errors::LexError;
use crate::rag::{Answer, SharedPipeline};

#[derive(Debug, Deserialize)]
pub struct AskParams {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub vectors: usize,
    pub dimension: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

pub fn router(pipeline: SharedPipeline) -> Router {
    Router::new()
        .route("/ask", get(ask_handler))
        .route("/health", get(health_handler))
        .with_state(pipeline)
}

/// Bind `bind` and serve until the process is stopped
pub async fn serve(pipeline: SharedPipeline, bind: &str) -> Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address {}", bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!(%addr, "Listening");
    axum::serve(listener, router(pipeline))
        .await
        .context("server shutdown")?;
    Ok(())
}

pub async fn ask_handler(
    State(pipeline): State<SharedPipeline>,
    Query(params): Query<AskParams>,
) -> Result<Json<Answer>, (StatusCode, Json<ErrorBody>)> {
    pipeline
        .answer(&params.question)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn health_handler(State(pipeline): State<SharedPipeline>) -> Json<HealthBody> {
    let artifact = pipeline.retriever().artifact();
    Json(HealthBody {
        status: "ok",
        vectors: artifact.len(),
        dimension: artifact.index().dimension(),
    })
}

fn error_response(err: LexError) -> (StatusCode, Json<ErrorBody>) {
    error!(error = %err, "Answer failed");
    let status = match err {
        LexError::EmbeddingUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorBody {
            message: err.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::embedding::{Embedder, HashEmbedder};
    use crate::errors::GenerationError;
    use crate::generation::{GenerationRequest, Generator};
    use crate::index::{ChunkRecord, FlatIndex, IndexArtifact, MetadataStore};
    use crate::rag::{AnswerPipeline, REFUSAL_MESSAGE};
    use crate::retrieval::Retriever;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedGenerator;

    #[async_trait]
    impl Generator for FixedGenerator {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
            Ok("Working hours are 8 hours per day.".to_string())
        }
    }

    fn pipeline() -> SharedPipeline {
        let embedder = HashEmbedder::new(32);
        let text = "Working hours are 8 hours per day.";
        let vectors = embedder.embed_batch(&[text]).unwrap();
        let artifact = IndexArtifact::from_parts(
            FlatIndex::build(32, &vectors).unwrap(),
            MetadataStore::from_records(vec![ChunkRecord {
                chunk_id: "code_travail_clean_0".to_string(),
                source: "code_travail".to_string(),
                article: Some("184".to_string()),
                text: text.to_string(),
            }]),
        )
        .unwrap();
        let retriever = Retriever::new(Arc::new(embedder), Arc::new(artifact)).unwrap();
        Arc::new(AnswerPipeline::new(
            retriever,
            Arc::new(FixedGenerator),
            &Config::default(),
        ))
    }

    #[tokio::test]
    async fn test_ask_returns_answer_json() {
        let Json(answer) = ask_handler(
            State(pipeline()),
            Query(AskParams {
                question: "working hours".to_string(),
            }),
        )
        .await
        .unwrap();

        assert!(answer.context_found);
        assert_eq!(answer.count_chunks, 1);
        assert_eq!(answer.sources[0].source, "code_travail");
        assert_eq!(answer.articles, vec!["184"]);
    }

    #[tokio::test]
    async fn test_ask_without_question_refuses() {
        let Json(answer) = ask_handler(
            State(pipeline()),
            Query(AskParams {
                question: String::new(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(answer.answer, REFUSAL_MESSAGE);
    }

    #[tokio::test]
    async fn test_health_reports_index() {
        let Json(health) = health_handler(State(pipeline())).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.vectors, 1);
        assert_eq!(health.dimension, 32);
    }

    #[test]
    fn test_embedding_errors_map_to_503() {
        let (status, _) = error_response(LexError::EmbeddingUnavailable("down".to_string()));
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
