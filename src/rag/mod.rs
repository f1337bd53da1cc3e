// Grounded question answering
//
// Components:
// - Answer types: the response contract returned to callers
// - Pipeline: retrieve -> filter -> pack context -> generate

pub mod answer;
pub mod pipeline;

// Re-export key types
pub use answer::{Answer, AnswerOutcome, SourceRef, GENERATION_FAILURE_MARKER, REFUSAL_MESSAGE};
pub use pipeline::{AnswerPipeline, AnswerTrace, SharedPipeline};
