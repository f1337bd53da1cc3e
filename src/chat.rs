//! Interactive question loop and terminal rendering

use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;

use crate::rag::{AnswerOutcome, AnswerPipeline, AnswerTrace};
use crate::retrieval::SearchResult;

const PROMPT: &str = "question> ";
const PREVIEW_CHARS: usize = 300;

/// Read questions until `quit`, `exit` or EOF
pub async fn run_chat(pipeline: &AnswerPipeline, history_file: Option<PathBuf>) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    if let Some(path) = &history_file {
        if path.exists() {
            let _ = editor.load_history(path);
        }
    }

    println!("{}", "=".repeat(64).cyan());
    println!("{}", "  lexsearch - ask questions about the indexed texts".bold().cyan());
    println!(
        "{}",
        format!(
            "  top_k: {} | threshold: {}",
            pipeline.params().top_k,
            pipeline.params().threshold
        )
        .dimmed()
    );
    println!("{}\n", "=".repeat(64).cyan());
    println!("Type a question, or {} to leave\n", "quit".green());

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(anyhow::anyhow!("Readline error: {}", err)),
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "quit" | "exit") {
            break;
        }
        let _ = editor.add_history_entry(question);

        match pipeline.answer_with_trace(question).await {
            Ok(trace) => println!("{}", render_trace(&trace)),
            Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
        }
    }

    if let Some(path) = &history_file {
        let _ = editor.save_history(path);
    }
    println!("{}", "Goodbye.".dimmed());
    Ok(())
}

/// Retained passages, answer and sources
pub fn render_trace(trace: &AnswerTrace) -> String {
    let mut out = String::new();

    if !trace.retained.is_empty() {
        out.push_str(&format!("\n{}\n", "Retained passages:".bold()));
        for result in &trace.retained {
            out.push_str(&format!(
                "  {} {}\n",
                format!("[{}]", result.source).cyan(),
                format!("(dist={:.3})", result.distance).dimmed()
            ));
        }
    }

    let heading = match &trace.answer.outcome {
        AnswerOutcome::Generated => "Answer:".green().bold(),
        AnswerOutcome::Refused => "Answer:".yellow().bold(),
        AnswerOutcome::GenerationFailed { .. } => "Answer:".red().bold(),
    };
    out.push_str(&format!("\n{}\n{}\n", heading, trace.answer.answer));

    if !trace.answer.sources.is_empty() {
        out.push_str(&format!("\n{}\n", "Sources:".bold()));
        for source in &trace.answer.sources {
            if source.articles.is_empty() {
                out.push_str(&format!("  - {}\n", source.source));
            } else {
                out.push_str(&format!(
                    "  - {} (articles {})\n",
                    source.source,
                    source.articles.join(", ")
                ));
            }
        }
    }
    out
}

/// `[source - chunk_id] (dist=…)` followed by a text preview, per result
pub fn render_search_results(query: &str, results: &[SearchResult]) -> String {
    let mut out = format!("{} {}\n", "Query:".bold(), query);
    if results.is_empty() {
        out.push_str(&format!("{}\n", "No results.".yellow()));
        return out;
    }

    for result in results {
        out.push_str(&format!(
            "\n{} {}\n",
            format!("[{} - {}]", result.source, result.chunk_id).cyan(),
            format!("(dist={:.4})", result.distance).dimmed()
        ));
        out.push_str(&preview(&result.text));
        out.push('\n');
    }
    out
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::Answer;

    fn result(source: &str, text: &str, distance: f32) -> SearchResult {
        SearchResult {
            chunk_id: format!("{}_clean_0", source),
            source: source.to_string(),
            article: Some("12".to_string()),
            text: text.to_string(),
            distance,
        }
    }

    #[test]
    fn test_render_search_results() {
        colored::control::set_override(false);
        let out = render_search_results("hours", &[result("code_travail", "Working hours.", 0.5)]);
        assert!(out.contains("[code_travail - code_travail_clean_0] (dist=0.5000)"));
        assert!(out.contains("Working hours."));

        let empty = render_search_results("hours", &[]);
        assert!(empty.contains("No results."));
    }

    #[test]
    fn test_render_trace_lists_sources() {
        colored::control::set_override(false);
        let retained = vec![result("code_travail", "Working hours.", 0.5)];
        let trace = AnswerTrace {
            answer: Answer::grounded(&retained, Ok("Eight hours.".to_string())),
            retained,
            context: None,
        };
        let out = render_trace(&trace);
        assert!(out.contains("[code_travail] (dist=0.500)"));
        assert!(out.contains("Eight hours."));
        assert!(out.contains("- code_travail (articles 12)"));
    }

    #[test]
    fn test_preview_truncates_long_text() {
        let long = "a".repeat(PREVIEW_CHARS + 10);
        assert_eq!(preview(&long).chars().count(), PREVIEW_CHARS + 3);
        assert_eq!(preview("short"), "short");
    }
}
