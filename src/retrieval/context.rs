//! Context packing for the generation prompt
//!
//! Blocks are formatted as `[source] text`, kept in ranked order and joined
//! with [`CONTEXT_DELIMITER`]. Lengths are counted in characters and the
//! delimiters count against the budget.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::warn;

use super::SearchResult;

/// Separator between context blocks
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

/// What to do with the first block that does not fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PackingPolicy {
    /// Omit it and stop. A first block over the whole budget is cut
    /// instead, so the context is not empty.
    #[default]
    DropWhole,
    /// Cut it to the remaining budget and stop
    Truncate,
}

impl fmt::Display for PackingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackingPolicy::DropWhole => write!(f, "drop_whole"),
            PackingPolicy::Truncate => write!(f, "truncate"),
        }
    }
}

/// Packed context and how many results went into it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledContext {
    pub text: String,
    /// Results included, whole or truncated
    pub block_count: usize,
    pub truncated: bool,
}

/// Budgeted context assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextBuilder {
    max_chars: usize,
    policy: PackingPolicy,
}

impl ContextBuilder {
    pub fn new(max_chars: usize, policy: PackingPolicy) -> Self {
        Self { max_chars, policy }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn policy(&self) -> PackingPolicy {
        self.policy
    }

    /// Pack `results`; the returned text is never longer than `max_chars`
    pub fn build(&self, results: &[SearchResult]) -> AssembledContext {
        let delimiter_len = CONTEXT_DELIMITER.chars().count();
        let mut text = String::new();
        let mut used = 0usize;
        let mut block_count = 0usize;
        let mut truncated = false;

        for result in results {
            let block = format_block(result);
            let separator = if block_count == 0 { 0 } else { delimiter_len };
            let cost = separator + block.chars().count();

            if used + cost <= self.max_chars {
                if block_count > 0 {
                    text.push_str(CONTEXT_DELIMITER);
                }
                text.push_str(&block);
                used += cost;
                block_count += 1;
                continue;
            }

            // A first block larger than the whole budget is cut under either
            // policy, so retained results never pack to an empty context
            let oversized_first = block_count == 0;
            if self.policy == PackingPolicy::Truncate || oversized_first {
                if oversized_first && self.policy == PackingPolicy::DropWhole {
                    warn!(
                        source = %result.source,
                        chars = cost,
                        max_chars = self.max_chars,
                        "Top block exceeds the context budget, truncating it"
                    );
                }
                let room = self.max_chars.saturating_sub(used + separator);
                if room > 0 {
                    if block_count > 0 {
                        text.push_str(CONTEXT_DELIMITER);
                    }
                    text.extend(block.chars().take(room));
                    block_count += 1;
                    truncated = true;
                }
            }
            break;
        }

        AssembledContext {
            text,
            block_count,
            truncated,
        }
    }

    /// Packed context text only
    pub fn build_context(&self, results: &[SearchResult]) -> String {
        self.build(results).text
    }
}

fn format_block(result: &SearchResult) -> String {
    format!("[{}] {}", result.source, result.text)
}

/// Individual labels of a possibly comma-separated article field
pub fn split_articles(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

/// All distinct article labels across `results`, sorted
pub fn collect_articles(results: &[SearchResult]) -> Vec<String> {
    results
        .iter()
        .filter_map(|r| r.article.as_deref())
        .flat_map(split_articles)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(source: &str, text: &str, article: Option<&str>) -> SearchResult {
        SearchResult {
            chunk_id: format!("{}_0", source),
            source: source.to_string(),
            article: article.map(str::to_string),
            text: text.to_string(),
            distance: 1.0,
        }
    }

    #[test]
    fn test_blocks_joined_in_order() {
        let builder = ContextBuilder::new(7000, PackingPolicy::DropWhole);
        let text = builder.build_context(&[result("a", "first", None), result("b", "second", None)]);
        assert_eq!(text, "[a] first\n\n---\n\n[b] second");
    }

    #[test]
    fn test_drop_whole_stops_at_first_overflow() {
        // "[a] 12345" is 9 chars, delimiter is 7
        let builder = ContextBuilder::new(20, PackingPolicy::DropWhole);
        let context = builder.build(&[
            result("a", "12345", None),
            result("b", "12345", None),
            result("c", "1", None),
        ]);
        assert_eq!(context.text, "[a] 12345");
        assert_eq!(context.block_count, 1);
        assert!(!context.truncated);
    }

    #[test]
    fn test_truncate_fills_budget_exactly() {
        let builder = ContextBuilder::new(21, PackingPolicy::Truncate);
        let context = builder.build(&[result("a", "12345", None), result("b", "12345", None)]);
        assert_eq!(context.text.chars().count(), 21);
        assert_eq!(context.text, "[a] 12345\n\n---\n\n[b] 1");
        assert_eq!(context.block_count, 2);
        assert!(context.truncated);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let builder = ContextBuilder::new(6, PackingPolicy::Truncate);
        let text = builder.build_context(&[result("a", "éééééé", None)]);
        assert_eq!(text, "[a] éé");
    }

    #[test]
    fn test_budget_never_exceeded() {
        let results: Vec<_> = (0..50)
            .map(|i| result(&format!("doc{}", i), &"x".repeat(i * 7 + 1), None))
            .collect();
        for max_chars in [0, 1, 10, 100, 333, 1000] {
            for policy in [PackingPolicy::DropWhole, PackingPolicy::Truncate] {
                let text = ContextBuilder::new(max_chars, policy).build_context(&results);
                assert!(text.chars().count() <= max_chars);
            }
        }
    }

    #[test]
    fn test_oversized_first_block_is_cut_to_budget() {
        let builder = ContextBuilder::new(8, PackingPolicy::DropWhole);
        let context = builder.build(&[result("a", "too long", None), result("b", "x", None)]);
        assert_eq!(context.text, "[a] too ");
        assert_eq!(context.block_count, 1);
        assert!(context.truncated);
    }

    #[test]
    fn test_zero_budget_packs_nothing() {
        let builder = ContextBuilder::new(0, PackingPolicy::DropWhole);
        let context = builder.build(&[result("a", "text", None)]);
        assert!(context.text.is_empty());
        assert_eq!(context.block_count, 0);
    }

    #[test]
    fn test_collect_articles_dedupes_and_sorts() {
        let results = vec![
            result("a", "", Some("L1234-2, L1234-1")),
            result("b", "", None),
            result("c", "", Some("L1234-1")),
            result("d", "", Some(" , ")),
        ];
        assert_eq!(collect_articles(&results), vec!["L1234-1", "L1234-2"]);
    }

    #[test]
    fn test_split_articles() {
        assert_eq!(split_articles("12, 13 bis ,14"), vec!["12", "13 bis", "14"]);
        assert!(split_articles("").is_empty());
    }
}
