//! Structural-marker strategy
//!
//! Each chunk runs from one marker match to the next (or to the end of the
//! document). Text before the first marker is not part of any chunk. No
//! size cap applies.

use regex::Regex;
use std::sync::OnceLock;

use super::{Segment, Segmenter};
use crate::errors::{LexError, Result};

/// Matches "Article 12", "Article 5 bis", "ARTICLE 3-1"; group 1 is the label
pub const DEFAULT_ARTICLE_PATTERN: &str =
    r"\b(?:Article|ARTICLE)\s+(\d+(?:-\d+)?(?:\s+(?:bis|ter|quater)\b)?)";

/// Marker-based segmenter
#[derive(Debug, Clone)]
pub struct ArticleSegmenter {
    marker: Regex,
}

fn default_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(DEFAULT_ARTICLE_PATTERN).expect("valid article pattern"))
}

impl ArticleSegmenter {
    pub fn new() -> Self {
        Self {
            marker: default_marker().clone(),
        }
    }

    /// Use a custom marker pattern. Capture group 1, when present, becomes
    /// the article label; otherwise the whole match is used.
    pub fn with_pattern(pattern: &str) -> Result<Self> {
        let marker = Regex::new(pattern)
            .map_err(|e| LexError::Config(format!("Invalid article pattern: {}", e)))?;
        Ok(Self { marker })
    }
}

impl Default for ArticleSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter for ArticleSegmenter {
    fn name(&self) -> &str {
        "articles"
    }

    fn segment(&self, text: &str) -> Vec<Segment> {
        let markers: Vec<(usize, String)> = self
            .marker
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let label = caps.get(1).unwrap_or(whole).as_str();
                Some((whole.start(), normalize_label(label)))
            })
            .collect();

        markers
            .iter()
            .enumerate()
            .filter_map(|(idx, (start, label))| {
                let end = markers.get(idx + 1).map_or(text.len(), |(next, _)| *next);
                let body = text[*start..end].trim();
                (!body.is_empty()).then(|| Segment {
                    text: body.to_string(),
                    article: Some(label.clone()),
                })
            })
            .collect()
    }
}

fn normalize_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_each_marker() {
        let text = "Preamble text. Article 1 Working hours are 8 hours per day. \
                    Article 2 Overtime is paid. Article 3 bis Leave is annual.";
        let segments = ArticleSegmenter::new().segment(text);

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].article.as_deref(), Some("1"));
        assert!(segments[0].text.starts_with("Article 1"));
        assert!(segments[0].text.ends_with("per day."));
        assert_eq!(segments[1].text, "Article 2 Overtime is paid.");
        assert_eq!(segments[2].article.as_deref(), Some("3 bis"));
    }

    #[test]
    fn preamble_is_dropped() {
        let segments = ArticleSegmenter::new().segment("Title. Article 7 Body.");
        assert_eq!(segments.len(), 1);
        assert!(!segments[0].text.contains("Title"));
    }

    #[test]
    fn lowercase_references_are_not_markers() {
        let text = "Article 4 As provided in article 2, the employer pays.";
        let segments = ArticleSegmenter::new().segment(text);
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn default_matches_explicit_default_pattern() {
        let text = "Intro. Article 5 bis First. ARTICLE 6-1 Second.";
        let explicit = ArticleSegmenter::with_pattern(DEFAULT_ARTICLE_PATTERN).unwrap();
        assert_eq!(ArticleSegmenter::default().segment(text), explicit.segment(text));
        assert_eq!(ArticleSegmenter::new().segment(text).len(), 2);
    }

    #[test]
    fn no_marker_yields_no_chunks() {
        assert!(ArticleSegmenter::new().segment("Plain text without structure.").is_empty());
        assert!(ArticleSegmenter::new().segment("").is_empty());
    }

    #[test]
    fn custom_pattern_without_group_uses_whole_match() {
        let segmenter = ArticleSegmenter::with_pattern(r"§\d+").unwrap();
        let segments = segmenter.segment("§1 first. §2 second.");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].article.as_deref(), Some("§2"));
    }
}
