//! Intermediate chunk corpus (JSON Lines)
//!
//! Hand-off between segmentation and embedding: one JSON object per line
//! with `source`, `chunk_id`, `text` and, for article chunks, `article`.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use super::Segmenter;
use crate::errors::{LexError, Result};

/// Suffix added to cleaned text file stems
const CLEAN_SUFFIX: &str = "_clean";

/// One chunk as written to the corpus file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub source: String,
    pub chunk_id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article: Option<String>,
}

/// Document name for a cleaned file stem ("code_travail_clean" → "code_travail")
pub fn source_name(stem: &str) -> &str {
    stem.strip_suffix(CLEAN_SUFFIX).unwrap_or(stem)
}

/// Segment one document. Chunk ids are `<stem>_<index>`, stable as long as
/// the text and the segmentation parameters are unchanged.
pub fn segment_document(stem: &str, text: &str, segmenter: &dyn Segmenter) -> Vec<CorpusRecord> {
    let source = source_name(stem);
    segmenter
        .segment(text)
        .into_iter()
        .enumerate()
        .map(|(idx, segment)| CorpusRecord {
            source: source.to_string(),
            chunk_id: format!("{}_{}", stem, idx),
            text: segment.text,
            article: segment.article,
        })
        .collect()
}

/// Write records as JSON Lines, replacing any existing file
pub fn write_corpus(path: &Path, records: &[CorpusRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a JSON Lines corpus, skipping blank lines
pub fn read_corpus(path: &Path) -> Result<Vec<CorpusRecord>> {
    if !path.exists() {
        return Err(LexError::ArtifactMissing(path.to_path_buf()));
    }

    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: CorpusRecord = serde_json::from_str(&line).map_err(|e| {
            LexError::MetadataFormat(format!("{} line {}: {}", path.display(), line_no + 1, e))
        })?;
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{ArticleSegmenter, SentenceSegmenter};

    #[test]
    fn test_source_name_strips_clean_suffix() {
        assert_eq!(source_name("code_travail_clean"), "code_travail");
        assert_eq!(source_name("moudawana"), "moudawana");
    }

    #[test]
    fn test_segment_document_ids() {
        let segmenter = SentenceSegmenter::new(20, 0);
        let records = segment_document(
            "code_travail_clean",
            "First rule applies. Second rule applies.",
            &segmenter,
        );

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].chunk_id, "code_travail_clean_0");
        assert_eq!(records[1].chunk_id, "code_travail_clean_1");
        assert!(records.iter().all(|r| r.source == "code_travail"));
    }

    #[test]
    fn test_segment_document_carries_article() {
        let records = segment_document(
            "famille_clean",
            "Article 4 Marriage is a contract. Article 5 Engagement is a promise.",
            &ArticleSegmenter::new(),
        );
        assert_eq!(records[1].article.as_deref(), Some("5"));
    }

    #[test]
    fn test_write_and_read_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunks").join("chunks.jsonl");
        let records = vec![
            CorpusRecord {
                source: "code".to_string(),
                chunk_id: "code_clean_0".to_string(),
                text: "La durée du travail".to_string(),
                article: None,
            },
            CorpusRecord {
                source: "code".to_string(),
                chunk_id: "code_clean_1".to_string(),
                text: "Article 2".to_string(),
                article: Some("2".to_string()),
            },
        ];

        write_corpus(&path, &records).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw.lines().count(), 2);
        assert!(raw.contains("durée"));
        assert!(!raw.lines().next().unwrap().contains("article"));

        assert_eq!(read_corpus(&path).unwrap(), records);
    }

    #[test]
    fn test_read_missing_corpus() {
        let err = read_corpus(Path::new("/nonexistent/chunks.jsonl")).unwrap_err();
        assert!(matches!(err, LexError::ArtifactMissing(_)));
    }
}
