//! Sentence-accumulation strategy
//!
//! Sentences are packed greedily into chunks of at most `max_chars`
//! characters (one separator character counted per sentence). A sentence
//! longer than the budget on its own is cut into `max_chars` slices. After a
//! chunk spanning sentences `[i, j)`, the next one starts at
//! `max(i + 1, j - overlap)`, so the start index strictly increases.

use super::{Segment, Segmenter};

/// Lowercased words that end with a period without ending a sentence
const ABBREVIATIONS: &[&str] = &[
    "al", "art", "cf", "ch", "dr", "mme", "mr", "mrs", "no", "p", "pp", "vol",
];

/// Sentence-based segmenter with overlap
#[derive(Debug, Clone)]
pub struct SentenceSegmenter {
    max_chars: usize,
    overlap: usize,
}

impl SentenceSegmenter {
    pub fn new(max_chars: usize, overlap: usize) -> Self {
        Self { max_chars, overlap }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

impl Default for SentenceSegmenter {
    fn default() -> Self {
        Self::new(900, 2)
    }
}

impl Segmenter for SentenceSegmenter {
    fn name(&self) -> &str {
        "sentences"
    }

    fn segment(&self, text: &str) -> Vec<Segment> {
        let sentences = split_sentences(text);
        chunk_sentences(&sentences, self.max_chars, self.overlap)
            .into_iter()
            .map(Segment::plain)
            .collect()
    }
}

/// Split text into sentences on `.`, `!`, `?` followed by whitespace or end
/// of text. Common abbreviations (`art.`, `al.`) and single-letter initials
/// do not end a sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    for i in 0..len {
        current.push(chars[i]);

        if !matches!(chars[i], '.' | '!' | '?') {
            continue;
        }

        let at_end = i + 1 >= len;
        let next_is_space = !at_end && chars[i + 1].is_whitespace();
        if !(at_end || next_is_space) {
            continue;
        }

        if chars[i] == '.' && !at_end && ends_with_abbreviation(&current) {
            continue;
        }

        push_trimmed(&mut sentences, &current);
        current.clear();
    }

    push_trimmed(&mut sentences, &current);
    sentences
}

fn push_trimmed(sentences: &mut Vec<String>, candidate: &str) {
    let trimmed = candidate.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
}

/// `current` ends with '.'; check the word right before it
fn ends_with_abbreviation(current: &str) -> bool {
    let body = &current[..current.len() - 1];
    let word: String = body
        .chars()
        .rev()
        .take_while(|c| c.is_alphabetic())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    if word.is_empty() {
        return false;
    }

    let single_initial = word.chars().count() == 1 && word.chars().all(char::is_uppercase);
    single_initial || ABBREVIATIONS.contains(&word.to_lowercase().as_str())
}

/// Pack sentences into chunks of at most `max_chars` characters.
///
/// Terminates for any input: every iteration advances the start index by at
/// least one sentence.
pub fn chunk_sentences(sentences: &[String], max_chars: usize, overlap: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let lengths: Vec<usize> = sentences.iter().map(|s| s.chars().count()).collect();
    let n = sentences.len();
    let mut chunks = Vec::new();
    let mut i = 0;

    while i < n {
        let mut j = i;
        let mut current_chars = 0;
        while j < n && current_chars + lengths[j] + 1 <= max_chars {
            current_chars += lengths[j] + 1;
            j += 1;
        }

        if j == i {
            chunks.extend(slice_oversized(&sentences[i], max_chars));
            i += 1;
            continue;
        }

        let chunk = sentences[i..j].join(" ");
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        i = (i + 1).max(j.saturating_sub(overlap));
    }

    chunks
}

/// Cut a sentence into consecutive `max_chars`-character pieces
fn slice_oversized(sentence: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = sentence.chars().collect();
    chars
        .chunks(max_chars)
        .map(|piece| piece.iter().collect::<String>().trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}
