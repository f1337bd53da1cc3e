//! Cleaning of extracted document text before segmentation

use regex::Regex;
use std::sync::OnceLock;

struct Patterns {
    page_marker: Regex,
    url: Regex,
    foreign_chars: Regex,
    whitespace: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        page_marker: Regex::new(r"Page\s*\d+\s*(?:/|of)?\s*\d*").expect("valid page pattern"),
        url: Regex::new(r"http\S+|www\.\S+").expect("valid url pattern"),
        // ASCII plus Latin-1 letters and Latin Extended-A
        foreign_chars: Regex::new(r"[^\x00-\x7F\u{00C0}-\u{017F}\n]").expect("valid charset pattern"),
        whitespace: Regex::new(r"\s+").expect("valid whitespace pattern"),
    })
}

/// Normalise raw extracted text into a single whitespace-collapsed line.
///
/// Removes page footers ("Page 3", "Page 3 / 10", "Page 3 of 10") and URLs,
/// and replaces symbols outside the accepted character ranges with spaces.
pub fn clean_text(raw: &str) -> String {
    let p = patterns();
    let text = raw.replace('\r', "\n");
    let text = p.page_marker.replace_all(&text, " ");
    let text = p.url.replace_all(&text, " ");
    let text = p.foreign_chars.replace_all(&text, " ");
    let text = p.whitespace.replace_all(&text, " ");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_page_markers_and_urls() {
        let raw = "Article 1\r\nLa durée Page 3 / 10 du travail\nvoir https://example.org/loi et www.sgg.gov.ma ici";
        let cleaned = clean_text(raw);
        assert_eq!(cleaned, "Article 1 La durée du travail voir et ici");
    }

    #[test]
    fn keeps_accented_letters_and_drops_symbols() {
        let cleaned = clean_text("Employé «salarié» → congé");
        assert_eq!(cleaned, "Employé salarié congé");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(clean_text("  \n\t "), "");
    }
}
