use tracing::{debug, warn};

use super::SearchResult;

/// Keep results with `distance < threshold`.
///
/// When none qualify, the `fallback_count` nearest raw results are returned
/// instead, so a non-empty input never yields an empty output (unless
/// `fallback_count` is 0). Input order is preserved.
pub fn filter_relevant(
    results: Vec<SearchResult>,
    threshold: f32,
    fallback_count: usize,
) -> Vec<SearchResult> {
    let total = results.len();
    let (relevant, rest): (Vec<_>, Vec<_>) =
        results.into_iter().partition(|r| r.distance < threshold);

    if !relevant.is_empty() {
        debug!(kept = relevant.len(), total, threshold, "Filtered by distance");
        return relevant;
    }

    if total > 0 {
        warn!(
            threshold,
            best = rest.first().map(|r| r.distance),
            fallback_count,
            "No result under threshold, falling back to nearest"
        );
    }
    rest.into_iter().take(fallback_count).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, distance: f32) -> SearchResult {
        SearchResult {
            chunk_id: id.to_string(),
            source: "s".to_string(),
            article: None,
            text: String::new(),
            distance,
        }
    }

    fn ids(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.chunk_id.as_str()).collect()
    }

    #[test]
    fn test_threshold_is_strict() {
        let filtered = filter_relevant(
            vec![result("a", 3.0), result("b", 9.5), result("c", 12.0)],
            9.5,
            2,
        );
        assert_eq!(ids(&filtered), vec!["a"]);
    }

    #[test]
    fn test_fallback_returns_two_nearest() {
        let filtered = filter_relevant(
            vec![result("a", 10.0), result("b", 11.0), result("c", 12.0)],
            9.5,
            2,
        );
        assert_eq!(ids(&filtered), vec!["a", "b"]);
    }

    #[test]
    fn test_fallback_with_single_result() {
        let filtered = filter_relevant(vec![result("a", 20.0)], 9.5, 2);
        assert_eq!(ids(&filtered), vec!["a"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(filter_relevant(Vec::new(), 9.5, 2).is_empty());
    }
}
