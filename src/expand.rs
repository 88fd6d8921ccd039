//! Numeric range expansion for start URL templates.
//!
//! A template ending in `[N-M]` (decimal integers) expands to one URL per
//! integer in the range, appended to the prefix: `http://x/page/[1-3]`
//! yields `/page/1`, `/page/2`, `/page/3`. Templates without the suffix
//! pass through unchanged. Expansion is lazy so a consumer can take a
//! prefix of a large range without materializing the tail.

use regex::Regex;
use std::sync::OnceLock;

fn range_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[(\d{1,10})-(\d{1,10})\]$").expect("range pattern"))
}

/// Lazily expand a list of URL templates in input order.
pub fn expand_start_urls(urls: Vec<String>) -> impl Iterator<Item = String> {
    urls.into_iter().flat_map(expand_template)
}

/// Expand a single template into its URL sequence.
///
/// An inverted range (`[9-5]`) yields nothing; a degenerate range (`[5-5]`)
/// yields exactly one URL.
pub fn expand_template(template: String) -> Box<dyn Iterator<Item = String> + Send> {
    let captures = match range_pattern().captures(&template) {
        Some(c) => c,
        None => return Box::new(std::iter::once(template)),
    };
    let span = captures.get(0).expect("whole match").range();
    // Group digit counts are capped at 10, so these always fit in i64.
    let low: i64 = captures[1].parse().expect("range low");
    let high: i64 = captures[2].parse().expect("range high");
    let prefix = template[..span.start].to_string();
    Box::new((low..=high).map(move |i| format!("{prefix}{i}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_all(urls: &[&str]) -> Vec<String> {
        expand_start_urls(urls.iter().map(|s| s.to_string()).collect()).collect()
    }

    #[test]
    fn test_plain_url_passes_through() {
        assert_eq!(expand_all(&["http://x/page"]), vec!["http://x/page"]);
    }

    #[test]
    fn test_range_expands_ascending() {
        assert_eq!(
            expand_all(&["http://x/p/[1-3]"]),
            vec!["http://x/p/1", "http://x/p/2", "http://x/p/3"]
        );
    }

    #[test]
    fn test_degenerate_range_yields_one() {
        assert_eq!(expand_all(&["http://x/p/[5-5]"]), vec!["http://x/p/5"]);
    }

    #[test]
    fn test_inverted_range_yields_nothing() {
        assert!(expand_all(&["http://x/p/[9-5]"]).is_empty());
    }

    #[test]
    fn test_templates_keep_input_order() {
        assert_eq!(
            expand_all(&["http://a/[1-2]", "http://b/solo", "http://c/[7-8]"]),
            vec![
                "http://a/1",
                "http://a/2",
                "http://b/solo",
                "http://c/7",
                "http://c/8"
            ]
        );
    }

    #[test]
    fn test_bracket_not_at_end_is_literal() {
        assert_eq!(
            expand_all(&["http://x/[1-3]/page"]),
            vec!["http://x/[1-3]/page"]
        );
    }

    #[test]
    fn test_expansion_is_lazy() {
        let mut iter = expand_start_urls(vec!["http://x/[1-1000000000]".to_string()]);
        assert_eq!(iter.next().as_deref(), Some("http://x/1"));
        assert_eq!(iter.next().as_deref(), Some("http://x/2"));
        // Dropping the iterator here must not force the remaining tail.
    }
}
