//! Error taxonomy for a scrape run.
//!
//! Only two kinds are fatal: a bad configuration document and a write
//! failure on the root output path. Everything else is recovered locally —
//! the offending URL or selector is skipped and the run continues.

use thiserror::Error;

/// Errors surfaced by the scraper core.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The configuration document is missing, malformed, or violates a
    /// sitemap invariant. Fatal; aborts the run.
    #[error("configuration error: {0}")]
    Config(String),

    /// A page could not be retrieved: network failure, non-2xx status,
    /// TLS failure, or a rendered document with an empty body.
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// A start URL was not parseable as an absolute URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// A selector's CSS query could not be parsed. The selector is skipped.
    #[error("selector {id:?} has an unparseable query {query:?}")]
    Query { id: String, query: String },

    /// Writing the output document failed. Fatal on the root path.
    #[error("output write failed: {0}")]
    Sink(String),
}

impl ScrapeError {
    /// Whether this error aborts the run rather than skipping one unit of work.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScrapeError::Config(_) | ScrapeError::Sink(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ScrapeError::Config("bad".into()).is_fatal());
        assert!(ScrapeError::Sink("disk full".into()).is_fatal());
        assert!(!ScrapeError::Fetch {
            url: "http://x/".into(),
            reason: "timeout".into()
        }
        .is_fatal());
        assert!(!ScrapeError::InvalidUrl("::".into()).is_fatal());
    }

    #[test]
    fn test_display_includes_url() {
        let err = ScrapeError::Fetch {
            url: "http://x/p".into(),
            reason: "status 404".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("http://x/p"));
        assert!(msg.contains("404"));
    }
}
