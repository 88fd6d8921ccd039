//! Page retrieval: raw HTTP or headless browser render.
//!
//! Both modes implement [`PageFetcher`], so the worker pool (and tests) are
//! indifferent to how a page's HTML was obtained.

pub mod browser;
pub mod http;

use crate::config::Settings;
use crate::error::ScrapeError;
use async_trait::async_trait;
use std::sync::Arc;

pub use browser::BrowserFetcher;
pub use http::HttpFetcher;

/// Retrieves a URL as an HTML string.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url`, optionally sending `user_agent`. A failure means
    /// "skip this URL"; the caller records it and continues.
    async fn fetch(&self, url: &str, user_agent: Option<&str>) -> Result<String, ScrapeError>;

    /// Release long-lived resources (the headless browser). Best-effort.
    async fn shutdown(&self) {}
}

/// Build the fetcher selected by `Settings.java_script`.
pub fn build_fetcher(settings: &Settings) -> Result<Arc<dyn PageFetcher>, ScrapeError> {
    if settings.java_script {
        Ok(Arc::new(BrowserFetcher::new(settings.proxy())))
    } else {
        Ok(Arc::new(HttpFetcher::new(settings.proxy())?))
    }
}
