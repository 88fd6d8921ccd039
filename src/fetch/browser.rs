//! Headless browser fetcher.
//!
//! Launches one Chromium instance lazily on first use and opens a fresh page
//! per fetch: navigate, wait for the load to settle, then read the rendered
//! `<body>` HTML. A navigation that yields an empty body is classified as a
//! fetch failure, not an empty-but-successful parse.

use crate::error::ScrapeError;
use crate::fetch::PageFetcher;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub struct BrowserFetcher {
    browser: Mutex<Option<Arc<Browser>>>,
    proxy: Option<String>,
}

impl BrowserFetcher {
    pub fn new(proxy: Option<&str>) -> Self {
        BrowserFetcher {
            browser: Mutex::new(None),
            proxy: proxy.map(String::from),
        }
    }

    async fn get_or_launch(&self) -> Result<Arc<Browser>, ScrapeError> {
        let mut guard = self.browser.lock().await;
        if let Some(browser) = guard.as_ref() {
            return Ok(Arc::clone(browser));
        }

        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");
        if let Some(proxy) = &self.proxy {
            builder = builder.arg(format!("--proxy-server={proxy}"));
        }
        let config = builder
            .build()
            .map_err(|e| ScrapeError::Config(format!("browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            ScrapeError::Config(format!("headless browser launch failed: {e}"))
        })?;
        tokio::spawn(async move { while handler.next().await.is_some() {} });

        let shared = Arc::new(browser);
        *guard = Some(Arc::clone(&shared));
        Ok(shared)
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str, user_agent: Option<&str>) -> Result<String, ScrapeError> {
        let fetch_err = |reason: String| ScrapeError::Fetch {
            url: url.to_string(),
            reason,
        };

        let browser = self.get_or_launch().await?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| fetch_err(format!("opening page: {e}")))?;

        let result = async {
            if let Some(agent) = user_agent {
                page.set_user_agent(agent)
                    .await
                    .map_err(|e| fetch_err(format!("setting user agent: {e}")))?;
            }
            page.goto(url)
                .await
                .map_err(|e| fetch_err(format!("navigation: {e}")))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| fetch_err(format!("waiting for load: {e}")))?;

            let body: String = page
                .evaluate("document.body ? document.body.innerHTML : ''")
                .await
                .map_err(|e| fetch_err(format!("reading body: {e}")))?
                .into_value()
                .map_err(|e| fetch_err(format!("decoding body: {e}")))?;

            if body.trim().is_empty() {
                return Err(fetch_err("rendered document has an empty body".to_string()));
            }
            Ok(body)
        }
        .await;

        if let Err(e) = page.close().await {
            debug!(url, error = %e, "page close failed");
        }
        result
    }

    async fn shutdown(&self) {
        let mut guard = self.browser.lock().await;
        if let Some(browser) = guard.take() {
            match Arc::try_unwrap(browser) {
                Ok(mut browser) => {
                    if let Err(e) = browser.close().await {
                        warn!(error = %e, "browser close failed");
                    }
                }
                Err(_) => warn!("browser still in use at shutdown"),
            }
        }
    }
}
