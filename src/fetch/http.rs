//! Plain HTTP fetcher.

use crate::error::ScrapeError;
use crate::fetch::PageFetcher;
use async_trait::async_trait;
use std::time::Duration;

/// Fetches pages with a shared `reqwest` client. TLS certificates are
/// verified; the proxy, when configured, applies to every request.
#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(proxy: Option<&str>) -> Result<Self, ScrapeError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10));
        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| ScrapeError::Config(format!("bad proxy {proxy:?}: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| ScrapeError::Config(format!("HTTP client build failed: {e}")))?;
        Ok(HttpFetcher { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, user_agent: Option<&str>) -> Result<String, ScrapeError> {
        let mut request = self.client.get(url);
        if let Some(agent) = user_agent {
            request = request.header(reqwest::header::USER_AGENT, agent);
        }
        let response = request.send().await.map_err(|e| ScrapeError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Fetch {
                url: url.to_string(),
                reason: format!("status {status}"),
            });
        }
        response.text().await.map_err(|e| ScrapeError::Fetch {
            url: url.to_string(),
            reason: format!("reading body: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_proxy_is_config_error() {
        let err = HttpFetcher::new(Some("not a proxy url")).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_builds_without_proxy() {
        assert!(HttpFetcher::new(None).is_ok());
    }

    #[tokio::test]
    async fn test_unroutable_url_is_fetch_error() {
        let fetcher = HttpFetcher::new(None).unwrap();
        // Reserved TEST-NET address; connection refused or timed out either way.
        let err = fetcher
            .fetch("http://192.0.2.1:1/", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Fetch { .. }));
    }
}
