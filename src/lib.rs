//! trawler: a configurable web scraper driven by a declarative sitemap.
//!
//! A sitemap is a tree of typed CSS selectors rooted at the virtual scope
//! `_root`, evaluated per start URL by a bounded worker pool. Link selectors
//! recurse into sub-scopes (or paginate their own scope), and per-URL
//! results are aggregated into `output.json` / `output.xml` / `output.csv`.

pub mod config;
pub mod error;
pub mod expand;
pub mod extract;
pub mod fetch;
pub mod logging;
pub mod pipeline;
pub mod sink;
pub mod sitemap;
pub mod value;

use crate::config::ConfigDocument;
use crate::logging::ErrorLog;
use crate::pipeline::RunContext;
use crate::sitemap::ROOT_SCOPE;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Load the configuration document and execute the scrape it describes.
///
/// Configuration problems and root output failures abort with an error;
/// per-URL and per-selector failures are recovered locally.
pub async fn run(config_path: &Path, output_dir: &Path) -> Result<()> {
    let document = ConfigDocument::load(config_path).context("loading configuration")?;
    let fetcher = fetch::build_fetcher(&document.settings)?;
    let error_log = Arc::new(ErrorLog::open(
        &output_dir.join(logging::LOG_FILE),
        document.settings.log,
    )?);

    let ctx = Arc::new(RunContext {
        settings: document.settings.clone(),
        fetcher: Arc::clone(&fetcher),
        error_log,
        output_dir: output_dir.to_path_buf(),
    });
    let sitemap = Arc::new(document.sitemap);

    info!(
        start_urls = sitemap.start_urls.len(),
        selectors = sitemap.selectors.len(),
        workers = ctx.settings.workers,
        "starting scrape"
    );
    pipeline::scrape_scope(ctx, sitemap, ROOT_SCOPE.to_string())
        .await
        .context("scrape run failed")?;
    fetcher.shutdown().await;
    info!("scrape complete");
    Ok(())
}
