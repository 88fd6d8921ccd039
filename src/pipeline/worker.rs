//! Worker loop: fetch a page, evaluate its scope's selectors, route links.

use crate::extract;
use crate::pipeline::interpreter;
use crate::pipeline::queue::ScopeQueue;
use crate::pipeline::{CompletedJob, Job, RunContext};
use crate::sitemap::Sitemap;
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use url::Url;

/// Consume jobs until the channel closes. Each worker rotates through the
/// configured user agents independently, one step per request.
pub(crate) async fn run(
    ctx: Arc<RunContext>,
    sitemap: Arc<Sitemap>,
    parent_id: String,
    queue: Arc<ScopeQueue>,
    job_rx: Arc<Mutex<mpsc::Receiver<Job>>>,
    result_tx: mpsc::Sender<CompletedJob>,
) {
    let mut requests = 0usize;
    loop {
        let job = { job_rx.lock().await.recv().await };
        let Some(job) = job else { break };
        let user_agent = ctx.settings.user_agent_for(requests).map(String::from);
        requests += 1;

        let output = process_job(
            &ctx,
            &sitemap,
            &parent_id,
            &queue,
            &job.start_url,
            user_agent.as_deref(),
        )
        .await;

        let completed = CompletedJob {
            start_url: job.start_url,
            output,
        };
        if result_tx.send(completed).await.is_err() {
            // Consumer is gone; balance the in-flight count ourselves so the
            // producer can still terminate.
            queue.complete_job();
            break;
        }
    }
}

/// Fetch one URL and evaluate every selector under the scope's parent.
/// Failures are recorded and produce an empty output; the run continues.
async fn process_job(
    ctx: &Arc<RunContext>,
    sitemap: &Arc<Sitemap>,
    parent_id: &str,
    queue: &Arc<ScopeQueue>,
    start_url: &str,
    user_agent: Option<&str>,
) -> BTreeMap<String, Value> {
    info!(url = %start_url, "fetching");
    let html = match ctx.fetcher.fetch(start_url, user_agent).await {
        Ok(html) => html,
        Err(e) => {
            warn!(url = %start_url, error = %e, "fetch failed, skipping URL");
            ctx.error_log.record(&e);
            return BTreeMap::new();
        }
    };
    // The producer validated this URL before enqueueing it.
    let Ok(page_url) = Url::parse(start_url) else {
        return BTreeMap::new();
    };

    // DOM parsing and selector evaluation stay off the async executor;
    // the parsed document is not `Send`.
    let eval_sitemap = Arc::clone(sitemap);
    let eval_parent = parent_id.to_string();
    let eval_log = Arc::clone(&ctx.error_log);
    let extraction = tokio::task::spawn_blocking(move || {
        extract::evaluate_page(&eval_sitemap, &eval_parent, &page_url, &html, &eval_log)
    })
    .await
    .unwrap_or_default();

    let mut output = extraction.output;
    for discovered in extraction.links {
        let Some(selector) = sitemap
            .selectors
            .iter()
            .find(|s| s.id == discovered.selector_id)
        else {
            continue;
        };

        if selector.is_self_paginating() {
            // Pagination: feed the scope's own queue instead of descending.
            for url in discovered.urls {
                if queue.push_discovered(url.clone()) {
                    debug!(url = %url, "queued self-discovered URL");
                }
            }
        } else if !sitemap.has_children(&selector.id) {
            // Leaf link selector: the links themselves are the value.
            output.insert(selector.id.clone(), Value::list_of(discovered.urls));
        } else {
            // Sub-scrape: evaluate the selector tree under this selector
            // with the discovered links as start URLs.
            let derived = Arc::new(sitemap.derive(&selector.id, discovered.urls));
            let nested = Box::pin(interpreter::scrape_scope(
                Arc::clone(ctx),
                derived,
                selector.id.clone(),
            ))
            .await;
            match nested {
                Ok(results) if !results.is_empty() => {
                    output.insert(selector.id.clone(), Value::Map(results));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(selector = %selector.id, error = %e, "nested scrape failed");
                    ctx.error_log.record(&e);
                }
            }
        }
    }
    output
}
