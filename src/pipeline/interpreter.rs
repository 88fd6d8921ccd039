//! The sitemap interpreter: evaluate a scope across its start URLs.

use crate::error::ScrapeError;
use crate::expand::expand_start_urls;
use crate::pipeline::queue::ScopeQueue;
use crate::pipeline::{worker, CompletedJob, Job, RunContext};
use crate::sink::Sink;
use crate::sitemap::{Sitemap, ROOT_SCOPE};
use crate::value::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, warn};
use url::Url;

/// Evaluate every selector whose parent is `parent_id` against each of the
/// sitemap's start URLs (range templates expanded lazily, invalid URLs
/// skipped), using a pool of `Settings.workers` workers.
///
/// For the root scope the per-URL outputs are persisted through the sink
/// and the returned map is empty; for nested scopes the outputs come back
/// in memory, keyed by start URL, so the caller can attach them to the
/// spawning link selector.
///
/// Returns a boxed, explicitly `Send` future rather than `impl Future` so
/// that the recursive call through `worker::process_job` doesn't force the
/// compiler to resolve auto-trait `Send`-ness through an infinitely
/// expanding opaque type.
pub fn scrape_scope(
    ctx: Arc<RunContext>,
    sitemap: Arc<Sitemap>,
    parent_id: String,
) -> Pin<Box<dyn Future<Output = Result<BTreeMap<String, Value>, ScrapeError>> + Send>> {
    Box::pin(scrape_scope_inner(ctx, sitemap, parent_id))
}

async fn scrape_scope_inner(
    ctx: Arc<RunContext>,
    sitemap: Arc<Sitemap>,
    parent_id: String,
) -> Result<BTreeMap<String, Value>, ScrapeError> {
    let worker_count = ctx.settings.workers.max(1);
    let queue = Arc::new(ScopeQueue::new());
    // Queues are sized to the pool so producers block once it saturates.
    let (job_tx, job_rx) = mpsc::channel::<Job>(worker_count);
    let (result_tx, mut result_rx) = mpsc::channel::<CompletedJob>(worker_count);
    let job_rx = Arc::new(Mutex::new(job_rx));

    let mut handles = Vec::with_capacity(worker_count + 1);
    for _ in 0..worker_count {
        handles.push(tokio::spawn(worker::run(
            Arc::clone(&ctx),
            Arc::clone(&sitemap),
            parent_id.clone(),
            Arc::clone(&queue),
            Arc::clone(&job_rx),
            result_tx.clone(),
        )));
    }
    // Workers hold the only senders now; the result channel closes when the
    // last worker exits.
    drop(result_tx);

    handles.push(tokio::spawn(produce(
        Arc::clone(&ctx),
        Arc::clone(&queue),
        sitemap.start_urls.clone(),
        job_tx,
    )));

    // This task is the single consumer: root-path writes are serialized
    // here, which is what keeps the read-modify-write of the output
    // document safe under concurrent completions.
    let mut sink = if parent_id == ROOT_SCOPE {
        Some(Sink::create(&ctx.output_dir, ctx.settings.export)?)
    } else {
        None
    };
    let mut nested = BTreeMap::new();
    let mut fatal: Option<ScrapeError> = None;

    while let Some(job) = result_rx.recv().await {
        if !job.output.is_empty() {
            match sink.as_mut() {
                Some(sink) => {
                    // A failed root write is fatal, but keep draining so the
                    // pipeline shuts down cleanly before reporting it.
                    if fatal.is_none() {
                        if let Err(e) = sink.record(job.start_url, job.output) {
                            error!(error = %e, "output write failed");
                            fatal = Some(e);
                        }
                    }
                }
                None => {
                    nested.insert(job.start_url, Value::Map(job.output));
                }
            }
        }
        queue.complete_job();
    }

    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "pipeline task panicked");
        }
    }
    match fatal {
        Some(e) => Err(e),
        None => Ok(nested),
    }
}

/// Feed jobs from the scope queue, seeding it lazily from the start URL
/// templates. Runs until the queue is drained and nothing in flight can
/// append more, then closes the job channel.
async fn produce(
    ctx: Arc<RunContext>,
    queue: Arc<ScopeQueue>,
    start_urls: Vec<String>,
    job_tx: mpsc::Sender<Job>,
) {
    let mut expansion = expand_start_urls(start_urls);
    loop {
        while let Some(url) = queue.next_pending() {
            if Url::parse(&url).is_err() {
                warn!(url = %url, "skipping invalid start URL");
                ctx.error_log.record(&ScrapeError::InvalidUrl(url));
                continue;
            }
            queue.begin_job();
            if job_tx.send(Job { start_url: url }).await.is_err() {
                return;
            }
        }
        if let Some(url) = expansion.next() {
            queue.push(url);
            continue;
        }
        // Templates exhausted. Arm the wakeup before re-checking so an
        // append or completion between the checks is not lost.
        let changed = queue.changed();
        if queue.has_pending() {
            continue;
        }
        if queue.idle() {
            return;
        }
        changed.await;
    }
}
