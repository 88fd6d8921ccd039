//! The concurrent scrape pipeline: scope queue, worker pool, interpreter.
//!
//! A scope (the root, or one spawned by a link selector) runs as a bounded
//! producer/worker/consumer pipeline. The producer feeds start URLs into a
//! job channel sized to the worker count, workers fetch and evaluate pages,
//! and a single consumer drains completed jobs — into the on-disk document
//! for the root scope, into an in-memory map for nested scopes.

pub mod interpreter;
pub mod queue;
pub mod worker;

pub use interpreter::scrape_scope;

use crate::config::Settings;
use crate::fetch::PageFetcher;
use crate::logging::ErrorLog;
use crate::value::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Run-scoped context threaded through the interpreter, workers, and sink.
pub struct RunContext {
    pub settings: Settings,
    pub fetcher: Arc<dyn PageFetcher>,
    pub error_log: Arc<ErrorLog>,
    /// Directory receiving `output.<ext>` and the error log.
    pub output_dir: PathBuf,
}

/// One unit of work: a start URL to fetch under the scope's parent.
#[derive(Debug)]
pub(crate) struct Job {
    pub start_url: String,
}

/// A job after fetch and evaluation; `output` may be empty when the page
/// was skipped or matched nothing.
pub(crate) struct CompletedJob {
    pub start_url: String,
    pub output: BTreeMap<String, Value>,
}
