//! The scope's URL list, shared between producer and workers.
//!
//! Self-paginating link selectors append discovered URLs mid-run; the
//! producer's enqueue loop observes appends through the cursor and keeps
//! draining until the list is exhausted and no in-flight job remains to
//! append more. Deduplication against the full list guarantees each
//! self-discovered URL is fetched at most once per run.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

pub(crate) struct ScopeQueue {
    state: Mutex<QueueState>,
    in_flight: AtomicUsize,
    notify: Notify,
}

struct QueueState {
    urls: Vec<String>,
    cursor: usize,
}

impl ScopeQueue {
    pub fn new() -> Self {
        ScopeQueue {
            state: Mutex::new(QueueState {
                urls: Vec::new(),
                cursor: 0,
            }),
            in_flight: AtomicUsize::new(0),
            notify: Notify::new(),
        }
    }

    /// Append a URL unconditionally (initial seeding from the expander).
    pub fn push(&self, url: String) {
        self.state.lock().expect("queue lock").urls.push(url);
        self.notify.notify_one();
    }

    /// Append a discovered URL unless the scope already knows it.
    /// Returns whether the URL was new.
    pub fn push_discovered(&self, url: String) -> bool {
        let mut state = self.state.lock().expect("queue lock");
        if state.urls.iter().any(|existing| existing == &url) {
            return false;
        }
        state.urls.push(url);
        drop(state);
        self.notify.notify_one();
        true
    }

    /// Take the next URL that has not been handed to a worker yet.
    pub fn next_pending(&self) -> Option<String> {
        let mut state = self.state.lock().expect("queue lock");
        if state.cursor < state.urls.len() {
            let url = state.urls[state.cursor].clone();
            state.cursor += 1;
            Some(url)
        } else {
            None
        }
    }

    pub fn has_pending(&self) -> bool {
        let state = self.state.lock().expect("queue lock");
        state.cursor < state.urls.len()
    }

    /// Mark one job handed to the pool.
    pub fn begin_job(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    /// Mark one job fully consumed (sink write included).
    pub fn complete_job(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// No pending URLs and nothing in flight: the scope is done.
    pub fn idle(&self) -> bool {
        !self.has_pending() && self.in_flight.load(Ordering::SeqCst) == 0
    }

    /// A future completing on the next append or completion. Create it
    /// before re-checking state so a concurrent signal is not lost.
    pub fn changed(&self) -> Notified<'_> {
        self.notify.notified()
    }
}
