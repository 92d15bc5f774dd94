//! Shared crawl state: the pending queue plus the bookkeeping that decides
//! what gets enqueued next.
//!
//! One `Frontier` lives for one run and is shared by all workers through an
//! `Arc`. Per-key state (seen ids, cursors, block counters) uses sharded
//! maps so workers touching different roots do not contend.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use dashmap::{DashMap, DashSet};
use tokio::sync::Notify;
use tokio::sync::futures::Notified;

use crate::models::{CrawlRequest, SourcePlatform};

/// Outcome of [`Frontier::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueResult {
    Accepted,
    /// The URL was already enqueued in this run.
    Duplicate,
    /// The run's request budget is spent.
    OverBudget,
}

pub struct Frontier {
    queue: Mutex<VecDeque<CrawlRequest>>,
    notify: Notify,
    known_urls: DashSet<String>,
    seen_job_ids: DashSet<(SourcePlatform, String)>,
    pagination_cursor: DashMap<String, usize>,
    block_retry_count: DashMap<String, u32>,
    accepted: AtomicUsize,
    in_flight: AtomicUsize,
    budget_hit: AtomicBool,
    max_requests: usize,
}

impl Frontier {
    pub fn new(max_requests: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            known_urls: DashSet::new(),
            seen_job_ids: DashSet::new(),
            pagination_cursor: DashMap::new(),
            block_retry_count: DashMap::new(),
            accepted: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            budget_hit: AtomicBool::new(false),
            max_requests,
        }
    }

    // The queue holds no invariants a panicking holder could break.
    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<CrawlRequest>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a request unless its URL is already known or the budget is spent.
    ///
    /// Forced requests (block retries) skip the URL check but still count
    /// against the budget.
    pub fn enqueue(&self, request: CrawlRequest) -> EnqueueResult {
        let mut queue = self.lock_queue();

        if !request.force && self.known_urls.contains(&request.url) {
            return EnqueueResult::Duplicate;
        }
        if self.accepted.load(Ordering::SeqCst) >= self.max_requests {
            self.budget_hit.store(true, Ordering::SeqCst);
            tracing::debug!(url = %request.url, "Request budget spent, discarding");
            return EnqueueResult::OverBudget;
        }

        self.accepted.fetch_add(1, Ordering::SeqCst);
        self.known_urls.insert(request.url.clone());
        queue.push_back(request);
        drop(queue);

        self.notify.notify_waiters();
        EnqueueResult::Accepted
    }

    /// Take the next request, marking it in flight.
    pub fn claim(&self) -> Option<CrawlRequest> {
        let mut queue = self.lock_queue();
        let request = queue.pop_front()?;
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Some(request)
    }

    /// Mark a claimed request as finished and wake idle workers.
    pub fn complete(&self) {
        // Saturating: a stray complete() must not wrap the counter.
        let _ = self
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        self.notify.notify_waiters();
    }

    /// Nothing pending and nothing in flight: the run is over.
    pub fn is_drained(&self) -> bool {
        let queue = self.lock_queue();
        queue.is_empty() && self.in_flight.load(Ordering::SeqCst) == 0
    }

    /// Future resolved on the next enqueue or completion.
    ///
    /// Call `enable()` on it before checking the queue so a notification
    /// sent in between is not lost.
    pub fn notified(&self) -> Notified<'_> {
        self.notify.notified()
    }

    /// Wake every idle worker, e.g. after cancellation.
    pub fn wake_all(&self) {
        self.notify.notify_waiters();
    }

    /// Record a job id; `true` if it had not been seen in this run.
    pub fn mark_job_seen(&self, source: SourcePlatform, job_id: &str) -> bool {
        self.seen_job_ids.insert((source, job_id.to_string()))
    }

    /// Move the cursor of a listing root forward and return where it now
    /// stands; it never moves back, so the result is the next page offset.
    pub fn advance_cursor(&self, root: &str, offset: usize) -> usize {
        let mut entry = self.pagination_cursor.entry(root.to_string()).or_insert(0);
        *entry = (*entry).max(offset);
        *entry
    }

    /// Count one more block on `url` and return the total so far.
    pub fn record_block(&self, url: &str) -> u32 {
        let mut entry = self.block_retry_count.entry(url.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    pub fn pending(&self) -> usize {
        self.lock_queue().len()
    }

    /// Whether any enqueue was refused for budget reasons.
    pub fn budget_exhausted(&self) -> bool {
        self.budget_hit.load(Ordering::SeqCst)
    }
}
