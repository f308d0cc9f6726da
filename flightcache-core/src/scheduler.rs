//! Admission control: which queued tasks get to start fetching right now.
//!
//! Deliberately untyped over `I`/`O`/`E` — the scheduler only ever deals in
//! fingerprints and counts. The caller supplies a closure that actually attempts to
//! start a task (a CAS against [`crate::task::Task::begin`]), so a fingerprint that
//! turns out to be gone or already started doesn't consume a concurrency slot.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

/// FIFO admission queue with an optional concurrency cap.
pub struct Scheduler {
    pending: Mutex<VecDeque<String>>,
    running: AtomicUsize,
    concurrency_limit: usize,
    peak_concurrency: AtomicUsize,
}

impl Scheduler {
    /// `concurrency_limit == 0` means unlimited concurrency.
    pub fn new(concurrency_limit: usize) -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            running: AtomicUsize::new(0),
            concurrency_limit,
            peak_concurrency: AtomicUsize::new(0),
        }
    }

    /// Enqueue a fingerprint for later admission. Tasks are enqueued in creation
    /// order, which is already the tiebreak the admission order wants: a freshly
    /// queued task has a use count of zero, so creation-time FIFO and
    /// creation-time-then-inverse-use-count sort identically for anything that
    /// hasn't been read yet.
    pub fn enqueue(&self, fingerprint: String) {
        self.pending.lock().push_back(fingerprint);
    }

    /// Admit as many pending fingerprints as the concurrency cap currently allows.
    ///
    /// `try_start` is called once per candidate fingerprint and must attempt to
    /// transition the underlying task into RUNNING, returning whether it won that
    /// race. A fingerprint that fails (already started elsewhere, or its task was
    /// deleted) is dropped from the queue without consuming a concurrency slot, and
    /// admission keeps pulling from the queue.
    ///
    /// Safe to call repeatedly and reentrantly: each call only admits what capacity
    /// allows at that instant and never blocks.
    pub fn admit(&self, try_start: impl Fn(&str) -> bool) -> Vec<String> {
        let mut admitted = Vec::new();
        let mut pending = self.pending.lock();
        loop {
            if self.concurrency_limit != 0
                && self.running.load(Ordering::Relaxed) >= self.concurrency_limit
            {
                break;
            }
            let fingerprint = match pending.pop_front() {
                Some(fp) => fp,
                None => break,
            };
            if !try_start(&fingerprint) {
                continue;
            }
            let running = self.running.fetch_add(1, Ordering::AcqRel) + 1;
            self.peak_concurrency.fetch_max(running, Ordering::Relaxed);
            admitted.push(fingerprint);
        }
        admitted
    }

    /// Release a concurrency slot held by a task that just finished (resolved,
    /// errored, or timed out).
    pub fn on_complete(&self) {
        self.running.fetch_sub(1, Ordering::AcqRel);
    }

    /// Account for a task that started running outside the normal admit path (a
    /// cache seeded directly with an in-flight future). Bumps the running count and
    /// peak watermark exactly as `admit` would; the matching `on_complete` call when
    /// that future finishes releases the slot as usual.
    pub fn mark_externally_running(&self) {
        let running = self.running.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_concurrency.fetch_max(running, Ordering::Relaxed);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn running_count(&self) -> usize {
        self.running.load(Ordering::Relaxed)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak_concurrency.load(Ordering::Relaxed)
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Drop every pending fingerprint, e.g. on `clear()`. Tasks already RUNNING are
    /// unaffected; there is no cancellation.
    pub fn clear(&self) {
        self.pending.lock().clear();
    }
}
