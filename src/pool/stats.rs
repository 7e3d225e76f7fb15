//! Per-kind statistics.
//!
//! [`AtomicKindStats`] is updated by producers and workers without taking the
//! kind's gate; [`KindStats`] is the serializable snapshot handed to callers.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Snapshot of the statistics of one job kind.
#[derive(Clone, Debug, Default, Serialize)]
pub struct KindStats {
    /// Name of the kind.
    pub kind: String,

    /// Jobs accepted by `submit`.
    pub jobs_submitted: u64,

    /// Jobs rejected because the kind was shutting down.
    pub jobs_rejected: u64,

    /// Jobs that ran and returned `Ok`.
    pub jobs_completed: u64,

    /// Jobs that ran and returned an error.
    pub jobs_failed: u64,

    /// Jobs that panicked while running.
    pub jobs_panicked: u64,

    /// Queued jobs dropped by an immediate shutdown.
    pub jobs_discarded: u64,

    /// Jobs submitted but not yet finished.
    pub pending: u64,

    /// Jobs waiting in the queue.
    pub queue_depth: usize,

    /// Average job execution time.
    pub avg_latency: Duration,

    /// Longest job execution time observed.
    pub max_latency: Duration,

    /// Total execution time of all finished jobs.
    pub total_execution_time: Duration,

    /// When the last job of this kind finished.
    pub last_completed_at: Option<DateTime<Utc>>,
}

impl KindStats {
    /// Jobs that ran, whatever their outcome
    pub fn jobs_processed(&self) -> u64 {
        self.jobs_completed + self.jobs_failed + self.jobs_panicked
    }

    /// Success rate as a percentage (0.0 to 100.0)
    pub fn success_rate(&self) -> f64 {
        let processed = self.jobs_processed();
        if processed == 0 {
            100.0
        } else {
            (self.jobs_completed as f64 / processed as f64) * 100.0
        }
    }
}

/// Outcome of a single job execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// Returned `Ok`.
    Completed,
    /// Returned an error.
    Failed,
    /// Panicked.
    Panicked,
}

/// Thread-safe statistics tracker for a job kind.
#[derive(Default)]
pub struct AtomicKindStats {
    jobs_submitted: AtomicU64,
    jobs_rejected: AtomicU64,
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
    jobs_panicked: AtomicU64,
    jobs_discarded: AtomicU64,
    latency: Mutex<LatencyTracker>,
}

impl AtomicKindStats {
    /// Creates a zeroed tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an accepted submission
    pub fn record_submission(&self) {
        self.jobs_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a submission rejected during shutdown
    pub fn record_rejection(&self) {
        self.jobs_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Records queued jobs dropped by an immediate shutdown
    pub fn record_discarded(&self, count: u64) {
        self.jobs_discarded.fetch_add(count, Ordering::Relaxed);
    }

    /// Records a finished job and how long it ran
    pub fn record_outcome(&self, outcome: JobOutcome, duration: Duration) {
        let counter = match outcome {
            JobOutcome::Completed => &self.jobs_completed,
            JobOutcome::Failed => &self.jobs_failed,
            JobOutcome::Panicked => &self.jobs_panicked,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.latency.lock().record(duration);
    }

    /// Accepted submissions so far
    pub fn jobs_submitted(&self) -> u64 {
        self.jobs_submitted.load(Ordering::Relaxed)
    }

    /// Returns a snapshot including the gate-side counters
    pub fn snapshot(&self, kind: String, pending: u64, queue_depth: usize) -> KindStats {
        let latency = self.latency.lock();
        KindStats {
            kind,
            jobs_submitted: self.jobs_submitted.load(Ordering::Relaxed),
            jobs_rejected: self.jobs_rejected.load(Ordering::Relaxed),
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            jobs_panicked: self.jobs_panicked.load(Ordering::Relaxed),
            jobs_discarded: self.jobs_discarded.load(Ordering::Relaxed),
            pending,
            queue_depth,
            avg_latency: latency.avg_latency(),
            max_latency: latency.max_latency,
            total_execution_time: latency.total_time,
            last_completed_at: latency.last_completed_at,
        }
    }
}

#[derive(Default)]
struct LatencyTracker {
    total_time: Duration,
    max_latency: Duration,
    count: u32,
    last_completed_at: Option<DateTime<Utc>>,
}

impl LatencyTracker {
    fn record(&mut self, duration: Duration) {
        self.total_time += duration;
        self.max_latency = self.max_latency.max(duration);
        self.count = self.count.saturating_add(1);
        self.last_completed_at = Some(Utc::now());
    }

    fn avg_latency(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total_time / self.count
        }
    }
}
