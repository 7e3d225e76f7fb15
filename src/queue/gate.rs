//! Mutex and condition-variable pair guarding one kind's queue.

use super::JobQueue;
use crate::core::{invariant_violation, Job, JobKind};
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// State protected by a gate's mutex.
struct GateState<K: JobKind> {
    queue: JobQueue<K>,
    shutdown: bool,
    steps: u64,
}

/// Outcome of a worker asking its gate for work.
#[derive(Debug)]
pub enum NextJob<K: JobKind> {
    /// A job was dequeued. `draining` is set when shutdown was already
    /// requested at dequeue time.
    Ready {
        /// The dequeued job
        job: Job<K>,
        /// Whether the kind is shutting down
        draining: bool,
    },
    /// Shutdown was requested and the queue is empty.
    Terminate,
}

/// Synchronization point for one job kind.
///
/// A single mutex serializes the kind's queue, pending count, shutdown flag
/// and step counter. Two conditions hang off it:
///
/// - *new job*: signaled on every enqueue and broadcast on shutdown; workers
///   wait on it while the queue is empty
/// - *step complete*: broadcast whenever a job finishes or queued jobs are
///   discarded; drain waiters wait on it
///
/// Every wait re-checks its predicate in a loop, so spurious wakeups and
/// signals sent before the waiter arrived are both harmless.
pub struct SyncGate<K: JobKind> {
    state: Mutex<GateState<K>>,
    new_job: Condvar,
    step_done: Condvar,
}

impl<K: JobKind> Default for SyncGate<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: JobKind> SyncGate<K> {
    /// Creates an unlocked, unsignaled gate over an empty queue
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                queue: JobQueue::new(),
                shutdown: false,
                steps: 0,
            }),
            new_job: Condvar::new(),
            step_done: Condvar::new(),
        }
    }

    /// Appends `job` and wakes one waiting worker.
    ///
    /// Returns the pending count after the append. Once shutdown was requested
    /// the job is dropped and `Err` carries the pending count at rejection.
    pub fn enqueue(&self, job: Job<K>) -> std::result::Result<u64, u64> {
        let mut state = self.state.lock();
        if state.shutdown {
            return Err(state.queue.pending());
        }
        state.queue.push(job);
        self.new_job.notify_one();
        Ok(state.queue.pending())
    }

    /// Blocks until a job is available or the kind is shut down.
    ///
    /// `on_idle` runs each time the caller is about to suspend on the *new job*
    /// condition.
    pub fn next_job(&self, mut on_idle: impl FnMut()) -> NextJob<K> {
        let mut state = self.state.lock();
        while state.queue.is_empty() && !state.shutdown {
            on_idle();
            self.new_job.wait(&mut state);
        }

        match state.queue.pop() {
            Some(job) => NextJob::Ready {
                job,
                draining: state.shutdown,
            },
            None => NextJob::Terminate,
        }
    }

    /// Records that one dequeued job finished and wakes drain waiters.
    ///
    /// Returns the remaining pending count. Aborts the process if nothing was
    /// pending.
    pub fn complete_step(&self) -> u64 {
        let mut state = self.state.lock();
        let remaining = match state.queue.complete() {
            Some(remaining) => remaining,
            None => invariant_violation("pending job count underflow"),
        };
        state.steps += 1;
        self.step_done.notify_all();
        remaining
    }

    /// Flags the kind as shutting down and wakes every worker.
    ///
    /// With `discard` set, jobs still queued are removed and returned; jobs
    /// already executing are unaffected.
    pub fn request_shutdown(&self, discard: bool) -> Vec<Job<K>> {
        let mut state = self.state.lock();
        state.shutdown = true;
        let discarded = if discard {
            state.queue.discard_queued()
        } else {
            Vec::new()
        };
        self.new_job.notify_all();
        if !discarded.is_empty() {
            self.step_done.notify_all();
        }
        discarded
    }

    /// Blocks until nothing of this kind is queued or executing
    pub fn wait_drained(&self) {
        let mut state = self.state.lock();
        while !state.queue.is_drained() {
            self.step_done.wait(&mut state);
        }
    }

    /// Like [`wait_drained`](Self::wait_drained) but gives up after `timeout`.
    ///
    /// Returns whether the kind was drained.
    pub fn wait_drained_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !state.queue.is_drained() {
            if self.step_done.wait_until(&mut state, deadline).timed_out() {
                return state.queue.is_drained();
            }
        }
        true
    }

    /// Blocks until at least one more job finishes, if any is pending.
    ///
    /// Returns the pending count afterwards; returns immediately with zero
    /// when nothing is pending.
    pub fn wait_step(&self) -> u64 {
        let mut state = self.state.lock();
        let start = state.steps;
        while state.steps == start && !state.queue.is_drained() {
            self.step_done.wait(&mut state);
        }
        state.queue.pending()
    }

    /// Jobs submitted but not yet finished
    pub fn pending(&self) -> u64 {
        self.state.lock().queue.pending()
    }

    /// Jobs waiting in the queue
    pub fn queue_len(&self) -> usize {
        self.state.lock().queue.len()
    }
}
