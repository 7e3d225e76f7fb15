//! Dispatcher and lifecycle management.
//!
//! [`Dispatcher`] owns one [`KindSlot`] per job kind and the workers bound to
//! them. It admits jobs, answers pending/drain queries and runs the shutdown
//! protocol.

use super::DispatcherConfig;
use crate::core::{DispatchError, Job, JobArgs, JobKind, Result};
use crate::pool::{KindSlot, KindStats, PendingJoin, Worker, WorkerState};
use log::{info, trace, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of a dispatcher. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
enum Lifecycle {
    Created = 0,
    Starting = 1,
    Running = 2,
    ShuttingDown = 3,
    Terminated = 4,
}

impl Lifecycle {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Lifecycle::Created,
            1 => Lifecycle::Starting,
            2 => Lifecycle::Running,
            3 => Lifecycle::ShuttingDown,
            _ => Lifecycle::Terminated,
        }
    }
}

/// Background job dispatcher with dedicated workers per job kind.
///
/// Per-kind state (queue, pending count, gate) is created in [`new`](Self::new)
/// and never recreated; [`initialize_all`](Self::initialize_all) spawns the
/// workers and opens admission.
///
/// # Shutdown policy
///
/// [`shutdown`](Self::shutdown) flags every kind under its mutex. Jobs accepted
/// before the flag all run to completion; later submissions are rejected with
/// [`DispatchError::ShuttingDown`]. [`shutdown_now`](Self::shutdown_now) is
/// the only operation that drops accepted jobs, and only those still queued.
///
/// # Example
///
/// ```rust
/// use bio_dispatch::{BackgroundJobKind, Dispatcher, DispatcherConfig};
///
/// # fn main() -> bio_dispatch::Result<()> {
/// let dispatcher = Dispatcher::new(DispatcherConfig::<BackgroundJobKind>::new())?;
/// dispatcher.initialize_all()?;
///
/// dispatcher.execute(BackgroundJobKind::Fsync, || {
///     // flush something to disk
///     Ok(())
/// })?;
///
/// dispatcher.wait_until_drained(BackgroundJobKind::Fsync)?;
/// assert_eq!(dispatcher.pending_count(BackgroundJobKind::Fsync)?, 0);
///
/// dispatcher.shutdown()?;
/// # Ok(())
/// # }
/// ```
pub struct Dispatcher<K: JobKind> {
    config: DispatcherConfig<K>,
    index: HashMap<K, usize>,
    slots: Vec<Arc<KindSlot<K>>>,
    workers: Mutex<Vec<Worker<K>>>,
    lifecycle: AtomicU8,
}

impl<K: JobKind> std::fmt::Debug for Dispatcher<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("lifecycle", &self.lifecycle())
            .field("slots", &self.slots)
            .finish()
    }
}

impl<K: JobKind> Dispatcher<K> {
    /// Creates a dispatcher and the per-kind state for every kind.
    ///
    /// No thread is started until [`initialize_all`](Self::initialize_all).
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: DispatcherConfig<K>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Builds the per-kind state from an already validated configuration
    pub(crate) fn build(config: DispatcherConfig<K>) -> Self {
        let mut index = HashMap::new();
        let mut slots = Vec::new();
        for kind in K::all_variants() {
            if index.contains_key(kind) {
                continue;
            }
            index.insert(*kind, slots.len());
            slots.push(Arc::new(KindSlot::new(*kind, config.get_handler_for(*kind))));
        }

        Self {
            config,
            index,
            slots,
            workers: Mutex::new(Vec::new()),
            lifecycle: AtomicU8::new(Lifecycle::Created as u8),
        }
    }

    /// Spawns the workers of every kind and starts accepting jobs.
    ///
    /// # Errors
    ///
    /// - `AlreadyInitialized` if called more than once
    /// - `SpawnError` if a worker thread cannot be created; workers spawned
    ///   so far are stopped and joined and the dispatcher stays closed
    pub fn initialize_all(&self) -> Result<()> {
        if self
            .transition(Lifecycle::Created, Lifecycle::Starting)
            .is_err()
        {
            return Err(DispatchError::already_initialized(self.num_workers()));
        }

        let mut workers = Vec::with_capacity(self.config.total_workers());
        for slot in &self.slots {
            let kind = slot.kind();
            for n in 0..self.config.get_workers_for(kind) {
                let thread_name = format!("{}-{}-{}", self.config.thread_name_prefix, kind.name(), n);
                let spawned = Worker::spawn(
                    workers.len(),
                    Arc::clone(slot),
                    thread_name,
                    self.config.stack_size,
                );
                match spawned {
                    Ok(worker) => workers.push(worker),
                    Err(e) => {
                        warn!("failed to spawn worker for {}: {}", kind.name(), e);
                        for slot in &self.slots {
                            slot.gate().request_shutdown(false);
                        }
                        Self::join_all(workers.iter_mut().filter_map(Worker::take_join));
                        self.set_lifecycle(Lifecycle::Terminated);
                        return Err(e);
                    }
                }
            }
        }

        let total = workers.len();
        *self.workers.lock() = workers;
        // Nothing else leaves Starting, so this cannot fail.
        let started = self.transition(Lifecycle::Starting, Lifecycle::Running);
        debug_assert!(started.is_ok(), "lifecycle left Starting during initialization");
        info!(
            "dispatcher initialized: {} kinds, {} workers",
            self.slots.len(),
            total
        );
        Ok(())
    }

    /// Submits a job to the queue of its kind.
    ///
    /// Returns as soon as the job is queued; it does not wait for execution.
    ///
    /// # Errors
    ///
    /// - `InvalidJobType` if the job's kind is not part of the dispatcher
    /// - `NotInitialized` before [`initialize_all`](Self::initialize_all)
    /// - `NoHandler` for an argument-only job whose kind has no handler
    /// - `ShuttingDown` once shutdown was signaled for the kind
    pub fn submit(&self, job: Job<K>) -> Result<()> {
        let kind = job.kind();
        let slot = self.slot(kind)?;

        match self.lifecycle() {
            Lifecycle::Created | Lifecycle::Starting => return Err(DispatchError::NotInitialized),
            Lifecycle::Terminated => {
                slot.stats().record_rejection();
                return Err(DispatchError::shutting_down(kind.name(), slot.gate().pending()));
            }
            Lifecycle::Running | Lifecycle::ShuttingDown => {}
        }

        if !job.has_action() && slot.handler().is_none() {
            return Err(DispatchError::no_handler(kind.name()));
        }

        let job_id = job.id();
        match slot.gate().enqueue(job) {
            Ok(pending) => {
                slot.stats().record_submission();
                trace!("job {} queued on {} ({} pending)", job_id, kind.name(), pending);
                Ok(())
            }
            Err(pending) => {
                slot.stats().record_rejection();
                Err(DispatchError::shutting_down(kind.name(), pending))
            }
        }
    }

    /// Submits a closure as a job of `kind`
    pub fn execute<F>(&self, kind: K, f: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.submit(Job::from_fn(kind, f))
    }

    /// Submits an argument-only job run by the handler of `kind`
    pub fn submit_args(&self, kind: K, args: JobArgs) -> Result<()> {
        self.submit(Job::new(kind, args))
    }

    /// Jobs of `kind` submitted but not yet finished.
    ///
    /// The value may be stale as soon as it is returned; use
    /// [`wait_until_drained`](Self::wait_until_drained) for decisions.
    pub fn pending_count(&self, kind: K) -> Result<u64> {
        Ok(self.slot(kind)?.gate().pending())
    }

    /// Jobs pending across all kinds
    pub fn total_pending(&self) -> u64 {
        self.slots.iter().map(|s| s.gate().pending()).sum()
    }

    /// Jobs of `kind` waiting in its queue
    pub fn queue_depth(&self, kind: K) -> Result<usize> {
        Ok(self.slot(kind)?.gate().queue_len())
    }

    /// Blocks until no job of `kind` is queued or executing.
    ///
    /// Must not be called from a job of the same kind: that job is itself
    /// pending, so the wait could never end.
    pub fn wait_until_drained(&self, kind: K) -> Result<()> {
        self.slot(kind)?.gate().wait_drained();
        Ok(())
    }

    /// Like [`wait_until_drained`](Self::wait_until_drained) with a deadline.
    ///
    /// Returns whether the kind drained within `timeout`.
    pub fn wait_until_drained_timeout(&self, kind: K, timeout: Duration) -> Result<bool> {
        Ok(self.slot(kind)?.gate().wait_drained_timeout(timeout))
    }

    /// Blocks until every kind is drained, one kind at a time
    pub fn wait_all_drained(&self) {
        for slot in &self.slots {
            slot.gate().wait_drained();
        }
    }

    /// Waits for the next job of `kind` to finish, if any is pending.
    ///
    /// Returns the number of jobs still pending afterwards.
    pub fn wait_step(&self, kind: K) -> Result<u64> {
        Ok(self.slot(kind)?.gate().wait_step())
    }

    /// Stops admission, lets every worker drain its queue, and joins them.
    ///
    /// Calling it again, or concurrently, returns without waiting.
    pub fn shutdown(&self) -> Result<()> {
        self.stop(false).map(|_| ())
    }

    /// Stops admission and drops jobs still queued.
    ///
    /// Jobs already executing finish normally. Returns the number of queued
    /// jobs that were discarded.
    pub fn shutdown_now(&self) -> Result<usize> {
        self.stop(true)
    }

    fn stop(&self, discard: bool) -> Result<usize> {
        match self.transition(Lifecycle::Running, Lifecycle::ShuttingDown) {
            Ok(()) => {}
            Err(Lifecycle::Created) => {
                // initialize_all may claim Created first; then it is Starting.
                return match self.transition(Lifecycle::Created, Lifecycle::Terminated) {
                    Ok(()) => {
                        for slot in &self.slots {
                            slot.gate().request_shutdown(false);
                        }
                        Ok(0)
                    }
                    Err(Lifecycle::Starting) => Err(DispatchError::NotInitialized),
                    Err(_) => Ok(0),
                };
            }
            Err(Lifecycle::Starting) => return Err(DispatchError::NotInitialized),
            Err(_) => return Ok(0),
        }

        info!("dispatcher shutting down (discard queued: {})", discard);

        let mut discarded = 0;
        for slot in &self.slots {
            let dropped = slot.gate().request_shutdown(discard);
            if !dropped.is_empty() {
                warn!(
                    "discarded {} queued jobs of {}",
                    dropped.len(),
                    slot.kind().name()
                );
                slot.stats().record_discarded(dropped.len() as u64);
                discarded += dropped.len();
            }
        }

        // Workers stay listed while they drain so their states remain visible.
        let joins: Vec<_> = self
            .workers
            .lock()
            .iter_mut()
            .filter_map(Worker::take_join)
            .collect();
        let first_error = Self::join_all(joins);
        self.workers.lock().clear();

        self.set_lifecycle(Lifecycle::Terminated);
        info!("dispatcher terminated");

        match first_error {
            Some(e) => Err(e),
            None => Ok(discarded),
        }
    }

    /// Whether [`initialize_all`](Self::initialize_all) completed
    pub fn is_initialized(&self) -> bool {
        !matches!(self.lifecycle(), Lifecycle::Created | Lifecycle::Starting)
    }

    /// Whether jobs are being accepted
    pub fn is_running(&self) -> bool {
        self.lifecycle() == Lifecycle::Running
    }

    /// Number of worker threads, including those still draining during shutdown
    pub fn num_workers(&self) -> usize {
        self.workers.lock().len()
    }

    /// States of the workers bound to `kind`
    pub fn worker_states(&self, kind: K) -> Result<Vec<WorkerState>> {
        self.slot(kind)?;
        Ok(self
            .workers
            .lock()
            .iter()
            .filter(|w| w.kind() == kind)
            .map(|w| w.state())
            .collect())
    }

    /// Statistics snapshot for `kind`
    pub fn kind_stats(&self, kind: K) -> Result<KindStats> {
        Ok(Self::snapshot(self.slot(kind)?))
    }

    /// Statistics snapshots for every kind
    pub fn all_stats(&self) -> HashMap<K, KindStats> {
        self.slots
            .iter()
            .map(|slot| (slot.kind(), Self::snapshot(slot)))
            .collect()
    }

    /// Returns the configuration
    pub fn config(&self) -> &DispatcherConfig<K> {
        &self.config
    }

    /// Joins every thread, logging failures, and returns the first error
    fn join_all(joins: impl IntoIterator<Item = PendingJoin>) -> Option<DispatchError> {
        let mut first_error = None;
        for pending in joins {
            if let Err(e) = pending.join() {
                warn!("{}", e);
                first_error.get_or_insert(e);
            }
        }
        first_error
    }

    fn snapshot(slot: &KindSlot<K>) -> KindStats {
        slot.stats().snapshot(
            slot.kind().name(),
            slot.gate().pending(),
            slot.gate().queue_len(),
        )
    }

    fn slot(&self, kind: K) -> Result<&Arc<KindSlot<K>>> {
        self.index
            .get(&kind)
            .map(|&i| &self.slots[i])
            .ok_or_else(|| DispatchError::invalid_job_type(kind.name()))
    }

    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_u8(self.lifecycle.load(Ordering::Acquire))
    }

    fn set_lifecycle(&self, state: Lifecycle) {
        self.lifecycle.store(state as u8, Ordering::Release);
    }

    /// Moves from `from` to `to`, or returns the state actually found
    fn transition(&self, from: Lifecycle, to: Lifecycle) -> std::result::Result<(), Lifecycle> {
        self.lifecycle
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(Lifecycle::from_u8)
    }
}

impl<K: JobKind> Drop for Dispatcher<K> {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(e) = self.shutdown() {
                log::error!("failed to shut down dispatcher during drop: {}", e);
            }
        }
    }
}
