//! Dedicated worker thread for one job kind

use super::{JobOutcome, KindSlot};
use crate::core::{DispatchError, Job, JobId, JobKind, Result};
use std::any::Any;
use crate::queue::NextJob;
use log::{debug, error, trace, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

#[cfg(feature = "tracing")]
use tracing::{span, Level};

/// Lifecycle state of a worker
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkerState {
    /// Waiting for a job
    Idle,
    /// Executing a job
    Running,
    /// Shutdown requested, finishing queued work
    Draining,
    /// Loop exited
    Terminated,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Idle,
            1 => WorkerState::Running,
            2 => WorkerState::Draining,
            _ => WorkerState::Terminated,
        }
    }
}

/// Worker state readable from other threads
#[derive(Debug)]
pub struct AtomicWorkerState(AtomicU8);

impl AtomicWorkerState {
    fn new(state: WorkerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    /// Current state
    pub fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Join handle taken out of a [`Worker`]
pub(crate) struct PendingJoin {
    worker_id: usize,
    thread: thread::JoinHandle<()>,
}

impl PendingJoin {
    /// Waits for the thread to exit
    pub(crate) fn join(self) -> Result<()> {
        self.thread
            .join()
            .map_err(|_| DispatchError::join(self.worker_id, "Worker panicked"))
    }
}

/// A thread bound to one job kind, running the kind's processing loop.
pub struct Worker<K: JobKind> {
    id: usize,
    kind: K,
    state: Arc<AtomicWorkerState>,
    thread: Option<thread::JoinHandle<()>>,
}

impl<K: JobKind> std::fmt::Debug for Worker<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state.get())
            .finish()
    }
}

impl<K: JobKind> Worker<K> {
    /// Spawns a worker serving `slot`.
    ///
    /// # Arguments
    ///
    /// * `id` - Identifier unique across the dispatcher
    /// * `slot` - State of the kind this worker serves
    /// * `thread_name` - Name given to the OS thread
    /// * `stack_size` - Optional stack size for the thread
    pub fn spawn(
        id: usize,
        slot: Arc<KindSlot<K>>,
        thread_name: String,
        stack_size: Option<usize>,
    ) -> Result<Self> {
        let kind = slot.kind();
        let state = Arc::new(AtomicWorkerState::new(WorkerState::Idle));
        let thread_state = Arc::clone(&state);

        let mut builder = thread::Builder::new().name(thread_name);
        if let Some(size) = stack_size {
            builder = builder.stack_size(size);
        }

        let thread = builder
            .spawn(move || Self::run(id, slot, thread_state))
            .map_err(|e| DispatchError::spawn_with_source(id, "Cannot create worker thread", e))?;

        Ok(Self {
            id,
            kind,
            state,
            thread: Some(thread),
        })
    }

    /// Worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Kind served by this worker
    pub fn kind(&self) -> K {
        self.kind
    }

    /// Current lifecycle state
    pub fn state(&self) -> WorkerState {
        self.state.get()
    }

    /// Waits for the worker thread to exit.
    ///
    /// The worker stays readable afterwards and reports `Terminated`; joining
    /// twice is a no-op.
    pub fn join(&mut self) -> Result<()> {
        match self.take_join() {
            Some(pending) => pending.join(),
            None => Ok(()),
        }
    }

    /// Detaches the join handle so the thread can be joined without holding
    /// whatever lock guards this worker.
    pub(crate) fn take_join(&mut self) -> Option<PendingJoin> {
        self.thread.take().map(|thread| PendingJoin {
            worker_id: self.id,
            thread,
        })
    }

    /// Main worker loop.
    ///
    /// Dequeues under the kind's mutex, runs the job unlocked, then reports
    /// completion. Exits once shutdown is requested and the queue is empty.
    fn run(id: usize, slot: Arc<KindSlot<K>>, state: Arc<AtomicWorkerState>) {
        let kind_name = slot.kind().name();

        #[cfg(feature = "tracing")]
        let worker_span = span!(Level::DEBUG, "bio_worker", id = id, kind = %kind_name);
        #[cfg(feature = "tracing")]
        let _guard = worker_span.enter();

        debug!("worker {} ({}) started", id, kind_name);

        loop {
            match slot.gate().next_job(|| state.set(WorkerState::Idle)) {
                NextJob::Ready { job, draining } => {
                    state.set(if draining {
                        WorkerState::Draining
                    } else {
                        WorkerState::Running
                    });

                    Self::execute_job(id, job, &slot);

                    let remaining = slot.gate().complete_step();
                    trace!("worker {} ({}): {} jobs pending", id, kind_name, remaining);
                }
                NextJob::Terminate => break,
            }
        }

        state.set(WorkerState::Terminated);
        debug!("worker {} ({}) terminated", id, kind_name);
    }

    /// Runs one job with panic protection and records its outcome
    fn execute_job(id: usize, job: Job<K>, slot: &KindSlot<K>) {
        let job_id = job.id();

        #[cfg(feature = "tracing")]
        let job_span = span!(Level::DEBUG, "bio_job", job_id = %job_id);
        #[cfg(feature = "tracing")]
        let _job_guard = job_span.enter();

        let handler = slot.handler();
        let start = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(move || job.run(handler)));
        let elapsed = start.elapsed();

        let outcome = match result {
            Ok(Ok(())) => {
                trace!("worker {}: job {} completed in {:?}", id, job_id, elapsed);
                JobOutcome::Completed
            }
            Ok(Err(e)) => {
                warn!("worker {}: job {} failed: {}", id, job_id, e);
                JobOutcome::Failed
            }
            Err(payload) => {
                error!("worker {}: {}", id, panic_error(job_id, payload.as_ref()));
                JobOutcome::Panicked
            }
        };

        slot.stats().record_outcome(outcome, elapsed);
    }
}

/// Turns the payload of a job's panic into an `ExecutionError`
fn panic_error(job_id: JobId, payload: &(dyn Any + Send)) -> DispatchError {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    };
    DispatchError::execution(job_id.to_string(), format!("job panicked: {}", message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BackgroundJobKind, JobArgs, JobHandler};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn slot() -> Arc<KindSlot<BackgroundJobKind>> {
        Arc::new(KindSlot::new(BackgroundJobKind::Fsync, None))
    }

    #[test]
    fn test_worker_starts_idle_and_terminates() {
        let slot = slot();
        let mut worker = Worker::spawn(0, Arc::clone(&slot), "bio-test-0".to_string(), None)
            .expect("Failed to spawn worker");
        assert_eq!(worker.id(), 0);
        assert_eq!(worker.kind(), BackgroundJobKind::Fsync);

        thread::sleep(Duration::from_millis(20));
        assert_eq!(worker.state(), WorkerState::Idle);

        slot.gate().request_shutdown(false);
        worker.join().expect("Failed to join worker");
        assert_eq!(worker.state(), WorkerState::Terminated);
        worker.join().expect("second join is a no-op");
    }

    #[test]
    fn test_panic_payload_becomes_execution_error() {
        let job = Job::from_fn(BackgroundJobKind::Fsync, || Ok(()));
        let job_id = job.id();

        let payload = catch_unwind(|| panic!("fsync on closed fd")).unwrap_err();
        match panic_error(job_id, payload.as_ref()) {
            DispatchError::ExecutionError { job_id: id, message } => {
                assert_eq!(id, job_id.to_string());
                assert_eq!(message, "job panicked: fsync on closed fd");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let payload = catch_unwind(|| std::panic::panic_any(42u8)).unwrap_err();
        let err = panic_error(job_id, payload.as_ref());
        assert!(err.to_string().contains("Unknown panic"));
    }

    #[test]
    fn test_worker_runs_and_completes_jobs() {
        let slot = slot();
        let mut worker = Worker::spawn(1, Arc::clone(&slot), "bio-test-1".to_string(), None)
            .expect("Failed to spawn worker");

        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let counter = Arc::clone(&counter);
            slot.gate()
                .enqueue(Job::from_fn(BackgroundJobKind::Fsync, move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }))
                .expect("enqueue");
        }

        slot.gate().wait_drained();
        assert_eq!(counter.load(Ordering::SeqCst), 5);
        assert_eq!(slot.gate().pending(), 0);

        slot.gate().request_shutdown(false);
        worker.join().expect("Failed to join worker");
    }

    #[test]
    fn test_worker_survives_panics_and_errors() {
        let slot = slot();
        let mut worker = Worker::spawn(2, Arc::clone(&slot), "bio-test-2".to_string(), None)
            .expect("Failed to spawn worker");

        slot.gate()
            .enqueue(Job::from_fn(BackgroundJobKind::Fsync, || {
                panic!("Intentional panic for testing");
            }))
            .expect("enqueue");
        slot.gate()
            .enqueue(Job::from_fn(BackgroundJobKind::Fsync, || {
                Err(DispatchError::other("disk unavailable"))
            }))
            .expect("enqueue");
        slot.gate()
            .enqueue(Job::from_fn(BackgroundJobKind::Fsync, || Ok(())))
            .expect("enqueue");

        slot.gate().wait_drained();
        let stats = slot.stats().snapshot("fsync".to_string(), 0, 0);
        assert_eq!(stats.jobs_panicked, 1);
        assert_eq!(stats.jobs_failed, 1);
        assert_eq!(stats.jobs_completed, 1);

        slot.gate().request_shutdown(false);
        worker.join().expect("Failed to join worker");
    }

    #[test]
    fn test_worker_uses_kind_handler() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        let handler = move |_kind: BackgroundJobKind, mut args: JobArgs| -> Result<()> {
            let n = args.take::<usize>(0).unwrap_or(0);
            seen_clone.fetch_add(n, Ordering::SeqCst);
            Ok(())
        };
        let handler: Arc<dyn JobHandler<BackgroundJobKind>> = Arc::new(handler);
        let slot = Arc::new(KindSlot::new(BackgroundJobKind::CloseFile, Some(handler)));
        let mut worker = Worker::spawn(3, Arc::clone(&slot), "bio-test-3".to_string(), None)
            .expect("Failed to spawn worker");

        slot.gate()
            .enqueue(Job::new(BackgroundJobKind::CloseFile, JobArgs::new().arg(7usize)))
            .expect("enqueue");

        slot.gate().wait_drained();
        assert_eq!(seen.load(Ordering::SeqCst), 7);

        slot.gate().request_shutdown(false);
        worker.join().expect("Failed to join worker");
    }
}
