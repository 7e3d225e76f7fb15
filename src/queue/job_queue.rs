//! FIFO job queue with pending-job accounting.

use crate::core::{Job, JobKind};
use std::collections::VecDeque;

/// Ordered, unbounded queue of jobs for a single kind.
///
/// Besides the queued jobs it tracks the pending count: jobs submitted but not
/// yet finished. A job leaves the queue when a worker dequeues it but stays
/// pending until [`complete`](Self::complete) is called after it ran, so
/// `pending() >= len()` always holds.
///
/// The queue has no interior synchronization; it lives behind the mutex of its
/// kind's [`SyncGate`](super::SyncGate).
pub struct JobQueue<K: JobKind> {
    jobs: VecDeque<Job<K>>,
    pending: u64,
}

impl<K: JobKind> Default for JobQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: JobKind> JobQueue<K> {
    /// Creates an empty queue with nothing pending
    pub fn new() -> Self {
        Self {
            jobs: VecDeque::new(),
            pending: 0,
        }
    }

    /// Appends `job` at the tail and counts it as pending
    pub fn push(&mut self, job: Job<K>) {
        self.jobs.push_back(job);
        self.pending += 1;
    }

    /// Removes the oldest job. The job remains pending.
    pub fn pop(&mut self) -> Option<Job<K>> {
        self.jobs.pop_front()
    }

    /// Marks one dequeued job as finished.
    ///
    /// Returns the remaining pending count, or `None` if nothing was pending,
    /// which means a completion was reported twice.
    #[must_use]
    pub fn complete(&mut self) -> Option<u64> {
        self.pending = self.pending.checked_sub(1)?;
        Some(self.pending)
    }

    /// Removes every queued job, releasing their pending slots.
    ///
    /// Jobs already dequeued by a worker are not affected.
    pub fn discard_queued(&mut self) -> Vec<Job<K>> {
        let discarded: Vec<Job<K>> = self.jobs.drain(..).collect();
        self.pending -= discarded.len() as u64;
        discarded
    }

    /// Number of queued jobs
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether no job is queued
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Jobs submitted but not yet finished
    pub fn pending(&self) -> u64 {
        self.pending
    }

    /// Jobs dequeued and currently executing
    pub fn in_flight(&self) -> u64 {
        self.pending - self.jobs.len() as u64
    }

    /// Whether nothing is queued or executing
    pub fn is_drained(&self) -> bool {
        self.pending == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BackgroundJobKind;

    fn job() -> Job<BackgroundJobKind> {
        Job::from_fn(BackgroundJobKind::Fsync, || Ok(()))
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = JobQueue::new();
        let first = job();
        let second = job();
        let (first_id, second_id) = (first.id(), second.id());

        queue.push(first);
        queue.push(second);

        assert_eq!(queue.pop().map(|j| j.id()), Some(first_id));
        assert_eq!(queue.pop().map(|j| j.id()), Some(second_id));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_pending_outlives_dequeue() {
        let mut queue = JobQueue::new();
        queue.push(job());
        assert_eq!(queue.pending(), 1);

        let _running = queue.pop();
        assert!(queue.is_empty());
        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.in_flight(), 1);
        assert!(!queue.is_drained());

        assert_eq!(queue.complete(), Some(0));
        assert!(queue.is_drained());
    }

    #[test]
    fn test_complete_never_underflows() {
        let mut queue: JobQueue<BackgroundJobKind> = JobQueue::new();
        assert_eq!(queue.complete(), None);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_discard_keeps_in_flight_pending() {
        let mut queue = JobQueue::new();
        for _ in 0..4 {
            queue.push(job());
        }
        let _running = queue.pop();

        let discarded = queue.discard_queued();
        assert_eq!(discarded.len(), 3);
        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.in_flight(), 1);
    }
}
