//! Per-kind job queues and the gates that guard them.
//!
//! Each job kind gets one [`SyncGate`] wrapping one [`JobQueue`]. Producers
//! append under the gate's mutex and signal its *new job* condition; workers
//! dequeue under the same mutex, run the job unlocked, then report completion
//! back through the gate. Gates of different kinds share nothing.

mod gate;
mod job_queue;

pub use gate::{NextJob, SyncGate};
pub use job_queue::JobQueue;
