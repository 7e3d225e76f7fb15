//! Worker threads, per-kind state and statistics

mod slot;
mod stats;
mod worker;

pub use slot::KindSlot;
pub use stats::{AtomicKindStats, JobOutcome, KindStats};
pub(crate) use worker::PendingJoin;
pub use worker::{AtomicWorkerState, Worker, WorkerState};
