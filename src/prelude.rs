//! Convenient re-exports for common types and traits

pub use crate::core::{
    BackgroundJobKind, DispatchError, Job, JobArgs, JobHandler, JobKind, Result,
};
pub use crate::dispatch::{Dispatcher, DispatcherConfig};
pub use crate::pool::{KindStats, WorkerState};
