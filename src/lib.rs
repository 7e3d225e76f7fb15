//! # bio_dispatch
//!
//! Background job dispatcher: hand slow, fire-and-forget work (closing files,
//! freeing large structures, fsync) to dedicated worker threads so the caller
//! never blocks on it.
//!
//! ## Features
//!
//! - **Per-kind queues**: every job kind has its own FIFO queue and workers,
//!   so a slow kind never holds back another
//! - **Pending accounting**: a job counts as pending from submission until it
//!   finished running, which makes drain checks exact
//! - **Blocking drain**: wait for a kind to drain, or for its next job to finish
//! - **Graceful shutdown**: stop admission, drain, join every worker
//! - **Panic isolation**: a failing or panicking job is logged and counted,
//!   the worker keeps going
//!
//! ## Quick Start
//!
//! ```rust
//! use bio_dispatch::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let dispatcher = Dispatcher::new(DispatcherConfig::<BackgroundJobKind>::new())?;
//! dispatcher.initialize_all()?;
//!
//! let buffer = vec![0u8; 1 << 20];
//! dispatcher.execute(BackgroundJobKind::FreeMemory, move || {
//!     drop(buffer);
//!     Ok(())
//! })?;
//!
//! dispatcher.wait_until_drained(BackgroundJobKind::FreeMemory)?;
//! dispatcher.shutdown()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Handlers and Opaque Arguments
//!
//! ```rust
//! use bio_dispatch::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let config = DispatcherConfig::new().handler_for(
//!     BackgroundJobKind::CloseFile,
//!     |_kind: BackgroundJobKind, mut args: JobArgs| -> Result<()> {
//!         let path = args.take::<String>(0).unwrap_or_default();
//!         log::debug!("closing {}", path);
//!         Ok(())
//!     },
//! );
//!
//! let dispatcher = Dispatcher::new(config)?;
//! dispatcher.initialize_all()?;
//! dispatcher.submit_args(
//!     BackgroundJobKind::CloseFile,
//!     JobArgs::new().arg(String::from("/var/log/app.log")),
//! )?;
//! dispatcher.shutdown()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod dispatch;
pub mod global;
pub mod pool;
pub mod prelude;
pub mod queue;

pub use crate::core::{
    BackgroundJobKind, DispatchError, Job, JobArgs, JobHandler, JobId, JobKind, Result,
};
pub use dispatch::{Dispatcher, DispatcherConfig};
pub use pool::{KindStats, WorkerState};
