//! Process-wide background job dispatcher.
//!
//! A single [`Dispatcher`] over [`BackgroundJobKind`], installed once by
//! [`init`] and shared by every caller in the process. Every other function
//! fails with [`DispatchError::NotInitialized`] until `init` has completed.
//!
//! ```rust,no_run
//! use bio_dispatch::{global, BackgroundJobKind, DispatcherConfig};
//!
//! # fn main() -> bio_dispatch::Result<()> {
//! global::init(DispatcherConfig::new())?;
//!
//! let file = std::fs::File::open("/tmp/large.log").map_err(|e| {
//!     bio_dispatch::DispatchError::other(e.to_string())
//! })?;
//! global::execute(BackgroundJobKind::CloseFile, move || {
//!     drop(file);
//!     Ok(())
//! })?;
//!
//! global::shutdown()?;
//! # Ok(())
//! # }
//! ```

use crate::core::{BackgroundJobKind, DispatchError, Job, JobArgs, Result};
use crate::dispatch::{Dispatcher, DispatcherConfig};
use std::sync::OnceLock;

static DISPATCHER: OnceLock<Dispatcher<BackgroundJobKind>> = OnceLock::new();

fn dispatcher() -> Result<&'static Dispatcher<BackgroundJobKind>> {
    match DISPATCHER.get() {
        Some(dispatcher) if dispatcher.is_initialized() => Ok(dispatcher),
        _ => Err(DispatchError::NotInitialized),
    }
}

/// Creates the process-wide dispatcher and spawns its workers.
///
/// # Errors
///
/// - `AlreadyInitialized` if a dispatcher was already installed
/// - `InvalidConfig` or `SpawnError` from the dispatcher itself
pub fn init(config: DispatcherConfig<BackgroundJobKind>) -> Result<()> {
    config.validate()?;

    let mut installed_now = false;
    let installed = DISPATCHER.get_or_init(|| {
        installed_now = true;
        Dispatcher::build(config)
    });

    if !installed_now {
        return Err(DispatchError::already_initialized(installed.num_workers()));
    }
    installed.initialize_all()
}

/// Submits a job to the process-wide dispatcher
pub fn submit(job: Job<BackgroundJobKind>) -> Result<()> {
    dispatcher()?.submit(job)
}

/// Submits a closure as a job of `kind`
pub fn execute<F>(kind: BackgroundJobKind, f: F) -> Result<()>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    dispatcher()?.execute(kind, f)
}

/// Submits an argument-only job run by the handler of `kind`
pub fn submit_args(kind: BackgroundJobKind, args: JobArgs) -> Result<()> {
    dispatcher()?.submit_args(kind, args)
}

/// Jobs of `kind` submitted but not yet finished
pub fn pending_jobs(kind: BackgroundJobKind) -> Result<u64> {
    dispatcher()?.pending_count(kind)
}

/// Blocks until no job of `kind` is queued or executing
pub fn wait_until_drained(kind: BackgroundJobKind) -> Result<()> {
    dispatcher()?.wait_until_drained(kind)
}

/// Waits for the next job of `kind` to finish and returns the pending count
pub fn wait_step(kind: BackgroundJobKind) -> Result<u64> {
    dispatcher()?.wait_step(kind)
}

/// Drains and joins every worker of the process-wide dispatcher
pub fn shutdown() -> Result<()> {
    dispatcher()?.shutdown()
}

/// Whether [`init`] has completed
pub fn is_initialized() -> bool {
    dispatcher().is_ok()
}
