//! Core types and traits for the dispatcher

pub mod error;
pub mod job;
pub mod kind;

pub(crate) use error::invariant_violation;
pub use error::{DispatchError, Result};
pub use job::{Job, JobArgs, JobHandler, JobId, OpaqueArg};
pub use kind::{BackgroundJobKind, JobKind};
