//! Job kind definitions for per-kind dispatch.
//!
//! Every dispatcher is built over a closed set of kinds. Each kind owns exactly
//! one queue, one gate and its own dedicated workers, so a slow kind never holds
//! back another one.
//!
//! # Custom Job Kinds
//!
//! ```rust
//! use bio_dispatch::JobKind;
//!
//! #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
//! enum StorageJob {
//!     Compact,
//!     Upload,
//! }
//!
//! impl JobKind for StorageJob {
//!     fn all_variants() -> &'static [Self] {
//!         &[Self::Compact, Self::Upload]
//!     }
//! }
//! ```

use std::fmt::Debug;
use std::hash::Hash;

/// Trait for the closed set of job kinds a dispatcher routes on.
///
/// # Requirements
///
/// - `Copy`: kinds are copied into every job and every worker
/// - `Eq + Hash`: kinds index the per-kind state
/// - `Send + Sync + 'static`: kinds cross thread boundaries
/// - `Debug`: kinds appear in logs and error messages
pub trait JobKind: Copy + Clone + Eq + Hash + Send + Sync + Debug + 'static {
    /// Returns every kind of the set.
    ///
    /// The dispatcher creates one queue and one gate per entry, in this order.
    /// A kind missing from this list is rejected with `InvalidJobType`.
    fn all_variants() -> &'static [Self];

    /// Returns a human-readable name for this kind.
    ///
    /// Defaults to the `Debug` representation.
    fn name(&self) -> String {
        format!("{:?}", self)
    }
}

/// Built-in background job kinds.
///
/// - **CloseFile**: deferred close of file handles whose last close may be slow
/// - **FreeMemory**: deferred release of large structures
/// - **Fsync**: deferred flush of written data to stable storage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackgroundJobKind {
    /// Deferred file close.
    CloseFile,

    /// Deferred free of large structures.
    FreeMemory,

    /// Deferred fsync.
    Fsync,
}

impl JobKind for BackgroundJobKind {
    fn all_variants() -> &'static [Self] {
        &[Self::CloseFile, Self::FreeMemory, Self::Fsync]
    }

    fn name(&self) -> String {
        match self {
            Self::CloseFile => "close_file".to_string(),
            Self::FreeMemory => "free_memory".to_string(),
            Self::Fsync => "fsync".to_string(),
        }
    }
}
