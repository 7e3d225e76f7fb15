//! Configuration for the dispatcher.
//!
//! [`DispatcherConfig`] decides how many workers serve each kind, how their
//! threads are named and sized, and which handler runs argument-only jobs.

use crate::core::{DispatchError, JobHandler, JobKind, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Smallest stack accepted by [`DispatcherConfig::with_stack_size`].
pub const MIN_STACK_SIZE: usize = 64 * 1024;

/// Configuration for a [`Dispatcher`](crate::Dispatcher).
///
/// # Example
///
/// ```rust
/// use bio_dispatch::{BackgroundJobKind, DispatcherConfig, JobArgs, Result};
///
/// let config = DispatcherConfig::<BackgroundJobKind>::new()
///     .workers_for(BackgroundJobKind::Fsync, 2)
///     .with_thread_name_prefix("bg")
///     .with_stack_size(4 * 1024 * 1024)
///     .handler_for(
///         BackgroundJobKind::CloseFile,
///         |_kind: BackgroundJobKind, mut args: JobArgs| -> Result<()> {
///             drop(args.take::<std::fs::File>(0));
///             Ok(())
///         },
///     );
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.total_workers(), 4);
/// ```
#[derive(Clone)]
pub struct DispatcherConfig<K: JobKind> {
    /// Workers per job kind.
    pub workers_per_kind: HashMap<K, usize>,

    /// Worker count for kinds not explicitly configured.
    pub default_workers: usize,

    /// Thread name prefix.
    pub thread_name_prefix: String,

    /// Stack size of worker threads (`None` = platform default).
    pub stack_size: Option<usize>,

    handlers: HashMap<K, Arc<dyn JobHandler<K>>>,
}

impl<K: JobKind> std::fmt::Debug for DispatcherConfig<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handler_kinds: Vec<&K> = self.handlers.keys().collect();
        f.debug_struct("DispatcherConfig")
            .field("workers_per_kind", &self.workers_per_kind)
            .field("default_workers", &self.default_workers)
            .field("thread_name_prefix", &self.thread_name_prefix)
            .field("stack_size", &self.stack_size)
            .field("handlers", &handler_kinds)
            .finish()
    }
}

impl<K: JobKind> Default for DispatcherConfig<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: JobKind> DispatcherConfig<K> {
    /// Creates a configuration with one worker per kind, no handlers and the
    /// platform default stack size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            workers_per_kind: HashMap::new(),
            default_workers: 1,
            thread_name_prefix: "bio".to_string(),
            stack_size: None,
            handlers: HashMap::new(),
        }
    }

    /// Sets the worker count for a specific kind.
    ///
    /// FIFO execution order within a kind only holds with a single worker;
    /// with more, jobs still start in submission order but may overlap.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn workers_for(mut self, kind: K, count: usize) -> Self {
        self.workers_per_kind.insert(kind, count);
        self
    }

    /// Sets the worker count for unconfigured kinds.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_default_workers(mut self, count: usize) -> Self {
        self.default_workers = count;
        self
    }

    /// Sets the thread name prefix.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Sets the stack size of worker threads.
    ///
    /// Deferred frees of deeply nested structures can recurse far; raise this
    /// when jobs need more than the platform default.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Registers the handler that runs argument-only jobs of `kind`.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn handler_for<H>(mut self, kind: K, handler: H) -> Self
    where
        H: JobHandler<K> + 'static,
    {
        self.handlers.insert(kind, Arc::new(handler));
        self
    }

    /// Returns the worker count for a kind.
    pub fn get_workers_for(&self, kind: K) -> usize {
        self.workers_per_kind
            .get(&kind)
            .copied()
            .unwrap_or(self.default_workers)
    }

    /// Returns the handler registered for a kind.
    pub fn get_handler_for(&self, kind: K) -> Option<Arc<dyn JobHandler<K>>> {
        self.handlers.get(&kind).cloned()
    }

    /// Returns the total number of workers across all kinds.
    pub fn total_workers(&self) -> usize {
        K::all_variants()
            .iter()
            .map(|k| self.get_workers_for(*k))
            .sum()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        for kind in K::all_variants() {
            if self.get_workers_for(*kind) == 0 {
                return Err(DispatchError::invalid_config(
                    "workers_per_kind",
                    format!("worker count for {:?} must be greater than 0", kind),
                ));
            }
        }

        let known = |k: &&K| K::all_variants().contains(*k);
        if let Some(kind) = self.workers_per_kind.keys().find(|k| !known(k)) {
            return Err(DispatchError::invalid_config(
                "workers_per_kind",
                format!("{:?} is not one of the dispatcher's kinds", kind),
            ));
        }
        if let Some(kind) = self.handlers.keys().find(|k| !known(k)) {
            return Err(DispatchError::invalid_config(
                "handlers",
                format!("{:?} is not one of the dispatcher's kinds", kind),
            ));
        }

        if let Some(size) = self.stack_size {
            if size < MIN_STACK_SIZE {
                return Err(DispatchError::invalid_config(
                    "stack_size",
                    format!("stack size must be at least {} bytes, got {}", MIN_STACK_SIZE, size),
                ));
            }
        }

        if self.thread_name_prefix.contains('\0') {
            return Err(DispatchError::invalid_config(
                "thread_name_prefix",
                "thread names cannot contain NUL bytes",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BackgroundJobKind, JobArgs};

    #[test]
    fn test_default_config() {
        let config = DispatcherConfig::<BackgroundJobKind>::new();
        assert_eq!(config.default_workers, 1);
        assert_eq!(config.thread_name_prefix, "bio");
        assert_eq!(config.stack_size, None);
        assert_eq!(config.total_workers(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_workers_for() {
        let config =
            DispatcherConfig::<BackgroundJobKind>::new().workers_for(BackgroundJobKind::Fsync, 3);
        assert_eq!(config.get_workers_for(BackgroundJobKind::Fsync), 3);
        assert_eq!(config.get_workers_for(BackgroundJobKind::CloseFile), 1);
        assert_eq!(config.total_workers(), 5);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = DispatcherConfig::<BackgroundJobKind>::new()
            .workers_for(BackgroundJobKind::FreeMemory, 0);
        assert!(matches!(
            config.validate(),
            Err(DispatchError::InvalidConfig { .. })
        ));

        let config = DispatcherConfig::<BackgroundJobKind>::new().with_default_workers(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_small_stack_rejected() {
        let config = DispatcherConfig::<BackgroundJobKind>::new().with_stack_size(1024);
        assert!(config.validate().is_err());

        let config = DispatcherConfig::<BackgroundJobKind>::new().with_stack_size(MIN_STACK_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_handler_registration() {
        let config = DispatcherConfig::<BackgroundJobKind>::new()
            .handler_for(
                BackgroundJobKind::Fsync,
                |_kind: BackgroundJobKind, _args: JobArgs| -> Result<()> { Ok(()) },
            );

        assert!(config.get_handler_for(BackgroundJobKind::Fsync).is_some());
        assert!(config.get_handler_for(BackgroundJobKind::CloseFile).is_none());
        assert!(format!("{:?}", config).contains("Fsync"));
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum Narrow {
        Kept,
        Dropped,
    }

    impl JobKind for Narrow {
        fn all_variants() -> &'static [Self] {
            &[Self::Kept]
        }
    }

    #[test]
    fn test_unknown_kinds_name_their_parameter() {
        let config = DispatcherConfig::<Narrow>::new().workers_for(Narrow::Dropped, 2);
        match config.validate() {
            Err(DispatchError::InvalidConfig { parameter, .. }) => {
                assert_eq!(parameter, "workers_per_kind")
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let config = DispatcherConfig::<Narrow>::new().handler_for(
            Narrow::Dropped,
            |_kind: Narrow, _args: JobArgs| -> Result<()> { Ok(()) },
        );
        match config.validate() {
            Err(DispatchError::InvalidConfig { parameter, message }) => {
                assert_eq!(parameter, "handlers");
                assert!(message.contains("Dropped"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
