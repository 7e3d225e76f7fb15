//! Error types for the dispatcher

/// Result type for dispatcher operations
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Errors that can occur while dispatching background jobs
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DispatchError {
    /// The job kind is not part of the dispatcher's closed set of kinds
    #[error("Invalid job kind '{kind}': not registered with this dispatcher")]
    InvalidJobType {
        /// Name of the offending kind
        kind: String,
    },

    /// A job was submitted before `initialize_all` completed
    #[error("Dispatcher is not initialized")]
    NotInitialized,

    /// The dispatcher was already initialized
    #[error("Dispatcher is already initialized with {workers} workers")]
    AlreadyInitialized {
        /// Number of worker threads running
        workers: usize,
    },

    /// A job was submitted after shutdown was signaled for its kind
    #[error("Job kind '{kind}' is shutting down ({pending} jobs pending)")]
    ShuttingDown {
        /// Name of the kind
        kind: String,
        /// Jobs still pending on that kind when the submission was rejected
        pending: u64,
    },

    /// An argument-only job was submitted for a kind without a handler
    #[error("No handler registered for job kind '{kind}'")]
    NoHandler {
        /// Name of the kind
        kind: String,
    },

    /// More arguments were attached to a job than it has slots for
    #[error("A job carries at most {max} arguments")]
    TooManyArguments {
        /// Number of argument slots
        max: usize,
    },

    /// Failed to spawn a worker thread
    #[error("Failed to spawn worker thread #{worker_id}: {message}")]
    SpawnError {
        /// ID of the worker that failed to spawn
        worker_id: usize,
        /// Error message
        message: String,
        /// Source IO error
        #[source]
        source: Option<std::io::Error>,
    },

    /// Failed to join a worker thread
    #[error("Failed to join worker thread #{worker_id}: {message}")]
    JoinError {
        /// ID of the worker that failed to join
        worker_id: usize,
        /// Error message
        message: String,
    },

    /// A job panicked while executing
    #[error("Job execution failed (job_id: {job_id}): {message}")]
    ExecutionError {
        /// ID of the failed job
        job_id: String,
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration for '{parameter}': {message}")]
    InvalidConfig {
        /// Configuration parameter name
        parameter: String,
        /// Error message
        message: String,
    },

    /// General error
    #[error("{0}")]
    Other(String),
}

impl DispatchError {
    /// Create an invalid job kind error
    pub fn invalid_job_type(kind: impl Into<String>) -> Self {
        DispatchError::InvalidJobType { kind: kind.into() }
    }

    /// Create an already initialized error
    pub fn already_initialized(workers: usize) -> Self {
        DispatchError::AlreadyInitialized { workers }
    }

    /// Create a shutting down error
    pub fn shutting_down(kind: impl Into<String>, pending: u64) -> Self {
        DispatchError::ShuttingDown {
            kind: kind.into(),
            pending,
        }
    }

    /// Create a missing handler error
    pub fn no_handler(kind: impl Into<String>) -> Self {
        DispatchError::NoHandler { kind: kind.into() }
    }

    /// Create a too many arguments error
    pub fn too_many_arguments(max: usize) -> Self {
        DispatchError::TooManyArguments { max }
    }

    /// Create a spawn error with source
    pub fn spawn_with_source(
        worker_id: usize,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        DispatchError::SpawnError {
            worker_id,
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a join error
    pub fn join(worker_id: usize, message: impl Into<String>) -> Self {
        DispatchError::JoinError {
            worker_id,
            message: message.into(),
        }
    }

    /// Create an execution error
    pub fn execution(job_id: impl Into<String>, message: impl Into<String>) -> Self {
        DispatchError::ExecutionError {
            job_id: job_id.into(),
            message: message.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        DispatchError::InvalidConfig {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        DispatchError::Other(msg.into())
    }
}

/// Reports a broken synchronization contract and aborts the process.
///
/// Used for states that can only be reached through a bug in the dispatcher
/// itself, such as a pending counter going below zero.
#[cold]
pub(crate) fn invariant_violation(message: &str) -> ! {
    log::error!("dispatcher invariant violated: {}", message);
    eprintln!("[BIO_DISPATCH FATAL] invariant violated: {}", message);
    std::process::abort()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = DispatchError::already_initialized(3);
        assert!(matches!(err, DispatchError::AlreadyInitialized { workers: 3 }));

        let err = DispatchError::shutting_down("Fsync", 2);
        assert!(matches!(err, DispatchError::ShuttingDown { pending: 2, .. }));

        let err = DispatchError::execution("job_123", "disk full");
        assert!(matches!(err, DispatchError::ExecutionError { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = DispatchError::invalid_job_type("Unknown");
        assert_eq!(
            err.to_string(),
            "Invalid job kind 'Unknown': not registered with this dispatcher"
        );

        let err = DispatchError::shutting_down("CloseFile", 4);
        assert_eq!(
            err.to_string(),
            "Job kind 'CloseFile' is shutting down (4 jobs pending)"
        );

        assert_eq!(
            DispatchError::NotInitialized.to_string(),
            "Dispatcher is not initialized"
        );
    }

    #[test]
    fn test_spawn_error_with_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::WouldBlock, "no threads left");
        let err = DispatchError::spawn_with_source(2, "Cannot create thread", io_err);

        assert!(matches!(err, DispatchError::SpawnError { .. }));
        assert!(err.to_string().contains("worker thread #2"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
