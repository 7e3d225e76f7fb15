//! Job, argument slots and per-kind handlers

use crate::core::error::{DispatchError, Result};
use crate::core::kind::JobKind;
use std::any::Any;
use std::fmt;
use uuid::Uuid;

/// Unique identifier assigned to every job at construction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

const ARG_SLOTS: usize = 3;

/// An opaque argument owned by a job
pub type OpaqueArg = Box<dyn Any + Send>;

/// Up to three opaque arguments carried by a job.
///
/// Whatever is placed in the slots is owned by the job from then on and is
/// handed to the worker that executes it.
///
/// ```rust
/// use bio_dispatch::JobArgs;
///
/// let mut args = JobArgs::new().arg(String::from("/tmp/a.log")).arg(42u32);
/// assert_eq!(args.len(), 2);
/// assert_eq!(args.take::<u32>(1), Some(42));
/// ```
#[derive(Default)]
pub struct JobArgs {
    slots: [Option<OpaqueArg>; ARG_SLOTS],
}

impl JobArgs {
    /// Maximum number of argument slots
    pub const MAX_ARGS: usize = ARG_SLOTS;

    /// Creates an empty argument set
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` in the next free slot.
    ///
    /// # Panics
    ///
    /// Panics if all three slots are already occupied. Use
    /// [`try_arg`](Self::try_arg) when the argument count is not fixed.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn arg<T: Any + Send>(self, value: T) -> Self {
        match self.try_arg(value) {
            Ok(args) => args,
            Err(e) => panic!("{}", e),
        }
    }

    /// Stores `value` in the next free slot.
    ///
    /// # Errors
    ///
    /// Returns `TooManyArguments` if all three slots are already occupied.
    pub fn try_arg<T: Any + Send>(mut self, value: T) -> Result<Self> {
        let Some(slot) = self.slots.iter_mut().find(|slot| slot.is_none()) else {
            return Err(DispatchError::too_many_arguments(Self::MAX_ARGS));
        };
        *slot = Some(Box::new(value));
        Ok(self)
    }

    /// Moves the value out of `index` if it holds a `T`.
    ///
    /// Returns `None` for an empty slot, an out-of-range index, or a type
    /// mismatch; on mismatch the value stays in place.
    pub fn take<T: Any + Send>(&mut self, index: usize) -> Option<T> {
        let slot = self.slots.get_mut(index)?;
        match slot.take()?.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(original) => {
                *slot = Some(original);
                None
            }
        }
    }

    /// Returns a reference to the value at `index` if it holds a `T`
    pub fn get<T: Any + Send>(&self, index: usize) -> Option<&T> {
        self.slots.get(index)?.as_ref()?.downcast_ref::<T>()
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Whether no slot is occupied
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for JobArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let occupied: Vec<bool> = self.slots.iter().map(Option::is_some).collect();
        f.debug_struct("JobArgs").field("occupied", &occupied).finish()
    }
}

/// Executes argument-only jobs of a kind.
///
/// One handler may be registered per kind; jobs built with [`Job::new`] are
/// run by the handler of their kind.
pub trait JobHandler<K: JobKind>: Send + Sync {
    /// Runs one job of `kind`, consuming its arguments
    fn handle(&self, kind: K, args: JobArgs) -> Result<()>;
}

impl<K, F> JobHandler<K> for F
where
    K: JobKind,
    F: Fn(K, JobArgs) -> Result<()> + Send + Sync,
{
    fn handle(&self, kind: K, args: JobArgs) -> Result<()> {
        self(kind, args)
    }
}

type JobAction = Box<dyn FnOnce(JobArgs) -> Result<()> + Send + 'static>;

/// A unit of deferred work bound to a kind.
///
/// A job cannot be modified after construction. It is consumed by exactly one
/// worker of its kind.
pub struct Job<K: JobKind> {
    id: JobId,
    kind: K,
    args: JobArgs,
    action: Option<JobAction>,
}

impl<K: JobKind> Job<K> {
    /// Creates a job run by the handler registered for `kind`
    pub fn new(kind: K, args: JobArgs) -> Self {
        Self {
            id: JobId::new(),
            kind,
            args,
            action: None,
        }
    }

    /// Creates a job that runs `action` with its own arguments
    pub fn with_action<F>(kind: K, args: JobArgs, action: F) -> Self
    where
        F: FnOnce(JobArgs) -> Result<()> + Send + 'static,
    {
        Self {
            id: JobId::new(),
            kind,
            args,
            action: Some(Box::new(action)),
        }
    }

    /// Creates an argument-less job from a closure
    pub fn from_fn<F>(kind: K, f: F) -> Self
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        Self::with_action(kind, JobArgs::new(), move |_| f())
    }

    /// Job identifier
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Kind this job is routed to
    pub fn kind(&self) -> K {
        self.kind
    }

    /// Arguments carried by this job
    pub fn args(&self) -> &JobArgs {
        &self.args
    }

    /// Whether the job carries its own action
    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    /// Consumes the job, running its action or else `handler`
    pub(crate) fn run(self, handler: Option<&dyn JobHandler<K>>) -> Result<()> {
        match (self.action, handler) {
            (Some(action), _) => action(self.args),
            (None, Some(handler)) => handler.handle(self.kind, self.args),
            (None, None) => Err(DispatchError::no_handler(self.kind.name())),
        }
    }
}

impl<K: JobKind> fmt::Debug for Job<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("args", &self.args)
            .field("has_action", &self.action.is_some())
            .finish()
    }
}
