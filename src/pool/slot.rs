//! Per-kind state shared between the dispatcher and the kind's workers.

use super::AtomicKindStats;
use crate::core::{JobHandler, JobKind};
use crate::queue::SyncGate;
use std::sync::Arc;

/// Everything owned by one job kind: its gate (queue, pending count and
/// conditions), its statistics and its optional handler.
///
/// Created once per kind when the dispatcher is built and never replaced.
pub struct KindSlot<K: JobKind> {
    kind: K,
    gate: SyncGate<K>,
    stats: AtomicKindStats,
    handler: Option<Arc<dyn JobHandler<K>>>,
}

impl<K: JobKind> KindSlot<K> {
    pub(crate) fn new(kind: K, handler: Option<Arc<dyn JobHandler<K>>>) -> Self {
        Self {
            kind,
            gate: SyncGate::new(),
            stats: AtomicKindStats::new(),
            handler,
        }
    }

    /// Kind served by this slot
    pub fn kind(&self) -> K {
        self.kind
    }

    /// Gate guarding the kind's queue
    pub fn gate(&self) -> &SyncGate<K> {
        &self.gate
    }

    /// Statistics of the kind
    pub fn stats(&self) -> &AtomicKindStats {
        &self.stats
    }

    /// Handler for argument-only jobs, if one was registered
    pub fn handler(&self) -> Option<&dyn JobHandler<K>> {
        self.handler.as_deref()
    }
}

impl<K: JobKind> std::fmt::Debug for KindSlot<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindSlot")
            .field("kind", &self.kind)
            .field("pending", &self.gate.pending())
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}
