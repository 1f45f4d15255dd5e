//! Coordination state shared by every outline service.

use crate::events::{NoopEvents, OutlineEvents};
use crate::guard::creation::CreationGuard;
use crate::guard::parent_lock::ParentLockTable;
use crate::model::outline::{ChapterId, ParentRef};
use std::sync::Arc;

/// Lock table, creation guard and event sink.
///
/// Clones share state. Every service touching one outline store must be
/// built from clones of the same context, otherwise their per-parent
/// sections do not exclude each other.
#[derive(Clone)]
pub struct OutlineContext {
    locks: Arc<ParentLockTable<ParentRef>>,
    creation: Arc<CreationGuard<ChapterId>>,
    events: Arc<dyn OutlineEvents>,
}

impl OutlineContext {
    pub fn new() -> Self {
        Self::with_events(Arc::new(NoopEvents))
    }

    pub fn with_events(events: Arc<dyn OutlineEvents>) -> Self {
        Self {
            locks: Arc::new(ParentLockTable::new()),
            creation: Arc::new(CreationGuard::new()),
            events,
        }
    }

    pub fn locks(&self) -> &ParentLockTable<ParentRef> {
        &self.locks
    }

    pub fn creation_guard(&self) -> &CreationGuard<ChapterId> {
        &self.creation
    }

    pub fn events(&self) -> &dyn OutlineEvents {
        self.events.as_ref()
    }
}

impl Default for OutlineContext {
    fn default() -> Self {
        Self::new()
    }
}
