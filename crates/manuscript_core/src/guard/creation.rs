//! Creation admission guard and per-key usage ledger.
//!
//! State per key: `Idle -> Creating -> Idle`. A second `try_begin` while a
//! key is `Creating` is rejected; there is no waiting queue.

use crate::model::outline::SceneId;
use log::{debug, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Ledger for one guarded key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CreationState {
    pub is_creating: bool,
    pub last_created_scene_id: Option<SceneId>,
    /// Completed creations since the last reset.
    pub creation_count: u64,
    /// Epoch ms of the last begin/complete/fail.
    pub last_operation_at: Option<i64>,
}

/// Admission guard keyed by parent (chapter ids in production).
#[derive(Debug)]
pub struct CreationGuard<K> {
    states: Mutex<HashMap<K, CreationState>>,
}

impl<K> Default for CreationGuard<K> {
    fn default() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> CreationGuard<K>
where
    K: Eq + Hash + Clone + Display,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits one creation for `key`.
    ///
    /// Returns `false` when a creation for `key` is already in flight. On
    /// `true` the caller owes exactly one `complete` or `fail`.
    pub fn try_begin(&self, key: &K) -> bool {
        let mut states = self.states();
        let state = states.entry(key.clone()).or_default();
        if state.is_creating {
            debug!("event=creation_admit module=guard status=rejected key={key}");
            return false;
        }
        state.is_creating = true;
        state.last_operation_at = Some(now_epoch_ms());
        debug!("event=creation_admit module=guard status=ok key={key}");
        true
    }

    /// RAII form of `try_begin`: the ticket calls `fail` if dropped without
    /// `complete`.
    pub fn begin(&self, key: K) -> Option<CreationTicket<'_, K>> {
        if !self.try_begin(&key) {
            return None;
        }
        Some(CreationTicket {
            guard: self,
            key,
            settled: false,
        })
    }

    /// Ends an admitted creation that produced `child_id`.
    pub fn complete(&self, key: &K, child_id: SceneId) {
        let mut states = self.states();
        let state = states.entry(key.clone()).or_default();
        if !state.is_creating {
            warn!("event=creation_complete module=guard status=unbalanced key={key}");
        }
        state.is_creating = false;
        state.last_created_scene_id = Some(child_id);
        state.creation_count += 1;
        state.last_operation_at = Some(now_epoch_ms());
    }

    /// Ends an admitted creation that produced nothing.
    pub fn fail(&self, key: &K) {
        let mut states = self.states();
        let state = states.entry(key.clone()).or_default();
        if !state.is_creating {
            warn!("event=creation_fail module=guard status=unbalanced key={key}");
        }
        state.is_creating = false;
        state.last_operation_at = Some(now_epoch_ms());
    }

    /// Forgets everything about `key`. Recovery path for a stuck guard.
    pub fn reset(&self, key: &K) {
        if self.states().remove(key).is_some() {
            warn!("event=creation_reset module=guard status=ok key={key}");
        }
    }

    /// Snapshot of the ledger for `key`; defaults when never used.
    pub fn state(&self, key: &K) -> CreationState {
        self.states().get(key).cloned().unwrap_or_default()
    }

    pub fn can_create(&self, key: &K) -> bool {
        !self.states().get(key).is_some_and(|state| state.is_creating)
    }

    fn states(&self) -> MutexGuard<'_, HashMap<K, CreationState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Admission for one in-flight creation.
#[derive(Debug)]
pub struct CreationTicket<'a, K>
where
    K: Eq + Hash + Clone + Display,
{
    guard: &'a CreationGuard<K>,
    key: K,
    settled: bool,
}

impl<K> CreationTicket<'_, K>
where
    K: Eq + Hash + Clone + Display,
{
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Records `child_id` and releases the admission.
    pub fn complete(mut self, child_id: SceneId) {
        self.settled = true;
        self.guard.complete(&self.key, child_id);
    }

    /// Releases the admission without a child.
    pub fn fail(mut self) {
        self.settled = true;
        self.guard.fail(&self.key);
    }
}

impl<K> Drop for CreationTicket<'_, K>
where
    K: Eq + Hash + Clone + Display,
{
    fn drop(&mut self) {
        if !self.settled {
            self.guard.fail(&self.key);
        }
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}
