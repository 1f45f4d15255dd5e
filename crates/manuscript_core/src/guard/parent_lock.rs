//! Keyed exclusive sections.

use log::trace;
use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Table of exclusive sections keyed by parent.
///
/// Keys not currently held cost nothing; the table only stores held keys.
#[derive(Debug)]
pub struct ParentLockTable<K> {
    held: Mutex<HashSet<K>>,
    released: Condvar,
}

impl<K> Default for ParentLockTable<K> {
    fn default() -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
        }
    }
}

impl<K> ParentLockTable<K>
where
    K: Eq + Hash + Clone + Display,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until `key` is free, then holds it until the returned guard drops.
    pub fn lock(&self, key: K) -> ParentLock<'_, K> {
        self.lock_all([key])
    }

    /// Blocks until every key is free, then holds all of them at once.
    ///
    /// Duplicate keys are collapsed.
    pub fn lock_all(&self, keys: impl IntoIterator<Item = K>) -> ParentLock<'_, K> {
        let mut keys: Vec<K> = keys.into_iter().collect();
        dedup_keys(&mut keys);

        let mut held = self.held_set();
        while keys.iter().any(|key| held.contains(key)) {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        for key in &keys {
            trace!("event=parent_lock module=guard status=acquired key={key}");
            held.insert(key.clone());
        }
        ParentLock { table: self, keys }
    }

    /// Takes `key` only if it is free right now.
    pub fn try_lock(&self, key: K) -> Option<ParentLock<'_, K>> {
        let mut held = self.held_set();
        if held.contains(&key) {
            return None;
        }
        held.insert(key.clone());
        Some(ParentLock {
            table: self,
            keys: vec![key],
        })
    }

    pub fn is_locked(&self, key: &K) -> bool {
        self.held_set().contains(key)
    }

    fn held_set(&self) -> MutexGuard<'_, HashSet<K>> {
        // The set is only mutated by insert/remove, which cannot leave it
        // half-updated, so a poisoned lock still guards consistent data.
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Held exclusive section over one or more parents.
#[derive(Debug)]
pub struct ParentLock<'a, K>
where
    K: Eq + Hash + Clone + Display,
{
    table: &'a ParentLockTable<K>,
    keys: Vec<K>,
}

impl<K> ParentLock<'_, K>
where
    K: Eq + Hash + Clone + Display,
{
    pub fn keys(&self) -> &[K] {
        &self.keys
    }
}

impl<K> Drop for ParentLock<'_, K>
where
    K: Eq + Hash + Clone + Display,
{
    fn drop(&mut self) {
        let mut held = self.table.held_set();
        for key in &self.keys {
            held.remove(key);
            trace!("event=parent_lock module=guard status=released key={key}");
        }
        drop(held);
        self.table.released.notify_all();
    }
}

fn dedup_keys<K: PartialEq>(keys: &mut Vec<K>) {
    let mut index = 0;
    while index < keys.len() {
        if keys[..index].contains(&keys[index]) {
            keys.remove(index);
        } else {
            index += 1;
        }
    }
}
