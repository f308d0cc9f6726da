//! The fingerprint-to-task table backing a [`crate::cache::Cache`].
//!
//! A thin, typed wrapper around `dashmap::DashMap` rather than the `RwLock<HashMap>`
//! pattern the synchronous side of the workspace uses elsewhere: tasks are read and
//! replaced far more often than the map itself is iterated, which is exactly
//! `DashMap`'s sweet spot (sharded locking, no single global writer lock).

use crate::task::Task;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Concurrent store mapping a fingerprint to its tracked [`Task`].
pub struct Store<I, O, E> {
    map: DashMap<String, Arc<Task<I, O, E>>>,
}

impl<I, O, E> Store<I, O, E> {
    pub fn new() -> Self {
        Self { map: DashMap::new() }
    }

    /// Fetch the task for `fingerprint`, if any, regardless of its status.
    pub fn get(&self, fingerprint: &str) -> Option<Arc<Task<I, O, E>>> {
        self.map.get(fingerprint).map(|e| e.value().clone())
    }

    /// Insert `task`, unconditionally replacing whatever was there. Returns the
    /// replaced task, if any.
    pub fn insert(&self, fingerprint: String, task: Arc<Task<I, O, E>>) -> Option<Arc<Task<I, O, E>>> {
        self.map.insert(fingerprint, task)
    }

    /// Insert `task` only if no entry currently exists for `fingerprint`. Returns the
    /// task now stored under that key: either the one just inserted, or whichever
    /// task a concurrent caller won the race with.
    pub fn insert_if_absent(
        &self,
        fingerprint: String,
        task: Arc<Task<I, O, E>>,
    ) -> (Arc<Task<I, O, E>>, bool) {
        match self.map.entry(fingerprint) {
            Entry::Occupied(e) => (e.get().clone(), false),
            Entry::Vacant(e) => {
                e.insert(task.clone());
                (task, true)
            }
        }
    }

    /// Remove the task stored under `fingerprint`, if any.
    pub fn remove(&self, fingerprint: &str) -> Option<Arc<Task<I, O, E>>> {
        self.map.remove(fingerprint).map(|(_, v)| v)
    }

    /// Remove `fingerprint` only if it currently maps to `task` (identity compared
    /// via pointer equality), avoiding a race where a newer task for the same
    /// fingerprint gets deleted out from under a concurrent `set`/`get`.
    pub fn remove_if_same(&self, fingerprint: &str, task: &Arc<Task<I, O, E>>) -> bool {
        match self.map.entry(fingerprint.to_string()) {
            Entry::Occupied(e) if Arc::ptr_eq(e.get(), task) => {
                e.remove();
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.map.contains_key(fingerprint)
    }

    pub fn clear(&self) {
        self.map.clear();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Snapshot of every fingerprint currently stored, regardless of status.
    pub fn keys(&self) -> Vec<String> {
        self.map.iter().map(|e| e.key().clone()).collect()
    }

    /// Snapshot of every (fingerprint, task) pair currently stored.
    pub fn snapshot(&self) -> Vec<(String, Arc<Task<I, O, E>>)> {
        self.map
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }
}

impl<I, O, E> Default for Store<I, O, E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CachePolicy;

    fn task(v: i32) -> Arc<Task<i32, i32, String>> {
        Arc::new(Task::new(v, CachePolicy::default()))
    }

    #[test]
    fn insert_and_get_roundtrip() {
        let store: Store<i32, i32, String> = Store::new();
        store.insert("a".to_string(), task(1));
        assert!(store.get("a").is_some());
        assert!(store.get("b").is_none());
    }

    #[test]
    fn insert_if_absent_only_wins_once() {
        let store: Store<i32, i32, String> = Store::new();
        let t1 = task(1);
        let (winner1, inserted1) = store.insert_if_absent("a".to_string(), t1.clone());
        assert!(inserted1);
        assert!(Arc::ptr_eq(&winner1, &t1));

        let t2 = task(2);
        let (winner2, inserted2) = store.insert_if_absent("a".to_string(), t2);
        assert!(!inserted2);
        assert!(Arc::ptr_eq(&winner2, &t1));
    }

    #[test]
    fn remove_if_same_is_identity_gated() {
        let store: Store<i32, i32, String> = Store::new();
        let t1 = task(1);
        store.insert("a".to_string(), t1.clone());
        let t2 = task(2);
        assert!(!store.remove_if_same("a", &t2));
        assert!(store.remove_if_same("a", &t1));
        assert!(store.get("a").is_none());
    }

    #[test]
    fn clear_empties_the_store() {
        let store: Store<i32, i32, String> = Store::new();
        store.insert("a".to_string(), task(1));
        store.insert("b".to_string(), task(2));
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn keys_snapshot_reflects_contents() {
        let store: Store<i32, i32, String> = Store::new();
        store.insert("a".to_string(), task(1));
        store.insert("b".to_string(), task(2));
        let mut keys = store.keys();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }
}
