//! In-memory keyed store shared between scheduled ticks and readers.
//!
//! The registry is append-only for new ids: `insert_new` never replaces an
//! existing record. Records change only through `update`/`update_all`, which
//! the engine ticks call. Reads hand out clones and never touch the map.
//!
//! Records are kept in key order, so `update_all` visits them in the same
//! sequence on every run. Engines draw randomness inside that loop, which is
//! what makes a seeded simulation replayable.

use parking_lot::RwLock;
use std::collections::BTreeMap;

pub struct Registry<K, V> {
    entries: RwLock<BTreeMap<K, V>>,
}

impl<K, V> Default for Registry<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Registry<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Inserts `value` under `key` unless the key is already taken.
    ///
    /// Returns `false` (and leaves the stored record untouched) on collision.
    pub fn insert_new(&self, key: K, value: V) -> bool {
        let mut entries = self.entries.write();
        if entries.contains_key(&key) {
            return false;
        }
        entries.insert(key, value);
        true
    }

    /// Inserts `value` unless the key is taken or an existing record
    /// `conflicts` with it. The check and the insert share one write lock.
    pub fn insert_unless(&self, key: K, value: V, conflicts: impl Fn(&V) -> bool) -> bool {
        let mut entries = self.entries.write();
        if entries.contains_key(&key) || entries.values().any(|existing| conflicts(existing)) {
            return false;
        }
        entries.insert(key, value);
        true
    }

    /// Drops every record for which `keep` returns false; returns how many went.
    pub fn retain(&self, mut keep: impl FnMut(&V) -> bool) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, v| keep(v));
        before - entries.len()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.read().get(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Mutates one record in place, returning whatever `f` returns.
    pub fn update<R>(&self, key: &K, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        self.entries.write().get_mut(key).map(f)
    }

    /// Mutates every record in key order; returns how many were visited.
    pub fn update_all(&self, mut f: impl FnMut(&mut V)) -> usize {
        let mut entries = self.entries.write();
        for value in entries.values_mut() {
            f(value);
        }
        entries.len()
    }

    pub fn values(&self) -> Vec<V> {
        self.entries.read().values().cloned().collect()
    }

    /// Clones the records matching `predicate`.
    pub fn filter(&self, predicate: impl Fn(&V) -> bool) -> Vec<V> {
        self.entries
            .read()
            .values()
            .filter(|v| predicate(v))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
