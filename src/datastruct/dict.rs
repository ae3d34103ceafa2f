// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use dashmap::{DashMap, mapref::entry::Entry};

/// Thread-safe key → value mapping backing one database slot.
///
/// Traversal is weakly consistent: every key that exists for the whole
/// walk is visited, concurrent inserts and removals may or may not be,
/// and values are never observed torn.
#[derive(Debug, Default)]
pub struct Dict<V> {
    inner: DashMap<String, V>,
}

impl<V: Clone> Dict<V> {
    pub fn new() -> Self {
        Self { inner: DashMap::new() }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Upserts. Returns 1 when the key was inserted, 0 when an existing
    /// value was overwritten.
    pub fn put(&self, key: String, value: V) -> i64 {
        match self.inner.insert(key, value) {
            None => 1,
            Some(_) => 0,
        }
    }

    /// Inserts only when absent; returns the number of keys written.
    pub fn put_if_absent(&self, key: String, value: V) -> i64 {
        match self.inner.entry(key) {
            Entry::Occupied(_) => 0,
            Entry::Vacant(slot) => {
                slot.insert(value);
                1
            },
        }
    }

    /// Overwrites only when present; returns the number of keys written.
    pub fn put_if_exists(&self, key: String, value: V) -> i64 {
        match self.inner.entry(key) {
            Entry::Occupied(mut slot) => {
                slot.insert(value);
                1
            },
            Entry::Vacant(_) => 0,
        }
    }

    /// Returns 1 when a key was actually removed.
    pub fn remove(&self, key: &str) -> i64 {
        match self.inner.remove(key) {
            Some(_) => 1,
            None => 0,
        }
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Visits entries until the callback returns `false`.
    pub fn for_each(&self, mut f: impl FnMut(&str, &V) -> bool) {
        for entry in self.inner.iter() {
            if !f(entry.key(), entry.value()) {
                break;
            }
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.iter().map(|entry| entry.key().clone()).collect()
    }
}
