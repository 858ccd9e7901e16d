// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A wrapper around a `typed_generational_arena::Arena` that also provides lookup by name.
//!
//! The type graph stores one node per qualified type name (`example.v1.Item`,
//! `example.v1.Item.LabelsEntry`, `int64`, ...). Nodes refer to each other through arena indices,
//! which is what lets a message refer to itself, but the builder also needs to ask "was this name
//! already visited?" without a linear scan.

use std::{collections::HashMap, ops};

use serde::{Deserialize, Serialize};

use typed_generational_arena::{Arena, IgnoreGeneration, Index};

pub type SerializableSlab<T> = Arena<T, usize, IgnoreGeneration>;
pub type SerializableSlabIndex<T> = Index<T, usize, IgnoreGeneration>;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MappedArena<V> {
    values: SerializableSlab<V>,
    map: HashMap<String, SerializableSlabIndex<V>>,
}

impl<V> MappedArena<V> {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn get_id(&self, key: &str) -> Option<SerializableSlabIndex<V>> {
        self.map.get(key).copied()
    }

    pub fn get_by_key(&self, key: &str) -> Option<&V> {
        self.get_id(key).map(|id| &self[id])
    }

    /// Adds a value under `key`, unless the key is already taken, in which case the existing
    /// index is returned and `value` is dropped.
    pub fn add(&mut self, key: &str, value: V) -> SerializableSlabIndex<V> {
        if let Some(existing) = self.get_id(key) {
            return existing;
        }

        let id = self.values.insert(value);
        self.map.insert(key.to_string(), id);
        id
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }
}

impl<V> Default for MappedArena<V> {
    fn default() -> Self {
        MappedArena {
            values: SerializableSlab::new(),
            map: HashMap::default(),
        }
    }
}

impl<V> ops::Index<SerializableSlabIndex<V>> for MappedArena<V> {
    type Output = V;

    #[inline]
    fn index(&self, id: SerializableSlabIndex<V>) -> &V {
        &self.values[id]
    }
}

impl<V> ops::IndexMut<SerializableSlabIndex<V>> for MappedArena<V> {
    #[inline]
    fn index_mut(&mut self, id: SerializableSlabIndex<V>) -> &mut V {
        &mut self.values[id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent_per_key() {
        let mut arena = MappedArena::default();

        let first = arena.add("example.Item", 1);
        let second = arena.add("example.Item", 2);

        assert_eq!(arena.len(), 1);
        assert_eq!(arena[first], 1);
        assert_eq!(arena[second], 1);
        assert_eq!(arena.get_by_key("example.Item"), Some(&1));
    }

    #[test]
    fn clone_preserves_indices() {
        let mut arena = MappedArena::default();
        let a = arena.add("a", "alpha");

        let checkpoint = arena.clone();
        arena.add("b", "beta");
        arena = checkpoint;

        assert_eq!(arena[a], "alpha");
        assert!(!arena.contains_key("b"));
        assert_eq!(arena.len(), 1);
    }
}
