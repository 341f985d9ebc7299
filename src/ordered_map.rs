/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! A map that remembers insertion order. Field offsets and argument
//! positions depend on declaration order, while name lookup must stay O(1).

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Default)]
pub struct OrderedMap<K, V> {
    keys: Vec<K>,
    values: HashMap<K, V>,
}

impl<K: Eq + Hash + Clone, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        OrderedMap { keys: Vec::new(), values: HashMap::new() }
    }

    /// Inserts a new binding. Callers must rule out duplicates beforehand;
    /// a duplicate insertion is a programming error.
    pub fn insert(&mut self, key: K, value: V) {
        assert!(
            !self.contains(&key),
            "duplicate insertion into ordered map"
        );
        self.keys.push(key.clone());
        self.values.insert(key, value);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.values.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.values.get(key)
    }

    /// The keys in insertion order.
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.keys.iter().map(|k| (k, &self.values[k]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iteration_follows_insertion_order() {
        let mut m = OrderedMap::new();
        m.insert("z", 1);
        m.insert("a", 2);
        m.insert("m", 3);
        let keys: Vec<&str> = m.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_lookup() {
        let mut m = OrderedMap::new();
        m.insert("x", 10);
        assert_eq!(m.get(&"x"), Some(&10));
        assert_eq!(m.get(&"y"), None);
        assert!(m.contains(&"x"));
    }

    #[test]
    #[should_panic(expected = "duplicate insertion")]
    fn test_duplicate_insertion_panics() {
        let mut m = OrderedMap::new();
        m.insert("x", 1);
        m.insert("x", 2);
    }
}
