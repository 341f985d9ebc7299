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

//! Simple directed graph used by the dataflow passes. Sorted containers
//! keep every iteration order deterministic.

use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default)]
pub struct Graph<T: Ord + Copy> {
    successors: BTreeMap<T, BTreeSet<T>>,
}

impl<T: Ord + Copy> Graph<T> {
    pub fn new() -> Self {
        Graph { successors: BTreeMap::new() }
    }

    /// Adds an edge; duplicate edges are accepted silently.
    pub fn add_edge(&mut self, from: T, to: T) {
        self.successors.entry(from).or_default().insert(to);
    }

    pub fn successors(&self, n: &T) -> impl Iterator<Item = &T> + '_ {
        self.successors.get(n).into_iter().flatten()
    }

    pub fn out_degree(&self, n: &T) -> usize {
        self.successors.get(n).map_or(0, |s| s.len())
    }

    pub fn has_edge(&self, from: &T, to: &T) -> bool {
        self.successors.get(from).is_some_and(|s| s.contains(to))
    }

    /// Iterates over all nodes with outgoing edges, in sorted order.
    pub fn nodes(&self) -> impl Iterator<Item = (&T, &BTreeSet<T>)> + '_ {
        self.successors.iter()
    }

    pub fn len(&self) -> usize {
        self.successors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }
}
