//! Invalidation - which schemas must be rebuilt this pass
//!
//! The seed set is every file whose digest differs from the cache (or that the
//! cache has never seen). The closure adds everything that reaches a seed
//! through include edges, walked with an explicit worklist so cycles and deep
//! chains cost O(V+E) and nothing more.

use std::collections::{BTreeSet, VecDeque};

use crate::cache::DigestCache;
use crate::graph::IncludeGraph;
use crate::hasher::SchemaFile;

/// Seed and closure dirty sets for one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invalidation {
    /// Files that changed or are new.
    pub seed: BTreeSet<String>,
    /// Seed plus every transitive includer.
    pub closure: BTreeSet<String>,
}

impl Invalidation {
    pub fn compute(files: &[SchemaFile], graph: &IncludeGraph, cache: &DigestCache) -> Self {
        let seed = seed_dirty(files, cache);
        let closure = propagate(graph, &seed);
        Self { seed, closure }
    }

    /// Files dirty only because something they include changed
    pub fn propagated(&self) -> BTreeSet<String> {
        self.closure.difference(&self.seed).cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.closure.is_empty()
    }
}

/// Files whose current digest is not the cached one
pub fn seed_dirty(files: &[SchemaFile], cache: &DigestCache) -> BTreeSet<String> {
    files
        .iter()
        .filter(|file| !cache.is_current(&file.rel_path, &file.digest))
        .map(|file| file.rel_path.clone())
        .collect()
}

/// Transitive closure of `seeds` over "is included by" edges
pub fn propagate(graph: &IncludeGraph, seeds: &BTreeSet<String>) -> BTreeSet<String> {
    let mut dirty = BTreeSet::new();
    let mut queue: VecDeque<String> = seeds.iter().cloned().collect();

    while let Some(path) = queue.pop_front() {
        if !dirty.insert(path.clone()) {
            continue;
        }

        for dependent in graph.dependents(&path) {
            if !dirty.contains(&dependent) {
                queue.push_back(dependent);
            }
        }
    }

    dirty
}
