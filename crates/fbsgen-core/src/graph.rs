//! Include Graph - petgraph-based schema dependency tracking
//!
//! Edges point from the including file to the included file, so the files
//! affected by a change are the incoming neighbors of the changed node.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::hasher::SchemaFile;
use crate::includes::resolve_include;

/// Include relation over the files discovered in one pass
#[derive(Debug, Default)]
pub struct IncludeGraph {
    graph: DiGraph<String, ()>,
    path_to_index: HashMap<String, NodeIndex>,
}

impl IncludeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from scanned files
    ///
    /// Includes that do not resolve to a discovered file are dropped.
    pub fn build(files: &[SchemaFile]) -> Self {
        let mut graph = Self::new();
        for file in files {
            graph.add_file(&file.rel_path);
        }

        for file in files {
            for target in &file.includes {
                let added = resolve_include(&file.rel_path, target)
                    .map(|resolved| graph.add_include(&file.rel_path, &resolved))
                    .unwrap_or(false);
                if !added {
                    debug!("Untracked include {:?} in {}", target, file.rel_path);
                }
            }
        }

        graph
    }

    /// Add a file node, returning the existing node if already present
    pub fn add_file(&mut self, rel_path: &str) -> NodeIndex {
        if let Some(&idx) = self.path_to_index.get(rel_path) {
            return idx;
        }
        let idx = self.graph.add_node(rel_path.to_string());
        self.path_to_index.insert(rel_path.to_string(), idx);
        idx
    }

    /// Record that `from` includes `to`
    ///
    /// Returns `false` if either file is unknown. Repeated includes collapse
    /// to a single edge.
    pub fn add_include(&mut self, from: &str, to: &str) -> bool {
        match (self.path_to_index.get(from), self.path_to_index.get(to)) {
            (Some(&f), Some(&t)) => {
                self.graph.update_edge(f, t, ());
                true
            }
            _ => false,
        }
    }

    /// Files that directly include `rel_path`
    pub fn dependents(&self, rel_path: &str) -> BTreeSet<String> {
        self.neighbors(rel_path, Direction::Incoming)
    }

    /// Files directly included by `rel_path`
    pub fn includes_of(&self, rel_path: &str) -> BTreeSet<String> {
        self.neighbors(rel_path, Direction::Outgoing)
    }

    /// Reverse adjacency: every file mapped to its direct includers
    pub fn reverse_adjacency(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.path_to_index
            .keys()
            .map(|path| (path.clone(), self.dependents(path)))
            .collect()
    }

    fn neighbors(&self, rel_path: &str, direction: Direction) -> BTreeSet<String> {
        self.path_to_index
            .get(rel_path)
            .map(|&idx| {
                self.graph
                    .neighbors_directed(idx, direction)
                    .filter_map(|n| self.graph.node_weight(n))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains(&self, rel_path: &str) -> bool {
        self.path_to_index.contains_key(rel_path)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
