//! Ordering graph with a stable topological sort

use rivet_errors::ResolverError;
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

/// Directed graph over component names
///
/// An edge `before -> after` means `before` must run first. Ties between
/// ready nodes are broken by the rank each node was added with, so the
/// result is deterministic for identical input.
#[derive(Clone, Debug, Default)]
pub struct OrderGraph {
    names: Vec<String>,
    ranks: Vec<usize>,
    index: HashMap<String, usize>,
    edges: Vec<BTreeSet<usize>>,
}

impl OrderGraph {
    /// Create new empty graph
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add node with its tie-break rank; re-adding is a no-op
    pub fn add_node(&mut self, name: &str, rank: usize) {
        if self.index.contains_key(name) {
            return;
        }
        self.index.insert(name.to_string(), self.names.len());
        self.names.push(name.to_string());
        self.ranks.push(rank);
        self.edges.push(BTreeSet::new());
    }

    /// Add edge between two known nodes; unknown names are ignored
    pub fn add_edge(&mut self, before: &str, after: &str) {
        if let (Some(&from), Some(&to)) = (self.index.get(before), self.index.get(after)) {
            self.edges[from].insert(to);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Find one cycle using DFS, returned as a closed path
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Active,
            Done,
        }

        let mut marks = vec![Mark::New; self.names.len()];
        let mut order: Vec<usize> = (0..self.names.len()).collect();
        order.sort_by_key(|&node| self.ranks[node]);

        for start in order {
            if marks[start] != Mark::New {
                continue;
            }
            // Explicit stack of (node, iterator position) to avoid recursion
            let mut path: Vec<usize> = vec![start];
            let mut cursors: Vec<usize> = vec![0];
            marks[start] = Mark::Active;

            while let Some(&node) = path.last() {
                let cursor = cursors.last_mut()?;
                let next = self.edges[node].iter().nth(*cursor).copied();
                *cursor += 1;
                match next {
                    Some(target) if marks[target] == Mark::Active => {
                        let begin = path.iter().position(|&n| n == target)?;
                        let mut cycle: Vec<String> =
                            path[begin..].iter().map(|&n| self.names[n].clone()).collect();
                        cycle.push(self.names[target].clone());
                        return Some(cycle);
                    }
                    Some(target) if marks[target] == Mark::New => {
                        marks[target] = Mark::Active;
                        path.push(target);
                        cursors.push(0);
                    }
                    Some(_) => {}
                    None => {
                        marks[node] = Mark::Done;
                        path.pop();
                        cursors.pop();
                    }
                }
            }
        }
        None
    }

    /// Perform topological sort using Kahn's algorithm
    ///
    /// Among ready nodes the one with the lowest rank goes first.
    ///
    /// # Errors
    ///
    /// Returns `ResolverError::ConfigurationCycle` naming one cycle.
    pub fn topological_sort(&self) -> Result<Vec<String>, ResolverError> {
        let mut in_degree = vec![0usize; self.names.len()];
        for targets in &self.edges {
            for &target in targets {
                in_degree[target] += 1;
            }
        }

        let mut ready: BinaryHeap<Reverse<(usize, usize)>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(node, _)| Reverse((self.ranks[node], node)))
            .collect();

        let mut result = Vec::with_capacity(self.names.len());
        while let Some(Reverse((_, node))) = ready.pop() {
            result.push(self.names[node].clone());
            for &target in &self.edges[node] {
                in_degree[target] -= 1;
                if in_degree[target] == 0 {
                    ready.push(Reverse((self.ranks[target], target)));
                }
            }
        }

        if result.len() != self.names.len() {
            let path = self.find_cycle().unwrap_or_default();
            return Err(ResolverError::ConfigurationCycle { path });
        }

        Ok(result)
    }
}
