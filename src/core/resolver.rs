//! Dependency resolution
//!
//! Computes a serial build order over a working set such that every package
//! comes after all of its in-set dependencies.

use std::collections::{BTreeSet, HashMap};

use crate::core::context::DependencyMode;
use crate::core::registry::WorkingSet;
use crate::error::ResolverError;

/// Dependency graph for packages
///
/// Nodes keep their insertion order; it is used to break ties so the same
/// input always produces the same build order.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Package names by position
    nodes: Vec<String>,
    /// Name -> position
    index: HashMap<String, usize>,
    /// Declared dependencies by position
    edges: Vec<Vec<String>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph over the packages in a working set, in set order
    pub fn from_working_set(set: &WorkingSet) -> Self {
        let mut graph = Self::new();
        for entry in set {
            graph.add_package(&entry.name, entry.dependencies().to_vec());
        }
        graph
    }

    /// Add a package to the graph
    ///
    /// Adding a known name replaces its dependencies. Dependencies do not
    /// become nodes; one that is never added is unresolved.
    pub fn add_package(&mut self, name: &str, dependencies: Vec<String>) {
        if let Some(&position) = self.index.get(name) {
            self.edges[position] = dependencies;
            return;
        }
        self.index.insert(name.to_string(), self.nodes.len());
        self.nodes.push(name.to_string());
        self.edges.push(dependencies);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Compute topological sort (build order) as node positions
    ///
    /// Kahn's algorithm; whenever several packages are ready the one added
    /// earliest goes first. Dependencies that are not nodes fail with
    /// [`ResolverError::UnresolvedDependency`] unless `mode` ignores them.
    pub fn topological_sort(&self, mode: DependencyMode) -> Result<Vec<usize>, ResolverError> {
        let count = self.nodes.len();
        let mut in_degree = vec![0usize; count];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
        let mut depends_on: Vec<Vec<usize>> = vec![Vec::new(); count];

        for (node, dependencies) in self.edges.iter().enumerate() {
            for dependency in dependencies {
                match self.index.get(dependency) {
                    Some(&dep) => {
                        if depends_on[node].contains(&dep) {
                            continue;
                        }
                        depends_on[node].push(dep);
                        dependents[dep].push(node);
                        in_degree[node] += 1;
                    }
                    None if mode.resolves() => {
                        return Err(ResolverError::UnresolvedDependency {
                            package: self.nodes[node].clone(),
                            dependency: dependency.clone(),
                        });
                    }
                    None => {
                        tracing::debug!(
                            "Assuming dependency '{dependency}' of '{}' is provided externally",
                            self.nodes[node]
                        );
                    }
                }
            }
        }

        let mut ready: BTreeSet<usize> = (0..count).filter(|&n| in_degree[n] == 0).collect();
        let mut order = Vec::with_capacity(count);

        while let Some(node) = ready.pop_first() {
            order.push(node);
            for &dependent in &dependents[node] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    tracing::debug!(
                        "Building {} after {}",
                        self.nodes[dependent],
                        self.nodes[node]
                    );
                    ready.insert(dependent);
                }
            }
        }

        if order.len() < count {
            return Err(ResolverError::CircularDependency {
                cycle: self.find_cycle(&in_degree, &depends_on),
            });
        }

        Ok(order)
    }

    /// Build order as package names
    pub fn build_order(&self, mode: DependencyMode) -> Result<Vec<String>, ResolverError> {
        Ok(self
            .topological_sort(mode)?
            .into_iter()
            .map(|node| self.nodes[node].clone())
            .collect())
    }

    /// Check if the graph has any cycles
    pub fn has_cycle(&self) -> bool {
        matches!(
            self.topological_sort(DependencyMode::Ignore),
            Err(ResolverError::CircularDependency { .. })
        )
    }

    /// Walk the nodes Kahn's algorithm left behind until one repeats
    ///
    /// Every leftover node still has an unsorted dependency, so starting from
    /// the earliest one and always following its first unsorted dependency
    /// must revisit a node. The walk from that node back to itself is the
    /// reported cycle, e.g. `[a, b, a]`.
    fn find_cycle(&self, in_degree: &[usize], depends_on: &[Vec<usize>]) -> Vec<String> {
        let Some(start) = (0..self.nodes.len()).find(|&n| in_degree[n] > 0) else {
            return Vec::new();
        };

        let mut path = vec![start];
        let mut node = start;
        while let Some(next) = depends_on[node].iter().copied().find(|&d| in_degree[d] > 0) {
            if let Some(first) = path.iter().position(|&n| n == next) {
                let mut cycle: Vec<String> =
                    path[first..].iter().map(|&n| self.nodes[n].clone()).collect();
                cycle.push(self.nodes[next].clone());
                return cycle;
            }
            path.push(next);
            node = next;
        }

        path.into_iter().map(|n| self.nodes[n].clone()).collect()
    }
}

/// Reorder a working set into a valid build order
///
/// The set is permuted in place; no package is added or removed.
pub fn order_working_set(set: &mut WorkingSet, mode: DependencyMode) -> Result<(), ResolverError> {
    let order = DependencyGraph::from_working_set(set).topological_sort(mode)?;
    set.reorder(&order);
    Ok(())
}
