//! Index-keyed dependency graph with Kahn ordering.

use crate::errors::CycleDetectedError;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// A node handle, stable for the lifetime of its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Returns the insertion index of the node.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A directed graph of "must come after" relations between labelled nodes.
///
/// Labels are resolved to [`NodeId`]s once, when nodes are added; ordering
/// works on indices only.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    labels: Vec<String>,
    index: HashMap<String, NodeId>,
    /// `dependencies[n]`: nodes that must precede `n`.
    dependencies: Vec<Vec<NodeId>>,
    /// `dependents[n]`: nodes waiting on `n`.
    dependents: Vec<Vec<NodeId>>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node, or returns the existing one with the same label.
    pub fn add_node(&mut self, label: impl Into<String>) -> NodeId {
        let label = label.into();
        if let Some(id) = self.index.get(&label) {
            return *id;
        }
        let id = NodeId(self.labels.len());
        self.index.insert(label.clone(), id);
        self.labels.push(label);
        self.dependencies.push(Vec::new());
        self.dependents.push(Vec::new());
        id
    }

    /// Looks up a node by label.
    #[must_use]
    pub fn node_id(&self, label: &str) -> Option<NodeId> {
        self.index.get(label).copied()
    }

    /// Returns the label of `id`.
    #[must_use]
    pub fn label(&self, id: NodeId) -> Option<&str> {
        self.labels.get(id.0).map(String::as_str)
    }

    /// Records that `dependent` must come after `dependency`.
    ///
    /// Returns false if either node is unknown or the edge already exists.
    pub fn add_edge(&mut self, dependent: NodeId, dependency: NodeId) -> bool {
        if dependent.0 >= self.labels.len() || dependency.0 >= self.labels.len() {
            return false;
        }
        if self.dependencies[dependent.0].contains(&dependency) {
            return false;
        }
        self.dependencies[dependent.0].push(dependency);
        self.dependents[dependency.0].push(dependent);
        true
    }

    /// Returns the direct dependencies of `id`.
    #[must_use]
    pub fn dependencies_of(&self, id: NodeId) -> &[NodeId] {
        self.dependencies
            .get(id.0)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.dependencies.iter().map(Vec::len).sum()
    }

    /// Orders all nodes so each follows its dependencies.
    ///
    /// Among nodes that are ready at the same time, the one added first goes
    /// first, so the order is deterministic.
    ///
    /// # Errors
    ///
    /// Returns [`CycleDetectedError`] naming every node that could not be
    /// placed. No partial order is returned.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, CycleDetectedError> {
        let mut in_degree: Vec<usize> = self.dependencies.iter().map(Vec::len).collect();
        let mut ready: BTreeSet<NodeId> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &count)| count == 0)
            .map(|(i, _)| NodeId(i))
            .collect();
        let mut order = Vec::with_capacity(self.labels.len());

        while let Some(node) = ready.pop_first() {
            order.push(node);
            for dependent in &self.dependents[node.0] {
                let count = &mut in_degree[dependent.0];
                *count -= 1;
                if *count == 0 {
                    ready.insert(*dependent);
                }
            }
        }

        if order.len() == self.labels.len() {
            Ok(order)
        } else {
            let unsorted = in_degree
                .iter()
                .enumerate()
                .filter(|(_, &count)| count > 0)
                .map(|(i, _)| self.labels[i].clone())
                .collect();
            Err(CycleDetectedError::new(unsorted))
        }
    }

    /// Like [`DependencyGraph::topological_order`], returning labels.
    ///
    /// # Errors
    ///
    /// Returns [`CycleDetectedError`] if the graph has a cycle.
    pub fn sorted_labels(&self) -> Result<Vec<String>, CycleDetectedError> {
        Ok(self
            .topological_order()?
            .into_iter()
            .map(|id| self.labels[id.0].clone())
            .collect())
    }
}
