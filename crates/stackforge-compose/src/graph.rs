//! Start-order dependency graph using `petgraph`.
//!
//! Nodes are service ids. An edge `B -> A` means B must start before A,
//! because A lists B in `requires` or in its `depends_on` hints.

use std::collections::{HashMap, VecDeque};

use petgraph::Direction;
use petgraph::graph::NodeIndex;
use stackforge_catalog::ServiceDescriptor;

/// Result of a deterministic topological sort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologicalOrder {
    /// Ids in start order. Ties are broken by ascending id.
    pub order: Vec<String>,
    /// Ids caught in a cycle, appended to `order` in lexical order.
    ///
    /// Non-empty only when the graph has a cycle. The sort never fails on
    /// cycles; detecting them is [`DependencyGraph::cycles`]' job.
    pub unsorted: Vec<String>,
}

/// A start-order graph of services.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: petgraph::Graph<String, ()>,
    index: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph over a set of descriptors.
    ///
    /// Only edges whose both ends are in the set are kept; duplicate edges
    /// collapse into one.
    #[must_use]
    pub fn from_descriptors<'a, I>(services: I) -> Self
    where
        I: IntoIterator<Item = &'a ServiceDescriptor> + Clone,
    {
        let mut graph = Self::new();
        for service in services.clone() {
            let _ = graph.add_component(&service.id);
        }
        for service in services {
            let Some(dependent) = graph.node(&service.id) else {
                continue;
            };
            for target in service.start_after() {
                if let Some(dependency) = graph.node(target) {
                    graph.add_dependency(dependent, dependency);
                }
            }
        }
        graph
    }

    /// Adds a service node, returning the existing node if already present.
    pub fn add_component(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.to_string());
        let _ = self.index.insert(id.to_string(), idx);
        idx
    }

    /// Adds a dependency edge: `dependent` starts after `dependency`.
    pub fn add_dependency(&mut self, dependent: NodeIndex, dependency: NodeIndex) {
        let _ = self.graph.update_edge(dependency, dependent, ());
    }

    /// Number of services in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns `true` if the graph has no services.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    fn node(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    /// Sorts the graph with Kahn's algorithm.
    ///
    /// The initial ready set is taken in ascending id order. Each node that
    /// becomes ready while processing one node is queued after the current
    /// ready set, sorted by id, so the same graph always yields the same
    /// order.
    #[must_use]
    pub fn topological_order(&self) -> TopologicalOrder {
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|n| {
                let degree = self.graph.neighbors_directed(n, Direction::Incoming).count();
                (n, degree)
            })
            .collect();

        let mut ready: Vec<NodeIndex> = in_degree
            .iter()
            .filter(|&(_, &d)| d == 0)
            .map(|(&n, _)| n)
            .collect();
        self.sort_by_id(&mut ready);
        let mut queue: VecDeque<NodeIndex> = ready.into();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(n) = queue.pop_front() {
            order.push(self.graph[n].clone());
            let mut unlocked = Vec::new();
            for next in self.graph.neighbors_directed(n, Direction::Outgoing) {
                if let Some(d) = in_degree.get_mut(&next) {
                    *d -= 1;
                    if *d == 0 {
                        unlocked.push(next);
                    }
                }
            }
            self.sort_by_id(&mut unlocked);
            queue.extend(unlocked);
        }

        let mut unsorted: Vec<String> = self
            .graph
            .node_indices()
            .filter(|n| in_degree.get(n).is_some_and(|&d| d > 0))
            .map(|n| self.graph[n].clone())
            .collect();
        unsorted.sort();
        if !unsorted.is_empty() {
            tracing::debug!(remaining = ?unsorted, "cycle left services unsorted");
        }
        order.extend(unsorted.iter().cloned());

        TopologicalOrder { order, unsorted }
    }

    /// Returns the members of every cycle, each sorted by id.
    ///
    /// A service that lists itself counts as a one-member cycle.
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: Vec<Vec<String>> = petgraph::algo::tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || scc.first().is_some_and(|&n| self.graph.contains_edge(n, n))
            })
            .map(|scc| {
                let mut members: Vec<String> =
                    scc.into_iter().map(|n| self.graph[n].clone()).collect();
                members.sort();
                members
            })
            .collect();
        cycles.sort();
        cycles
    }

    fn sort_by_id(&self, nodes: &mut [NodeIndex]) {
        nodes.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
    }
}
