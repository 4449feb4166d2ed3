//! Connection Graph
//!
//! Undirected graph over the identified components. Edges are stored once,
//! so the adjacency lists produced from it are symmetric by construction.

use petgraph::graph::{NodeIndex, UnGraph};

use crate::schema::{Component, Connection};

pub struct ConnectionGraph {
    graph: UnGraph<Component, ()>,
    nodes: Vec<NodeIndex>,
}

impl ConnectionGraph {
    /// One node per component, in list order.
    pub fn new(components: &[Component]) -> Self {
        let mut graph = UnGraph::with_capacity(components.len(), 0);
        let nodes = components
            .iter()
            .map(|c| graph.add_node(c.clone()))
            .collect();
        Self { graph, nodes }
    }

    /// Connect the components at positions `a` and `b`. Self-loops and
    /// out-of-range positions are ignored; repeated edges are merged.
    pub fn connect(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        if let (Some(&na), Some(&nb)) = (self.nodes.get(a), self.nodes.get(b)) {
            self.graph.update_edge(na, nb, ());
        }
    }

    pub fn are_connected(&self, a: usize, b: usize) -> bool {
        match (self.nodes.get(a), self.nodes.get(b)) {
            (Some(&na), Some(&nb)) => self.graph.contains_edge(na, nb),
            _ => false,
        }
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// One entry per component in list order, neighbours also in list order.
    pub fn to_connections(&self) -> Vec<Connection> {
        self.nodes
            .iter()
            .map(|&node| {
                let connections = self
                    .nodes
                    .iter()
                    .filter(|&&other| other != node && self.graph.contains_edge(node, other))
                    .map(|&other| self.graph[other].id.clone())
                    .collect();
                Connection {
                    component: self.graph[node].id.clone(),
                    connections,
                }
            })
            .collect()
    }
}
