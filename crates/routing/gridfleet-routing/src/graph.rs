//! Static transport network.
//!
//! The graph is built once from the configured edge list and position map
//! and never mutated. Node indices follow edge-list order, which keeps the
//! path enumeration order deterministic for a given construction.

use gridfleet_core::{GraphConfig, GridPos, NodeId};
use petgraph::algo;
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::HashMap;

/// Undirected, unweighted transport network with grid positions.
///
/// Edges carry no weights; every cost in the system derives from the
/// configured durations instead.
#[derive(Debug, Clone)]
pub struct TransportGraph {
    graph: UnGraph<NodeId, ()>,
    indices: HashMap<NodeId, NodeIndex>,
    positions: HashMap<NodeId, GridPos>,
}

impl TransportGraph {
    /// Build a graph from an edge list and a position map.
    pub fn new(edges: &[(NodeId, NodeId)], positions: HashMap<NodeId, GridPos>) -> Self {
        let mut graph = UnGraph::new_undirected();
        let mut indices: HashMap<NodeId, NodeIndex> = HashMap::new();
        for (a, b) in edges {
            let ia = *indices
                .entry(a.clone())
                .or_insert_with(|| graph.add_node(a.clone()));
            let ib = *indices
                .entry(b.clone())
                .or_insert_with(|| graph.add_node(b.clone()));
            graph.update_edge(ia, ib, ());
        }
        Self {
            graph,
            indices,
            positions,
        }
    }

    pub fn from_config(config: &GraphConfig) -> Self {
        Self::new(&config.edges, config.positions.clone())
    }

    /// Whether the node participates in any edge.
    pub fn contains(&self, node: &str) -> bool {
        self.indices.contains_key(node)
    }

    /// Grid position of a node, if configured.
    pub fn position(&self, node: &str) -> Option<GridPos> {
        self.positions.get(node).copied()
    }

    /// Shortest path between two nodes as a node sequence including both
    /// endpoints. Empty if either node is absent or no route exists;
    /// a node is trivially connected to itself.
    pub fn shortest_path(&self, from: &str, to: &str) -> Vec<NodeId> {
        let (Some(&ia), Some(&ib)) = (self.indices.get(from), self.indices.get(to)) else {
            return Vec::new();
        };
        if ia == ib {
            return vec![from.to_owned()];
        }
        match algo::astar(&self.graph, ia, |n| n == ib, |_| 1u32, |_| 0u32) {
            Some((_, path)) => path
                .into_iter()
                .map(|ix| self.graph[ix].clone())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Every simple path between two distinct nodes, in an order that is
    /// deterministic for a given graph construction.
    pub fn all_simple_paths(&self, from: &str, to: &str) -> Vec<Vec<NodeId>> {
        let (Some(&ia), Some(&ib)) = (self.indices.get(from), self.indices.get(to)) else {
            return Vec::new();
        };
        if ia == ib {
            return Vec::new();
        }
        algo::all_simple_paths::<Vec<NodeIndex>, _>(&self.graph, ia, ib, 0, None)
            .map(|path| {
                path.into_iter()
                    .map(|ix| self.graph[ix].clone())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> TransportGraph {
        let edges = vec![
            ("A".to_owned(), "B".to_owned()),
            ("B".to_owned(), "C".to_owned()),
        ];
        let positions = HashMap::from([
            ("A".to_owned(), GridPos::new(0, 0)),
            ("B".to_owned(), GridPos::new(1, 0)),
            ("C".to_owned(), GridPos::new(2, 0)),
        ]);
        TransportGraph::new(&edges, positions)
    }

    fn square() -> TransportGraph {
        let edges: Vec<(NodeId, NodeId)> = [("A", "B"), ("B", "C"), ("C", "D"), ("D", "A")]
            .into_iter()
            .map(|(a, b)| (a.to_owned(), b.to_owned()))
            .collect();
        let positions = HashMap::from([
            ("A".to_owned(), GridPos::new(0, 0)),
            ("B".to_owned(), GridPos::new(1, 0)),
            ("C".to_owned(), GridPos::new(1, 1)),
            ("D".to_owned(), GridPos::new(0, 1)),
        ]);
        TransportGraph::new(&edges, positions)
    }

    #[test]
    fn shortest_path_walks_the_line() {
        let graph = line();
        assert_eq!(graph.shortest_path("A", "C"), vec!["A", "B", "C"]);
        assert_eq!(graph.shortest_path("C", "A"), vec!["C", "B", "A"]);
        assert_eq!(graph.shortest_path("B", "B"), vec!["B"]);
    }

    #[test]
    fn shortest_path_is_empty_when_unroutable() {
        let graph = line();
        assert!(graph.shortest_path("A", "Z").is_empty());
        assert!(graph.shortest_path("Z", "A").is_empty());

        let mut edges = vec![("A".to_owned(), "B".to_owned())];
        edges.push(("X".to_owned(), "Y".to_owned()));
        let disconnected = TransportGraph::new(&edges, HashMap::new());
        assert!(disconnected.shortest_path("A", "Y").is_empty());
    }

    #[test]
    fn simple_paths_cover_both_sides_of_the_square() {
        let graph = square();
        let mut paths = graph.all_simple_paths("A", "C");
        paths.sort();
        assert_eq!(
            paths,
            vec![
                vec!["A".to_owned(), "B".to_owned(), "C".to_owned()],
                vec!["A".to_owned(), "D".to_owned(), "C".to_owned()],
            ]
        );
    }

    #[test]
    fn simple_path_order_is_stable_per_construction() {
        let first = square().all_simple_paths("A", "C");
        let second = square().all_simple_paths("A", "C");
        assert_eq!(first, second);
    }
}
