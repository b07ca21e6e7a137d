//! Relationship graph: actors as nodes, merged call/transaction links as edges

use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use super::algo;

/// Provenance of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    Call,
    Transaction,
    /// Both calls and transactions landed on this pair. Terminal.
    Mixed,
}

/// Aggregated attributes of one unordered actor pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    /// Seeded by the first record, then grown by call durations
    pub weight: f64,
    pub edge_type: EdgeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_count: Option<u32>,
}

impl EdgeData {
    pub fn from_call(duration: f64) -> Self {
        Self {
            weight: duration,
            edge_type: EdgeType::Call,
            call_count: Some(1),
            total_amount: None,
            tx_count: None,
        }
    }

    pub fn from_transaction(amount: f64) -> Self {
        Self {
            weight: amount,
            edge_type: EdgeType::Transaction,
            call_count: None,
            total_amount: Some(amount),
            tx_count: Some(1),
        }
    }

    /// Merge another call into this edge
    pub fn add_call(&mut self, duration: f64) {
        self.weight += duration;
        self.call_count = Some(self.call_count.unwrap_or(0) + 1);
        if self.edge_type == EdgeType::Transaction {
            self.edge_type = EdgeType::Mixed;
        }
    }

    /// Merge another transaction into this edge. Weight is left untouched.
    pub fn add_transaction(&mut self, amount: f64) {
        self.total_amount = Some(self.total_amount.unwrap_or(0.0) + amount);
        self.tx_count = Some(self.tx_count.unwrap_or(0) + 1);
        if self.edge_type == EdgeType::Call {
            self.edge_type = EdgeType::Mixed;
        }
    }

    /// Money moved over this edge if any was recorded, otherwise its weight
    pub fn amount_or_weight(&self) -> f64 {
        self.total_amount.unwrap_or(self.weight)
    }
}

/// Summary statistics of a graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub num_nodes: usize,
    pub num_edges: usize,
    pub density: f64,
    pub is_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_degree: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_degree: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_degree: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_components: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub largest_component_size: Option<usize>,
}

/// Weighted, undirected actor graph.
///
/// Nodes are kept in first-reference order; every positional table computed
/// downstream (centralities, features, labels) is aligned with that order.
/// At most one edge exists per unordered pair.
#[derive(Debug, Clone, Default)]
pub struct NetworkGraph {
    graph: UnGraph<String, EdgeData>,
    index: FxHashMap<String, NodeIndex>,
    /// Per node: (neighbor, edge) in edge insertion order
    adjacency: Vec<Vec<(usize, EdgeIndex)>>,
}

impl NetworkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Construction ====================

    /// Get the position of `id`, inserting it if unseen
    pub(crate) fn ensure_node(&mut self, id: &str) -> usize {
        if let Some(&idx) = self.index.get(id) {
            return idx.index();
        }
        let idx = self.graph.add_node(id.to_string());
        self.index.insert(id.to_string(), idx);
        self.adjacency.push(Vec::new());
        idx.index()
    }

    pub(crate) fn find_edge_index(&self, a: usize, b: usize) -> Option<EdgeIndex> {
        let (smaller, other) = if self.adjacency[a].len() <= self.adjacency[b].len() {
            (a, b)
        } else {
            (b, a)
        };
        self.adjacency[smaller]
            .iter()
            .find(|(n, _)| *n == other)
            .map(|(_, e)| *e)
    }

    pub(crate) fn insert_edge(&mut self, a: usize, b: usize, data: EdgeData) -> EdgeIndex {
        let e = self
            .graph
            .add_edge(NodeIndex::new(a), NodeIndex::new(b), data);
        self.adjacency[a].push((b, e));
        self.adjacency[b].push((a, e));
        e
    }

    pub(crate) fn edge_data_mut(&mut self, e: EdgeIndex) -> Option<&mut EdgeData> {
        self.graph.edge_weight_mut(e)
    }

    // ==================== Node queries ====================

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }

    /// Node ids in graph order
    pub fn nodes(&self) -> impl Iterator<Item = &str> + '_ {
        self.graph.node_weights().map(|s| s.as_str())
    }

    pub fn node_id(&self, i: usize) -> &str {
        &self.graph[NodeIndex::new(i)]
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).map(|idx| idx.index())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn degree(&self, i: usize) -> usize {
        self.adjacency[i].len()
    }

    pub fn degree_of(&self, id: &str) -> usize {
        self.position(id).map(|i| self.degree(i)).unwrap_or(0)
    }

    /// Neighbor positions in edge insertion order
    pub fn neighbors(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency[i].iter().map(|(n, _)| *n)
    }

    /// Neighbor ids of `id`; empty for unknown ids
    pub fn neighbor_ids(&self, id: &str) -> Vec<String> {
        match self.position(id) {
            Some(i) => self
                .neighbors(i)
                .map(|n| self.node_id(n).to_string())
                .collect(),
            None => Vec::new(),
        }
    }

    /// (neighbor, edge data) for every edge touching `i`
    pub fn incident_edges(&self, i: usize) -> impl Iterator<Item = (usize, &EdgeData)> + '_ {
        self.adjacency[i]
            .iter()
            .map(move |(n, e)| (*n, &self.graph[*e]))
    }

    // ==================== Edge queries ====================

    /// The merged edge between two actors, in either direction
    pub fn edge(&self, a: &str, b: &str) -> Option<&EdgeData> {
        let (a, b) = (self.position(a)?, self.position(b)?);
        self.find_edge_index(a, b).map(|e| &self.graph[e])
    }

    /// All edges as (endpoint, endpoint, data) in insertion order
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, &EdgeData)> + '_ {
        self.graph
            .raw_edges()
            .iter()
            .map(|e| (e.source().index(), e.target().index(), &e.weight))
    }

    // ==================== Views for algorithms ====================

    /// Unweighted adjacency lists
    pub fn adjacency_lists(&self) -> Vec<Vec<usize>> {
        (0..self.node_count())
            .map(|i| self.neighbors(i).collect())
            .collect()
    }

    /// Adjacency lists carrying edge weights
    pub fn weighted_adjacency(&self) -> Vec<Vec<(usize, f64)>> {
        (0..self.node_count())
            .map(|i| self.incident_edges(i).map(|(n, d)| (n, d.weight)).collect())
            .collect()
    }

    // ==================== Whole-graph metrics ====================

    /// 2E / N(N-1); 0 for graphs with fewer than two nodes
    pub fn density(&self) -> f64 {
        let n = self.node_count();
        if n < 2 {
            return 0.0;
        }
        2.0 * self.edge_count() as f64 / (n * (n - 1)) as f64
    }

    pub fn connected_components(&self) -> Vec<Vec<usize>> {
        algo::connected_components(&self.adjacency_lists())
    }

    /// A single component spanning all nodes. The empty graph is not connected.
    pub fn is_connected(&self) -> bool {
        !self.is_empty() && self.connected_components().len() == 1
    }

    pub fn stats(&self) -> GraphStats {
        let n = self.node_count();
        let mut stats = GraphStats {
            num_nodes: n,
            num_edges: self.edge_count(),
            density: self.density(),
            is_connected: false,
            ..Default::default()
        };
        if n == 0 {
            return stats;
        }

        let degrees: Vec<usize> = (0..n).map(|i| self.degree(i)).collect();
        stats.avg_degree = Some(degrees.iter().sum::<usize>() as f64 / n as f64);
        stats.max_degree = degrees.iter().max().copied();
        stats.min_degree = degrees.iter().min().copied();

        let components = self.connected_components();
        stats.is_connected = components.len() == 1;
        if !stats.is_connected {
            stats.num_components = Some(components.len());
            stats.largest_component_size = components.iter().map(|c| c.len()).max();
        }
        stats
    }

    /// Induced subgraph over the given ids. Unknown ids are ignored; node order
    /// follows this graph's order, edges keep their attributes.
    pub fn subgraph<S: AsRef<str>>(&self, ids: &[S]) -> NetworkGraph {
        let keep: FxHashSet<usize> = ids.iter().filter_map(|id| self.position(id.as_ref())).collect();

        let mut sub = NetworkGraph::new();
        for i in (0..self.node_count()).filter(|i| keep.contains(i)) {
            sub.ensure_node(self.node_id(i));
        }
        for (a, b, data) in self.edges() {
            if keep.contains(&a) && keep.contains(&b) {
                let sa = sub.ensure_node(self.node_id(a));
                let sb = sub.ensure_node(self.node_id(b));
                sub.insert_edge(sa, sb, data.clone());
            }
        }
        sub
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_plus_isolated() -> NetworkGraph {
        let mut g = NetworkGraph::new();
        let a = g.ensure_node("a");
        let b = g.ensure_node("b");
        let c = g.ensure_node("c");
        g.ensure_node("d");
        g.insert_edge(a, b, EdgeData::from_call(10.0));
        g.insert_edge(b, c, EdgeData::from_transaction(50.0));
        g.insert_edge(c, a, EdgeData::from_call(5.0));
        g
    }

    #[test]
    fn test_edge_lookup_is_undirected() {
        let g = triangle_plus_isolated();
        assert_eq!(g.edge("a", "b"), g.edge("b", "a"));
        assert!(g.edge("a", "d").is_none());
        assert!(g.edge("a", "zzz").is_none());
    }

    #[test]
    fn test_stats_disconnected() {
        let g = triangle_plus_isolated();
        let stats = g.stats();
        assert_eq!(stats.num_nodes, 4);
        assert_eq!(stats.num_edges, 3);
        assert!((stats.density - 0.5).abs() < 1e-12);
        assert!(!stats.is_connected);
        assert_eq!(stats.num_components, Some(2));
        assert_eq!(stats.largest_component_size, Some(3));
        assert_eq!(stats.min_degree, Some(0));
        assert_eq!(stats.max_degree, Some(2));
        assert!((stats.avg_degree.unwrap() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_stats_empty_graph() {
        let stats = NetworkGraph::new().stats();
        assert_eq!(stats.num_nodes, 0);
        assert!(!stats.is_connected);
        assert!(stats.avg_degree.is_none());
        assert_eq!(stats.density, 0.0);
    }

    #[test]
    fn test_subgraph_keeps_internal_edges() {
        let g = triangle_plus_isolated();
        let sub = g.subgraph(&["a", "b", "d", "missing"]);
        assert_eq!(sub.node_count(), 3);
        assert_eq!(sub.edge_count(), 1);
        assert_eq!(sub.edge("a", "b").unwrap().weight, 10.0);
    }

    #[test]
    fn test_neighbors_in_insertion_order() {
        let g = triangle_plus_isolated();
        assert_eq!(g.neighbor_ids("a"), vec!["b".to_string(), "c".to_string()]);
        assert!(g.neighbor_ids("d").is_empty());
    }

    #[test]
    fn test_amount_or_weight() {
        let mut e = EdgeData::from_call(7.0);
        assert_eq!(e.amount_or_weight(), 7.0);
        e.add_transaction(100.0);
        assert_eq!(e.amount_or_weight(), 100.0);
    }
}
