//! Kingpin detection
//!
//! Ranks actors by structural influence. Every metric table is computed on
//! first access and memoized for the lifetime of the analyzer; a new graph
//! needs a new analyzer.

use serde::Serialize;
use std::cell::OnceCell;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::graph::{algo, NetworkGraph};
use crate::math::round_to;

pub const DEFAULT_DAMPING: f64 = 0.85;
const PAGERANK_MAX_ITER: usize = 100;
const EIGENVECTOR_MAX_ITER: usize = 1000;
const TOLERANCE: f64 = 1e-6;

/// Centrality metrics exposed by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    PageRank,
    Betweenness,
    Degree,
    Closeness,
    Eigenvector,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::PageRank,
        Metric::Betweenness,
        Metric::Degree,
        Metric::Closeness,
        Metric::Eigenvector,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::PageRank => "pagerank",
            Metric::Betweenness => "betweenness",
            Metric::Degree => "degree",
            Metric::Closeness => "closeness",
            Metric::Eigenvector => "eigenvector",
        }
    }
}

/// Detailed metrics attached when requested
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KingpinDetails {
    pub rank: usize,
    pub pagerank: f64,
    pub betweenness: f64,
    pub degree_centrality: f64,
    pub connections: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KingpinEntry {
    pub node: String,
    pub score: f64,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub details: Option<KingpinDetails>,
}

pub struct KingpinAnalyzer<'g> {
    graph: &'g NetworkGraph,
    pagerank_weight: f64,
    betweenness_weight: f64,
    pagerank_max_iter: usize,
    eigenvector_max_iter: usize,
    tolerance: f64,
    pagerank: OnceCell<Vec<f64>>,
    betweenness: OnceCell<Vec<f64>>,
    degree: OnceCell<Vec<f64>>,
    closeness: OnceCell<Vec<f64>>,
    eigenvector: OnceCell<Vec<f64>>,
    scores: OnceCell<Vec<f64>>,
}

impl<'g> KingpinAnalyzer<'g> {
    /// Analyzer with the default 0.6 / 0.4 score weights
    pub fn new(graph: &'g NetworkGraph) -> Self {
        let defaults = AnalysisConfig::default();
        Self::with_weights(graph, defaults.pagerank_weight, defaults.betweenness_weight)
    }

    pub fn from_config(graph: &'g NetworkGraph, config: &AnalysisConfig) -> Self {
        Self::with_weights(graph, config.pagerank_weight, config.betweenness_weight)
    }

    pub fn with_weights(graph: &'g NetworkGraph, pagerank_weight: f64, betweenness_weight: f64) -> Self {
        Self {
            graph,
            pagerank_weight,
            betweenness_weight,
            pagerank_max_iter: PAGERANK_MAX_ITER,
            eigenvector_max_iter: EIGENVECTOR_MAX_ITER,
            tolerance: TOLERANCE,
            pagerank: OnceCell::new(),
            betweenness: OnceCell::new(),
            degree: OnceCell::new(),
            closeness: OnceCell::new(),
            eigenvector: OnceCell::new(),
            scores: OnceCell::new(),
        }
    }

    /// Override the power-iteration limits (defaults 100 / 1000 / 1e-6).
    /// Must be called before any table is computed.
    pub fn with_limits(
        mut self,
        pagerank_max_iter: usize,
        eigenvector_max_iter: usize,
        tolerance: f64,
    ) -> Self {
        self.pagerank_max_iter = pagerank_max_iter;
        self.eigenvector_max_iter = eigenvector_max_iter;
        self.tolerance = tolerance;
        self
    }

    pub fn graph(&self) -> &'g NetworkGraph {
        self.graph
    }

    // ==================== Metric tables ====================

    /// Edge-weighted PageRank; uniform 1/N if the iteration fails
    pub fn compute_pagerank(&self) -> &[f64] {
        self.pagerank.get_or_init(|| {
            let n = self.graph.node_count();
            match algo::pagerank(
                &self.graph.weighted_adjacency(),
                DEFAULT_DAMPING,
                self.pagerank_max_iter,
                self.tolerance,
            ) {
                Ok(pr) => {
                    debug!("PageRank computed for {} nodes", n);
                    pr
                }
                Err(e) => {
                    warn!("PageRank computation failed: {}", e);
                    vec![1.0 / n as f64; n]
                }
            }
        })
    }

    pub fn compute_betweenness(&self) -> &[f64] {
        self.betweenness.get_or_init(|| {
            let bc = algo::betweenness_centrality(&self.graph.adjacency_lists());
            debug!("Betweenness centrality computed for {} nodes", bc.len());
            bc
        })
    }

    /// degree / (N - 1); all zeros when N <= 1
    pub fn compute_degree_centrality(&self) -> &[f64] {
        self.degree.get_or_init(|| {
            let n = self.graph.node_count();
            if n <= 1 {
                return vec![0.0; n];
            }
            let scale = 1.0 / (n - 1) as f64;
            (0..n).map(|i| self.graph.degree(i) as f64 * scale).collect()
        })
    }

    pub fn compute_closeness(&self) -> &[f64] {
        self.closeness
            .get_or_init(|| algo::closeness_centrality(&self.graph.adjacency_lists()))
    }

    /// Eigenvector centrality; degree centrality if power iteration fails.
    /// Nodes without edges score 0 once the graph has any edge.
    pub fn compute_eigenvector(&self) -> &[f64] {
        self.eigenvector.get_or_init(|| {
            if self.graph.is_empty() {
                return Vec::new();
            }
            match algo::eigenvector_centrality(
                &self.graph.adjacency_lists(),
                self.eigenvector_max_iter,
                self.tolerance,
            ) {
                Ok(mut ev) => {
                    if self.graph.edge_count() > 0 {
                        for (i, value) in ev.iter_mut().enumerate() {
                            if self.graph.degree(i) == 0 {
                                *value = 0.0;
                            }
                        }
                    }
                    ev
                }
                Err(e) => {
                    warn!("Eigenvector centrality failed ({}), using degree centrality", e);
                    self.compute_degree_centrality().to_vec()
                }
            }
        })
    }

    pub fn metric(&self, metric: Metric) -> &[f64] {
        match metric {
            Metric::PageRank => self.compute_pagerank(),
            Metric::Betweenness => self.compute_betweenness(),
            Metric::Degree => self.compute_degree_centrality(),
            Metric::Closeness => self.compute_closeness(),
            Metric::Eigenvector => self.compute_eigenvector(),
        }
    }

    // ==================== Ranking ====================

    /// Composite score per node (graph order), rounded to 6 decimals
    pub fn compute_kingpin_scores(&self) -> &[f64] {
        self.scores.get_or_init(|| {
            let pagerank = self.compute_pagerank();
            let betweenness = self.compute_betweenness();
            let scores: Vec<f64> = pagerank
                .iter()
                .zip(betweenness)
                .map(|(p, b)| round_to(self.pagerank_weight * p + self.betweenness_weight * b, 6))
                .collect();
            info!("Computed kingpin scores for {} nodes", scores.len());
            scores
        })
    }

    /// Node positions ordered by score descending; ties keep graph order
    fn ranked(&self) -> Vec<usize> {
        let scores = self.compute_kingpin_scores();
        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
        order
    }

    /// (node, score) for every node, highest first
    pub fn kingpin_scores(&self) -> Vec<(String, f64)> {
        let scores = self.compute_kingpin_scores();
        self.ranked()
            .into_iter()
            .map(|i| (self.graph.node_id(i).to_string(), scores[i]))
            .collect()
    }

    /// The `n` highest-scoring nodes. With `include_metrics` each entry also
    /// carries its rank, constituent metrics and neighbor list.
    pub fn get_top_kingpins(&self, n: usize, include_metrics: bool) -> Vec<KingpinEntry> {
        let scores = self.compute_kingpin_scores();
        let top = self.ranked().into_iter().take(n);

        if !include_metrics {
            return top
                .map(|i| KingpinEntry {
                    node: self.graph.node_id(i).to_string(),
                    score: scores[i],
                    details: None,
                })
                .collect();
        }

        let pagerank = self.compute_pagerank();
        let betweenness = self.compute_betweenness();
        let degree = self.compute_degree_centrality();
        top.enumerate()
            .map(|(rank, i)| {
                let id = self.graph.node_id(i);
                KingpinEntry {
                    node: id.to_string(),
                    score: scores[i],
                    details: Some(KingpinDetails {
                        rank: rank + 1,
                        pagerank: round_to(pagerank[i], 6),
                        betweenness: round_to(betweenness[i], 6),
                        degree_centrality: round_to(degree[i], 6),
                        connections: self.graph.neighbor_ids(id),
                    }),
                }
            })
            .collect()
    }

    /// All five metric tables keyed by metric name, then node id
    pub fn get_all_centralities(&self) -> BTreeMap<&'static str, BTreeMap<String, f64>> {
        Metric::ALL
            .iter()
            .map(|&metric| {
                let table = self
                    .metric(metric)
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (self.graph.node_id(i).to_string(), *v))
                    .collect();
                (metric.as_str(), table)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build;
    use crate::records::{sample_dataset, CallRecord};

    fn star() -> NetworkGraph {
        build(
            &[
                CallRecord::new("hub", "a", 10.0),
                CallRecord::new("hub", "b", 10.0),
                CallRecord::new("hub", "c", 10.0),
                CallRecord::new("hub", "d", 10.0),
            ],
            &[],
        )
    }

    #[test]
    fn test_pagerank_falls_back_to_uniform() {
        let g = star();
        let analyzer = KingpinAnalyzer::new(&g).with_limits(1, EIGENVECTOR_MAX_ITER, 0.0);
        assert_eq!(analyzer.compute_pagerank(), &[0.2; 5][..]);
        // Scores are still produced from the fallback table.
        assert_eq!(analyzer.compute_kingpin_scores().len(), 5);
    }

    #[test]
    fn test_eigenvector_falls_back_to_degree() {
        let g = star();
        let analyzer = KingpinAnalyzer::new(&g).with_limits(PAGERANK_MAX_ITER, 1, 0.0);
        assert_eq!(analyzer.compute_eigenvector(), &[1.0, 0.25, 0.25, 0.25, 0.25][..]);
        assert_eq!(analyzer.compute_eigenvector(), analyzer.compute_degree_centrality());
    }

    #[test]
    fn test_default_limits_converge_on_star() {
        let g = star();
        let analyzer = KingpinAnalyzer::new(&g);
        let pagerank = analyzer.compute_pagerank();
        assert!(pagerank[0] > pagerank[1]);
        assert!((pagerank.iter().sum::<f64>() - 1.0).abs() < 1e-6);
        assert_ne!(analyzer.compute_eigenvector(), analyzer.compute_degree_centrality());
    }

    #[test]
    fn test_isolated_node_has_zero_eigenvector() {
        let mut builder = crate::graph::GraphBuilder::new();
        builder
            .add_call("a", "b", 1.0)
            .add_call("b", "c", 1.0)
            .add_call("c", "a", 1.0)
            .add_actor("z");
        let g = builder.finish();
        let analyzer = KingpinAnalyzer::new(&g);

        let eigen = analyzer.compute_eigenvector();
        assert_eq!(eigen[3], 0.0);
        assert!(eigen[..3].iter().all(|v| (v - 1.0 / 3f64.sqrt()).abs() < 1e-4));
        assert_eq!(analyzer.compute_degree_centrality()[3], 0.0);
        assert_eq!(analyzer.compute_betweenness()[3], 0.0);
        assert_eq!(analyzer.compute_closeness()[3], 0.0);
        assert!(analyzer.compute_pagerank()[3] > 0.0);
    }

    #[test]
    fn test_hub_is_top_kingpin() {
        let g = star();
        let analyzer = KingpinAnalyzer::new(&g);
        let top = analyzer.get_top_kingpins(1, false);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].node, "hub");
        assert!(top[0].details.is_none());
    }

    #[test]
    fn test_ties_keep_graph_order() {
        let g = star();
        let analyzer = KingpinAnalyzer::new(&g);
        let nodes: Vec<String> = analyzer
            .get_top_kingpins(5, false)
            .into_iter()
            .map(|e| e.node)
            .collect();
        assert_eq!(nodes, vec!["hub", "a", "b", "c", "d"]);
    }

    #[test]
    fn test_ranking_is_descending_total_order() {
        let data = sample_dataset();
        let g = build(&data.calls, &data.transactions);
        let analyzer = KingpinAnalyzer::new(&g);
        let ranked = analyzer.kingpin_scores();
        assert_eq!(ranked.len(), g.node_count());
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn test_n_larger_than_graph_returns_all() {
        let g = star();
        let analyzer = KingpinAnalyzer::new(&g);
        assert_eq!(analyzer.get_top_kingpins(100, true).len(), 5);
    }

    #[test]
    fn test_detailed_entries() {
        let g = star();
        let analyzer = KingpinAnalyzer::new(&g);
        let top = analyzer.get_top_kingpins(2, true);
        let hub = top[0].details.as_ref().unwrap();
        assert_eq!(hub.rank, 1);
        assert_eq!(hub.degree_centrality, 1.0);
        assert_eq!(hub.betweenness, 1.0);
        assert_eq!(hub.connections.len(), 4);
        assert_eq!(top[1].details.as_ref().unwrap().rank, 2);

        let json = serde_json::to_value(&top[0]).unwrap();
        assert_eq!(json["rank"], 1);
        assert_eq!(json["node"], "hub");
    }

    #[test]
    fn test_custom_weights() {
        let g = star();
        let analyzer = KingpinAnalyzer::with_weights(&g, 0.0, 1.0);
        let scores = analyzer.compute_kingpin_scores();
        assert_eq!(scores[0], 1.0);
        assert_eq!(scores[1], 0.0);
    }

    #[test]
    fn test_empty_graph_never_errors() {
        let g = NetworkGraph::new();
        let analyzer = KingpinAnalyzer::new(&g);
        assert!(analyzer.get_top_kingpins(10, true).is_empty());
        for table in analyzer.get_all_centralities().values() {
            assert!(table.is_empty());
        }
    }

    #[test]
    fn test_two_node_graph() {
        let g = build(&[CallRecord::new("x", "y", 10.0)], &[]);
        let analyzer = KingpinAnalyzer::new(&g);
        assert_eq!(analyzer.compute_degree_centrality(), &[1.0, 1.0]);
        assert_eq!(analyzer.compute_pagerank()[0], analyzer.compute_pagerank()[1]);
        assert_eq!(analyzer.compute_betweenness(), &[0.0, 0.0]);
    }

    #[test]
    fn test_memoized() {
        let g = star();
        let analyzer = KingpinAnalyzer::new(&g);
        let first = analyzer.compute_pagerank().as_ptr();
        let second = analyzer.compute_pagerank().as_ptr();
        assert_eq!(first, second);
    }

    #[test]
    fn test_all_centralities_keys() {
        let g = star();
        let analyzer = KingpinAnalyzer::new(&g);
        let all = analyzer.get_all_centralities();
        let keys: Vec<&str> = all.keys().copied().collect();
        assert_eq!(
            keys,
            vec!["betweenness", "closeness", "degree", "eigenvector", "pagerank"]
        );
        assert_eq!(all["degree"]["hub"], 1.0);
    }
}
