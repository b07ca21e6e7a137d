//! Per-node feature extraction for risk scoring
//!
//! 15 features per actor, in a fixed order:
//!
//! | #  | Feature             | Source                                      |
//! |----|---------------------|---------------------------------------------|
//! | 0  | degree              | number of incident edges                    |
//! | 1  | pagerank            | edge-weighted PageRank                      |
//! | 2  | betweenness         | normalized betweenness                      |
//! | 3  | closeness           | Wasserman-Faust closeness                   |
//! | 4  | clustering          | local clustering coefficient                |
//! | 5  | degree_centrality   | degree / (N - 1)                            |
//! | 6  | weight_mean         | incident edge weights                       |
//! | 7  | weight_std          | population std, 0 with fewer than 2 edges   |
//! | 8  | weight_max          |                                             |
//! | 9  | weight_sum          |                                             |
//! | 10 | amount_mean         | only edges with a positive total_amount     |
//! | 11 | amount_max          |                                             |
//! | 12 | amount_sum          |                                             |
//! | 13 | neighbor_avg_degree | mean degree of direct neighbors             |
//! | 14 | num_neighbors       |                                             |

use rayon::prelude::*;

use crate::graph::{algo, NetworkGraph};
use crate::kingpin::KingpinAnalyzer;
use crate::math::{mean, std_dev};

pub const NUM_FEATURES: usize = 15;

pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "degree",
    "pagerank",
    "betweenness",
    "closeness",
    "clustering",
    "degree_centrality",
    "weight_mean",
    "weight_std",
    "weight_max",
    "weight_sum",
    "amount_mean",
    "amount_max",
    "amount_sum",
    "neighbor_avg_degree",
    "num_neighbors",
];

pub const DEGREE: usize = 0;
pub const PAGERANK: usize = 1;
pub const AMOUNT_SUM: usize = 12;

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub values: [f64; NUM_FEATURES],
}

impl FeatureVector {
    pub fn new(values: [f64; NUM_FEATURES]) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values[i])
    }
}

/// Extract features for every node (PARALLELIZED). Output is in graph order.
pub fn extract_features(graph: &NetworkGraph, centrality: &KingpinAnalyzer<'_>) -> Vec<FeatureVector> {
    let pagerank = centrality.compute_pagerank();
    let betweenness = centrality.compute_betweenness();
    let closeness = centrality.compute_closeness();
    let degree_centrality = centrality.compute_degree_centrality();
    let clustering = algo::clustering_coefficients(&graph.adjacency_lists());

    (0..graph.node_count())
        .into_par_iter()
        .map(|i| {
            let weights: Vec<f64> = graph.incident_edges(i).map(|(_, d)| d.weight).collect();
            let amounts: Vec<f64> = graph
                .incident_edges(i)
                .filter_map(|(_, d)| d.total_amount)
                .filter(|a| *a > 0.0)
                .collect();
            let neighbor_degrees: Vec<f64> =
                graph.neighbors(i).map(|n| graph.degree(n) as f64).collect();

            let (w_mean, w_std, w_max, w_sum) = if weights.is_empty() {
                (0.0, 0.0, 0.0, 0.0)
            } else {
                (
                    mean(&weights),
                    std_dev(&weights),
                    max(&weights),
                    weights.iter().sum(),
                )
            };
            let (a_mean, a_max, a_sum) = if amounts.is_empty() {
                (0.0, 0.0, 0.0)
            } else {
                (mean(&amounts), max(&amounts), amounts.iter().sum())
            };

            FeatureVector::new([
                graph.degree(i) as f64,
                pagerank[i],
                betweenness[i],
                closeness[i],
                clustering[i],
                degree_centrality[i],
                w_mean,
                w_std,
                w_max,
                w_sum,
                a_mean,
                a_max,
                a_sum,
                mean(&neighbor_degrees),
                neighbor_degrees.len() as f64,
            ])
        })
        .collect()
}

fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}
