//! Fraud ring detection
//!
//! Partitions actors into suspected collaborating groups using one of several
//! interchangeable strategies, and describes each group.

mod dbscan;
mod hierarchical;
mod kmeans;

pub use dbscan::{dbscan, NOISE};
pub use hierarchical::ward;
pub use kmeans::{KMeans, KMeansFit};

use serde::Serialize;
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::config::AnalysisConfig;
use crate::graph::{algo, louvain::louvain, NetworkGraph};
use crate::kingpin::KingpinAnalyzer;
use crate::math::{mean, round_to, std_dev};
use crate::scaler::Standardizer;

/// Ring id → member ids (graph order). Ids are not stable across methods.
pub type Partition = BTreeMap<i64, Vec<String>>;

const LOUVAIN_RESOLUTION: f64 = 1.0;
const LOUVAIN_THRESHOLD: f64 = 1e-7;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum DetectionMethod {
    /// Louvain modularity communities
    #[default]
    Community,
    /// K-means over weighted adjacency rows
    KMeans { k: usize },
    /// Ward agglomeration over standardized node features
    Hierarchical { k: usize },
    /// DBSCAN over standardized node features; unclustered nodes go to ring -1
    Density { eps: f64, min_samples: usize },
}

impl DetectionMethod {
    pub fn name(&self) -> &'static str {
        match self {
            DetectionMethod::Community => "community",
            DetectionMethod::KMeans { .. } => "kmeans",
            DetectionMethod::Hierarchical { .. } => "hierarchical",
            DetectionMethod::Density { .. } => "dbscan",
        }
    }

    /// Resolve a method name with parameters from `config`
    pub fn parse_with(name: &str, config: &AnalysisConfig) -> Result<Self, String> {
        match name.trim().to_lowercase().as_str() {
            "community" | "louvain" => Ok(DetectionMethod::Community),
            "kmeans" | "k-means" => Ok(DetectionMethod::KMeans {
                k: config.n_clusters,
            }),
            "hierarchical" => Ok(DetectionMethod::Hierarchical {
                k: config.n_clusters,
            }),
            "dbscan" | "density" => Ok(DetectionMethod::Density {
                eps: config.dbscan_eps,
                min_samples: config.dbscan_min_samples,
            }),
            other => Err(format!(
                "unknown detection method '{}': expected community, kmeans, hierarchical or dbscan",
                other
            )),
        }
    }
}

impl FromStr for DetectionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_with(s, &AnalysisConfig::default())
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RingStats {
    pub ring_id: i64,
    pub size: usize,
    pub members: Vec<String>,
    pub internal_edges: usize,
    pub density: f64,
    pub avg_degree: f64,
    pub total_internal_amount: f64,
}

pub struct RingDetector<'g> {
    graph: &'g NetworkGraph,
    centrality: KingpinAnalyzer<'g>,
    config: AnalysisConfig,
    features: OnceCell<Vec<Vec<f64>>>,
}

impl<'g> RingDetector<'g> {
    pub fn new(graph: &'g NetworkGraph) -> Self {
        Self::from_config(graph, &AnalysisConfig::default())
    }

    pub fn from_config(graph: &'g NetworkGraph, config: &AnalysisConfig) -> Self {
        Self {
            graph,
            centrality: KingpinAnalyzer::from_config(graph, config),
            config: config.clone(),
            features: OnceCell::new(),
        }
    }

    fn all_nodes(&self) -> Vec<String> {
        self.graph.nodes().map(str::to_string).collect()
    }

    /// Group node positions by label, keeping graph order within each ring
    fn partition_from_labels(&self, labels: &[i64]) -> Partition {
        let mut rings = Partition::new();
        for (i, &label) in labels.iter().enumerate() {
            rings
                .entry(label)
                .or_default()
                .push(self.graph.node_id(i).to_string());
        }
        rings
    }

    pub fn detect(&self, method: DetectionMethod) -> Partition {
        if self.graph.is_empty() {
            return Partition::new();
        }
        match method {
            DetectionMethod::Community => self.detect_community(),
            DetectionMethod::KMeans { k } => self.detect_kmeans(k),
            DetectionMethod::Hierarchical { k } => self.detect_hierarchical(k),
            DetectionMethod::Density { eps, min_samples } => self.detect_dbscan(eps, min_samples),
        }
    }

    pub fn detect_community(&self) -> Partition {
        match louvain(
            &self.graph.weighted_adjacency(),
            LOUVAIN_RESOLUTION,
            LOUVAIN_THRESHOLD,
            self.config.random_state,
        ) {
            Ok(labels) => {
                let labels: Vec<i64> = labels.into_iter().map(|l| l as i64).collect();
                let rings = self.partition_from_labels(&labels);
                info!("Community detection found {} communities", rings.len());
                rings
            }
            Err(e) => {
                warn!(
                    fallback = "kmeans",
                    reason = %e,
                    "Community detection failed, falling back to k-means"
                );
                self.detect_kmeans(self.config.n_clusters)
            }
        }
    }

    pub fn detect_kmeans(&self, k: usize) -> Partition {
        let n = self.graph.node_count();
        if n == 0 {
            return Partition::new();
        }
        if n < k || k == 0 {
            warn!("Not enough nodes ({}) for {} clusters", n, k);
            return Partition::from([(0, self.all_nodes())]);
        }

        let rows = self.adjacency_matrix();
        let fit = KMeans::new(k, self.config.random_state).fit(&rows);
        let labels: Vec<i64> = fit.labels.into_iter().map(|l| l as i64).collect();
        let rings = self.partition_from_labels(&labels);
        info!("K-Means detected {} rings", rings.len());
        rings
    }

    pub fn detect_hierarchical(&self, k: usize) -> Partition {
        let n = self.graph.node_count();
        if n == 0 {
            return Partition::new();
        }
        if n < k || k == 0 {
            warn!("Not enough nodes ({}) for {} clusters", n, k);
            return Partition::from([(0, self.all_nodes())]);
        }

        let (_, scaled) = Standardizer::fit_transform(self.node_features());
        let labels: Vec<i64> = ward(&scaled, k).into_iter().map(|l| l as i64).collect();
        let rings = self.partition_from_labels(&labels);
        info!("Hierarchical clustering detected {} rings", rings.len());
        rings
    }

    pub fn detect_dbscan(&self, eps: f64, min_samples: usize) -> Partition {
        if self.graph.is_empty() {
            return Partition::new();
        }
        let (_, scaled) = Standardizer::fit_transform(self.node_features());
        let labels = dbscan(&scaled, eps, min_samples);
        let noise = labels.iter().filter(|&&l| l == NOISE).count();
        let rings = self.partition_from_labels(&labels);
        info!(
            "DBSCAN detected {} clusters ({} noise nodes)",
            rings.len(),
            noise
        );
        rings
    }

    /// kmeans, community and hierarchical partitions keyed by method name
    pub fn detect_all_methods(&self) -> BTreeMap<&'static str, Partition> {
        let k = self.config.n_clusters;
        [
            DetectionMethod::KMeans { k },
            DetectionMethod::Community,
            DetectionMethod::Hierarchical { k },
        ]
        .into_iter()
        .map(|m| (m.name(), self.detect(m)))
        .collect()
    }

    // ==================== Inputs ====================

    /// Dense weighted adjacency rows; absent edges are 0
    fn adjacency_matrix(&self) -> Vec<Vec<f64>> {
        let n = self.graph.node_count();
        (0..n)
            .map(|i| {
                let mut row = vec![0.0; n];
                for (j, data) in self.graph.incident_edges(i) {
                    row[j] = data.weight;
                }
                row
            })
            .collect()
    }

    /// Per node: degree, pagerank, betweenness, clustering coefficient and the
    /// mean, std, max and count of incident edge weights.
    pub fn node_features(&self) -> &[Vec<f64>] {
        self.features.get_or_init(|| {
            let pagerank = self.centrality.compute_pagerank();
            let betweenness = self.centrality.compute_betweenness();
            let clustering = algo::clustering_coefficients(&self.graph.adjacency_lists());

            (0..self.graph.node_count())
                .map(|i| {
                    let weights: Vec<f64> =
                        self.graph.incident_edges(i).map(|(_, d)| d.weight).collect();
                    let (w_mean, w_std, w_max) = if weights.is_empty() {
                        (0.0, 0.0, 0.0)
                    } else {
                        (
                            mean(&weights),
                            std_dev(&weights),
                            weights.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                        )
                    };
                    vec![
                        self.graph.degree(i) as f64,
                        pagerank[i],
                        betweenness[i],
                        clustering[i],
                        w_mean,
                        w_std,
                        w_max,
                        weights.len() as f64,
                    ]
                })
                .collect()
        })
    }

    // ==================== Statistics ====================

    /// Describe every ring with at least `min_ring_size` members, largest first.
    /// Smaller rings stay in the partition but are not reported here.
    pub fn get_ring_statistics(&self, partition: &Partition) -> Vec<RingStats> {
        let mut stats: Vec<RingStats> = partition
            .iter()
            .filter(|(_, members)| members.len() >= self.config.min_ring_size)
            .map(|(&ring_id, members)| {
                let sub = self.graph.subgraph(members);
                let total: f64 = sub.edges().map(|(_, _, d)| d.amount_or_weight()).sum();
                RingStats {
                    ring_id,
                    size: members.len(),
                    members: members.clone(),
                    internal_edges: sub.edge_count(),
                    density: sub.density(),
                    avg_degree: 2.0 * sub.edge_count() as f64 / members.len() as f64,
                    total_internal_amount: round_to(total, 2),
                }
            })
            .collect();
        stats.sort_by(|a, b| b.size.cmp(&a.size));
        stats
    }
}
