//! Full analysis run
//!
//! Builds the graph for a dataset, runs every analyzer once and joins the
//! results per actor. [`GraphSlot`] keeps the most recently built graph so a
//! long-lived caller can reload data without rebuilding on every query.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::info;

use crate::brief::{BriefGenerator, BriefRequest, NetworkOverview};
use crate::config::AnalysisConfig;
use crate::graph::{self, GraphStats, NetworkGraph};
use crate::kingpin::{KingpinAnalyzer, KingpinEntry};
use crate::math::round_to;
use crate::records::Dataset;
use crate::rings::{Partition, RingDetector, RingStats};
use crate::risk::{HighRiskNode, RiskScorer, RiskSummary, TrainReport};

/// One actor's row in the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActorAnalysis {
    pub actor_id: String,
    pub name: String,
    /// "Ring-{id}", or "None" when the actor is not in the graph
    pub ring: String,
    pub risk: f64,
    pub connections: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brief: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_actors: usize,
    pub total_rings: usize,
    pub high_risk_count: usize,
    pub analysis_time_seconds: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub stats: GraphStats,
    pub kingpins: Vec<KingpinEntry>,
    /// Community partition with ring ids as strings
    pub rings: BTreeMap<String, Vec<String>>,
    pub ring_statistics: Vec<RingStats>,
    pub training: TrainReport,
    pub risk_summary: RiskSummary,
    pub high_risk_nodes: Vec<HighRiskNode>,
    pub analysis: Vec<ActorAnalysis>,
    pub network_summary: String,
    pub summary: RunSummary,
}

pub fn ring_label(partition: &Partition, actor_id: &str) -> String {
    partition
        .iter()
        .find(|(_, members)| members.iter().any(|m| m == actor_id))
        .map(|(id, _)| format!("Ring-{}", id))
        .unwrap_or_else(|| "None".to_string())
}

/// Run every analyzer over `dataset`. With no generator, per-actor briefs
/// are omitted and the network summary uses the offline template.
pub fn analyze(
    dataset: &Dataset,
    config: &AnalysisConfig,
    briefs: Option<&BriefGenerator>,
) -> AnalysisReport {
    let graph = build_graph(dataset);
    analyze_graph(&graph, dataset, config, briefs)
}

/// Graph over the dataset's calls and transactions. Listed actors with no
/// records stay out of it and are reported with ring "None" and risk 0.
pub fn build_graph(dataset: &Dataset) -> NetworkGraph {
    graph::build(&dataset.calls, &dataset.transactions)
}

pub fn analyze_graph(
    graph: &NetworkGraph,
    dataset: &Dataset,
    config: &AnalysisConfig,
    briefs: Option<&BriefGenerator>,
) -> AnalysisReport {
    let start = Instant::now();

    let kingpins =
        KingpinAnalyzer::from_config(graph, config).get_top_kingpins(config.max_kingpins, true);

    let detector = RingDetector::from_config(graph, config);
    let partition = detector.detect_community();
    let ring_statistics = detector.get_ring_statistics(&partition);

    let mut scorer = RiskScorer::from_config(graph, config);
    let training = scorer.train();
    let scores: BTreeMap<String, f64> = scorer.score_nodes().into_iter().collect();
    let risk_summary = scorer.get_risk_summary(config.risk_threshold);
    let high_risk_nodes = scorer.get_high_risk_nodes(config.risk_threshold);

    let analysis: Vec<ActorAnalysis> = dataset
        .actors
        .iter()
        .map(|actor| {
            let ring = ring_label(&partition, &actor.actor_id);
            let connections = graph.neighbor_ids(&actor.actor_id);
            let risk = scores.get(&actor.actor_id).copied().unwrap_or(0.0);
            let brief = briefs.map(|generator| {
                generator.generate_brief(&BriefRequest {
                    name: actor.name.clone(),
                    risk_score: risk,
                    ring_label: ring.clone(),
                    connections: connections.clone(),
                    context: Vec::new(),
                })
            });
            ActorAnalysis {
                actor_id: actor.actor_id.clone(),
                name: actor.name.clone(),
                ring,
                risk,
                connections,
                brief,
            }
        })
        .collect();

    let overview = NetworkOverview {
        kingpins: kingpins.iter().map(|k| k.node.clone()).collect(),
        ring_sizes: partition.values().map(Vec::len).collect(),
        high_risk_count: high_risk_nodes.len(),
    };
    let network_summary = match briefs {
        Some(generator) => generator.generate_network_summary(&overview),
        None => crate::brief::fallback_network_summary(&overview),
    };

    let elapsed = start.elapsed().as_secs_f64();
    info!("Full analysis completed in {:.2} seconds", elapsed);

    AnalysisReport {
        stats: graph.stats(),
        kingpins,
        rings: partition
            .iter()
            .map(|(id, members)| (id.to_string(), members.clone()))
            .collect(),
        ring_statistics,
        training,
        summary: RunSummary {
            total_actors: analysis.len(),
            total_rings: partition.len(),
            high_risk_count: high_risk_nodes.len(),
            analysis_time_seconds: round_to(elapsed, 2),
        },
        risk_summary,
        high_risk_nodes,
        analysis,
        network_summary,
    }
}

// ============================================================================
// Shared graph slot
// ============================================================================

/// A built graph together with the dataset it came from
#[derive(Debug)]
pub struct GraphHandle {
    pub version: u64,
    pub dataset: Dataset,
    pub graph: NetworkGraph,
}

/// Holds the current graph. `publish` replaces it wholesale; readers keep
/// whatever handle they already cloned.
#[derive(Debug, Default)]
pub struct GraphSlot {
    current: RwLock<Option<Arc<GraphHandle>>>,
    versions: AtomicU64,
}

impl GraphSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph for `dataset` and make it current
    pub fn publish(&self, dataset: Dataset) -> Arc<GraphHandle> {
        let graph = build_graph(&dataset);
        let version = self.versions.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = Arc::new(GraphHandle {
            version,
            dataset,
            graph,
        });
        // The slot only ever holds a complete Arc, so a poisoned lock is still usable.
        let mut slot = self.current.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Arc::clone(&handle));
        info!(
            "Published graph v{} ({} nodes, {} edges)",
            version,
            handle.graph.node_count(),
            handle.graph.edge_count()
        );
        handle
    }

    pub fn current(&self) -> Option<Arc<GraphHandle>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{sample_dataset, Actor, CallRecord};

    #[test]
    fn test_ring_label() {
        let mut partition = Partition::new();
        partition.insert(3, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(ring_label(&partition, "b"), "Ring-3");
        assert_eq!(ring_label(&partition, "z"), "None");
    }

    fn unlinked_dataset() -> Dataset {
        let actor = |id: &str, name: &str| Actor {
            actor_id: id.to_string(),
            name: name.to_string(),
        };
        Dataset {
            actors: vec![actor("A", "Ann"), actor("B", "Ben"), actor("Z", "Loner")],
            calls: vec![CallRecord::new("A", "B", 60.0)],
            transactions: Vec::new(),
        }
    }

    #[test]
    fn test_build_graph_skips_unlinked_actors() {
        let g = build_graph(&unlinked_dataset());
        assert_eq!(g.node_count(), 2);
        assert!(!g.contains("Z"));

        let pagerank = KingpinAnalyzer::new(&g).compute_pagerank().to_vec();
        assert_eq!(pagerank.len(), 2);
        for value in pagerank {
            assert!((value - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_unlinked_actor_reported_without_ring() {
        let report = analyze(&unlinked_dataset(), &AnalysisConfig::default(), None);
        assert_eq!(report.stats.num_nodes, 2);
        assert_eq!(report.summary.total_actors, 3);
        assert_eq!(report.summary.total_rings, 1);

        let z = report.analysis.iter().find(|a| a.actor_id == "Z").unwrap();
        assert_eq!(z.ring, "None");
        assert_eq!(z.risk, 0.0);
        assert!(z.connections.is_empty());

        let a = report.analysis.iter().find(|a| a.actor_id == "A").unwrap();
        assert!(a.ring.starts_with("Ring-"));
        assert_eq!(a.connections, vec!["B".to_string()]);
    }

    #[test]
    fn test_slot_versions() {
        let slot = GraphSlot::new();
        assert!(slot.current().is_none());

        let first = slot.publish(sample_dataset());
        let second = slot.publish(Dataset::default());
        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);

        let current = slot.current().unwrap();
        assert_eq!(current.version, 2);
        assert!(current.graph.is_empty());
        // Old handles stay valid after a swap.
        assert!(first.graph.node_count() > 0);
    }

    #[test]
    fn test_analyze_without_briefs() {
        let report = analyze(&sample_dataset(), &AnalysisConfig::default(), None);
        assert!(report.analysis.iter().all(|a| a.brief.is_none()));
        assert!(report.network_summary.starts_with("NETWORK ANALYSIS SUMMARY"));
        assert_eq!(report.summary.total_actors, sample_dataset().actors.len());
    }
}
