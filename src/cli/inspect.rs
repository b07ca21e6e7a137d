//! Single-view commands: kingpins, rings, risk, stats

use anyhow::{anyhow, Result};
use console::style;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::AnalysisConfig;
use crate::kingpin::{KingpinAnalyzer, KingpinEntry};
use crate::pipeline::build_graph;
use crate::records::Dataset;
use crate::rings::{DetectionMethod, Partition, RingDetector, RingStats, NOISE};
use crate::risk::{HighRiskNode, RiskScorer, RiskSummary, TrainReport};

#[derive(Serialize)]
struct KingpinsOutput {
    kingpins: Vec<KingpinEntry>,
    total_nodes: usize,
}

pub fn kingpins(
    dataset: &Dataset,
    config: &AnalysisConfig,
    n: usize,
    include_metrics: bool,
    all_centralities: bool,
    json: bool,
) -> Result<()> {
    let graph = build_graph(dataset);
    let analyzer = KingpinAnalyzer::from_config(&graph, config);

    if all_centralities {
        let tables = analyzer.get_all_centralities();
        if json {
            return super::print_json(&tables);
        }
        for (metric, table) in &tables {
            println!("\n{}", style(metric).bold());
            for (node, value) in table {
                println!("  {:<10} {:.6}", node, value);
            }
        }
        return Ok(());
    }

    let output = KingpinsOutput {
        kingpins: analyzer.get_top_kingpins(n, include_metrics),
        total_nodes: graph.node_count(),
    };
    if json {
        return super::print_json(&output);
    }

    println!(
        "\n{} (of {} actors)\n",
        style("Kingpins").bold(),
        output.total_nodes
    );
    for entry in &output.kingpins {
        match &entry.details {
            Some(d) => println!(
                "  {:>3}. {:<10} {}  pagerank {:.6}  betweenness {:.6}  degree {:.6}  [{}]",
                d.rank,
                entry.node,
                style(format!("{:.6}", entry.score)).cyan(),
                d.pagerank,
                d.betweenness,
                d.degree_centrality,
                d.connections.join(", ")
            ),
            None => println!("  {:<10} {}", entry.node, style(format!("{:.6}", entry.score)).cyan()),
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct RingsOutput {
    method: String,
    rings: BTreeMap<String, Vec<String>>,
    ring_statistics: Vec<RingStats>,
}

fn string_keys(partition: &Partition) -> BTreeMap<String, Vec<String>> {
    partition
        .iter()
        .map(|(id, members)| (id.to_string(), members.clone()))
        .collect()
}

pub fn rings(
    dataset: &Dataset,
    config: &AnalysisConfig,
    method: &str,
    all: bool,
    json: bool,
) -> Result<()> {
    let graph = build_graph(dataset);
    let detector = RingDetector::from_config(&graph, config);

    let outputs: Vec<RingsOutput> = if all {
        detector
            .detect_all_methods()
            .into_iter()
            .map(|(name, partition)| RingsOutput {
                method: name.to_string(),
                ring_statistics: detector.get_ring_statistics(&partition),
                rings: string_keys(&partition),
            })
            .collect()
    } else {
        let method = DetectionMethod::parse_with(method, config).map_err(|e| anyhow!(e))?;
        let partition = detector.detect(method);
        vec![RingsOutput {
            method: method.to_string(),
            ring_statistics: detector.get_ring_statistics(&partition),
            rings: string_keys(&partition),
        }]
    };

    if json {
        return match outputs.as_slice() {
            [single] => super::print_json(single),
            _ => super::print_json(&outputs),
        };
    }

    for output in &outputs {
        println!(
            "\n{} {} ({} rings)",
            style("Rings by").bold(),
            style(&output.method).cyan(),
            output.rings.len()
        );
        for (id, members) in &output.rings {
            let label = if id.parse::<i64>().ok() == Some(NOISE) {
                style("noise".to_string()).dim().to_string()
            } else {
                format!("Ring-{}", id)
            };
            println!("  {:<10} {}", label, members.join(", "));
        }
        for ring in &output.ring_statistics {
            println!(
                "  Ring-{}: size {}, {} internal edges, density {:.3}, avg degree {:.2}, amount {:.2}",
                ring.ring_id,
                ring.size,
                ring.internal_edges,
                ring.density,
                ring.avg_degree,
                ring.total_internal_amount
            );
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct RiskOutput {
    risk_scores: BTreeMap<String, f64>,
    training: TrainReport,
    summary: RiskSummary,
    high_risk_nodes: Vec<HighRiskNode>,
}

pub fn risk(dataset: &Dataset, config: &AnalysisConfig, threshold: f64, json: bool) -> Result<()> {
    let graph = build_graph(dataset);
    let mut scorer = RiskScorer::from_config(&graph, config);
    let training = scorer.train();
    let output = RiskOutput {
        risk_scores: scorer.score_nodes().into_iter().collect(),
        summary: scorer.get_risk_summary(threshold),
        high_risk_nodes: scorer.get_high_risk_nodes(threshold),
        training,
    };
    if json {
        return super::print_json(&output);
    }

    println!("\n{}", style("Risk model").bold());
    match (output.training.cv_score_mean, output.training.cv_score_std) {
        (Some(mean), Some(std)) => println!(
            "  {} samples, CV accuracy {:.3} ± {:.3}",
            output.training.n_samples, mean, std
        ),
        _ => println!(
            "  {} samples, {}",
            output.training.n_samples,
            style("not enough data to train").yellow()
        ),
    }
    for (name, importance) in &output.training.top_features {
        println!("    {:<20} {:.4}", name, importance);
    }

    let s = &output.summary;
    println!(
        "\n  {} nodes: mean {:.4}, median {:.4}, min {:.4}, max {:.4}",
        s.total_nodes, s.mean_risk, s.median_risk, s.min_risk, s.max_risk
    );
    println!(
        "  low {}, medium {}, high {}",
        s.risk_distribution.low, s.risk_distribution.medium, s.risk_distribution.high
    );

    println!(
        "\n{} (threshold {:.2})",
        style("High-risk actors").bold(),
        threshold
    );
    if output.high_risk_nodes.is_empty() {
        println!("  none");
    }
    for node in &output.high_risk_nodes {
        println!(
            "  {:<10} {}  degree {}",
            node.node,
            style(format!("{:.4}", node.risk_score)).red(),
            node.degree
        );
    }
    Ok(())
}

pub fn stats(dataset: &Dataset, json: bool) -> Result<()> {
    let graph = build_graph(dataset);
    let stats = graph.stats();
    if json {
        return super::print_json(&stats);
    }
    println!("\n{}", style("Graph statistics").bold());
    println!("  Nodes:      {}", style(stats.num_nodes).cyan());
    println!("  Edges:      {}", style(stats.num_edges).cyan());
    println!("  Density:    {:.4}", stats.density);
    println!("  Connected:  {}", stats.is_connected);
    if let (Some(avg), Some(min), Some(max)) = (stats.avg_degree, stats.min_degree, stats.max_degree) {
        println!("  Degree:     avg {:.2}, min {}, max {}", avg, min, max);
    }
    if let (Some(components), Some(largest)) = (stats.num_components, stats.largest_component_size) {
        println!("  Components: {} (largest {})", components, largest);
    }
    Ok(())
}
