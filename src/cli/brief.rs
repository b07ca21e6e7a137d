//! Brief command - intelligence brief for one actor

use anyhow::{bail, Result};
use serde::Serialize;

use crate::brief::{BriefGenerator, BriefRequest};
use crate::config::AnalysisConfig;
use crate::pipeline::{build_graph, ring_label};
use crate::rings::RingDetector;
use crate::records::Dataset;
use crate::risk::RiskScorer;

#[derive(Serialize)]
struct BriefOutput {
    actor_id: String,
    name: String,
    brief: String,
}

pub fn run(
    dataset: &Dataset,
    config: &AnalysisConfig,
    actor_id: &str,
    offline: bool,
    json: bool,
) -> Result<()> {
    let graph = build_graph(dataset);
    let listed = dataset.actors.iter().any(|a| a.actor_id == actor_id);
    if !graph.contains(actor_id) && !listed {
        bail!("Unknown actor '{}'", actor_id);
    }

    let partition = RingDetector::from_config(&graph, config).detect_community();
    let risk = RiskScorer::from_config(&graph, config)
        .score_nodes()
        .into_iter()
        .find(|(node, _)| node == actor_id)
        .map(|(_, score)| score)
        .unwrap_or(0.0);
    let degree = graph.degree_of(actor_id);

    let request = BriefRequest {
        name: dataset.actor_name(actor_id).to_string(),
        risk_score: risk,
        ring_label: ring_label(&partition, actor_id),
        connections: graph.neighbor_ids(actor_id),
        context: vec![
            ("Actor ID".to_string(), actor_id.to_string()),
            ("Degree".to_string(), degree.to_string()),
        ],
    };

    let generator = if offline {
        BriefGenerator::offline()
    } else {
        BriefGenerator::from_config(&config.brief)
    };
    let output = BriefOutput {
        actor_id: actor_id.to_string(),
        name: request.name.clone(),
        brief: generator.generate_brief(&request),
    };

    if json {
        super::print_json(&output)
    } else {
        println!("{}", output.brief);
        Ok(())
    }
}
