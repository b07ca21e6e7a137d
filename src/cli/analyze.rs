//! Analyze and demo commands

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use crate::brief::{risk_level, BriefGenerator};
use crate::config::AnalysisConfig;
use crate::pipeline::{self, AnalysisReport};
use crate::records::Dataset;

pub fn run(
    dataset: &Dataset,
    config: &AnalysisConfig,
    with_briefs: bool,
    json: bool,
    output: Option<&Path>,
) -> Result<()> {
    let generator = with_briefs.then(|| BriefGenerator::from_config(&config.brief));
    let report = pipeline::analyze(dataset, config, generator.as_ref());

    if let Some(path) = output {
        let content = if json {
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        } else {
            render_text(&report, false)
        };
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        eprintln!("Report written to {}", style(path.display()).cyan());
        return Ok(());
    }

    if json {
        super::print_json(&report)
    } else {
        print!("{}", render_text(&report, true));
        Ok(())
    }
}

/// Sample-data walkthrough; briefs always come from the template
pub fn demo(dataset: &Dataset, config: &AnalysisConfig, json: bool) -> Result<()> {
    let generator = BriefGenerator::offline();
    let report = pipeline::analyze(dataset, config, Some(&generator));
    if json {
        return super::print_json(&report);
    }
    println!(
        "\n{} {} actors, {} calls, {} transactions (built-in sample)",
        style("Demo:").bold(),
        dataset.actors.len(),
        dataset.calls.len(),
        dataset.transactions.len()
    );
    print!("{}", render_text(&report, true));
    Ok(())
}

fn level_styled(risk: f64, colored: bool) -> String {
    let level = risk_level(risk);
    if !colored {
        return level.to_string();
    }
    match level {
        "HIGH" => style(level).red().bold().to_string(),
        "MEDIUM" => style(level).yellow().to_string(),
        _ => style(level).green().to_string(),
    }
}

fn render_text(report: &AnalysisReport, colored: bool) -> String {
    let heading = |s: &str| {
        if colored {
            style(s).bold().underlined().to_string()
        } else {
            s.to_string()
        }
    };
    let mut out = String::new();

    out.push_str(&format!("\n{}\n", heading("Network")));
    out.push_str(&format!(
        "  {} nodes, {} edges, density {:.4}, {}\n",
        report.stats.num_nodes,
        report.stats.num_edges,
        report.stats.density,
        if report.stats.is_connected {
            "connected".to_string()
        } else {
            format!(
                "{} components",
                report.stats.num_components.unwrap_or_default()
            )
        }
    ));

    out.push_str(&format!("\n{}\n", heading("Top kingpins")));
    for entry in report.kingpins.iter().take(10) {
        let connections = entry
            .details
            .as_ref()
            .map(|d| d.connections.len())
            .unwrap_or_default();
        out.push_str(&format!(
            "  {:<10} score {:.6}  ({} connections)\n",
            entry.node, entry.score, connections
        ));
    }

    out.push_str(&format!("\n{}\n", heading("Rings")));
    for ring in &report.ring_statistics {
        out.push_str(&format!(
            "  Ring-{:<4} {} members, {} internal edges, density {:.3}, amount {:.2}\n",
            ring.ring_id, ring.size, ring.internal_edges, ring.density, ring.total_internal_amount
        ));
    }
    if report.ring_statistics.is_empty() {
        out.push_str("  none\n");
    }

    let summary = &report.risk_summary;
    out.push_str(&format!("\n{}\n", heading("Risk")));
    out.push_str(&format!(
        "  mean {:.4}, median {:.4}, max {:.4}; {} high-risk (low {}, medium {}, high {})\n",
        summary.mean_risk,
        summary.median_risk,
        summary.max_risk,
        summary.high_risk_count,
        summary.risk_distribution.low,
        summary.risk_distribution.medium,
        summary.risk_distribution.high
    ));
    if let Some(cv) = report.training.cv_score_mean {
        out.push_str(&format!("  model CV accuracy {:.3}\n", cv));
    }

    out.push_str(&format!("\n{}\n", heading("Actors")));
    for actor in &report.analysis {
        out.push_str(&format!(
            "  {:<8} {:<24} {:<10} risk {:.4} {:<6}  {} connections\n",
            actor.actor_id,
            actor.name,
            actor.ring,
            actor.risk,
            level_styled(actor.risk, colored),
            actor.connections.len()
        ));
    }

    out.push_str(&format!("\n{}\n", report.network_summary));

    for brief in report.analysis.iter().filter_map(|a| a.brief.as_ref()) {
        out.push_str(&format!("\n{}\n", brief));
    }
    out.push_str(&format!(
        "\nCompleted in {:.2}s\n",
        report.summary.analysis_time_seconds
    ));
    out
}
