//! CLI command definitions and handlers

mod analyze;
mod brief;
mod inspect;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::{AnalysisConfig, ClassifierKind};
use crate::records::{self, Dataset};

/// Parse a probability threshold (0-1)
fn parse_threshold(s: &str) -> Result<f64, String> {
    let v: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if (0.0..=1.0).contains(&v) {
        Ok(v)
    } else {
        Err("threshold must be between 0 and 1".to_string())
    }
}

/// netsleuth - fraud network analytics
///
/// Finds kingpins, rings and risky actors in call and transaction records.
#[derive(Parser, Debug)]
#[command(name = "netsleuth")]
#[command(
    version,
    about = "Fraud network analytics: kingpin ranking, ring detection and risk scoring",
    after_help = "\
Examples:
  netsleuth demo                               Full analysis of the built-in sample
  netsleuth --data-dir ./data analyze          Analyze suspects.csv, call_logs.csv, transactions.csv
  netsleuth kingpins -n 10 --format json       Top 10 kingpins as JSON
  netsleuth rings --method dbscan              Density-based rings
  netsleuth brief S001                         Intelligence brief for one actor"
)]
pub struct Cli {
    /// Directory holding suspects.csv, call_logs.csv and transactions.csv
    #[arg(long, global = true, env = "NETSLEUTH_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Use the built-in sample dataset instead of reading files
    #[arg(long, global = true)]
    pub sample: bool,

    /// Config file (default: netsleuth.toml in the data directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Full analysis: kingpins, rings, risk scores and per-actor briefs
    Analyze {
        /// Skip per-actor briefs
        #[arg(long)]
        no_brief: bool,

        /// Number of kingpins to report (default from config)
        #[arg(long)]
        max_kingpins: Option<usize>,

        /// Write the report to a file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Rank actors by composite centrality
    Kingpins {
        /// Number of kingpins (default from config)
        #[arg(short = 'n', long)]
        top: Option<usize>,

        /// Only ids and scores
        #[arg(long)]
        no_metrics: bool,

        /// Print every centrality table instead of the ranking
        #[arg(long)]
        all_centralities: bool,
    },

    /// Partition actors into rings
    Rings {
        /// community, kmeans, hierarchical or dbscan
        #[arg(long, short = 'm', default_value = "community")]
        method: String,

        /// Run kmeans, community and hierarchical side by side
        #[arg(long, conflicts_with = "method")]
        all: bool,
    },

    /// Train the risk model and score every actor
    Risk {
        /// High-risk threshold (default from config)
        #[arg(long, value_parser = parse_threshold)]
        threshold: Option<f64>,

        /// random_forest or gradient_boost
        #[arg(long)]
        classifier: Option<ClassifierKind>,
    },

    /// Graph statistics
    Stats,

    /// Intelligence brief for one actor
    Brief {
        /// Actor id, e.g. S001
        actor_id: String,

        /// Never call the API; use the template
        #[arg(long)]
        offline: bool,
    },

    /// Analyze the built-in sample dataset
    Demo,
}

impl Cli {
    fn json(&self) -> bool {
        self.format == "json"
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let json = cli.json();
    let config = load_config(&cli)?;
    let dataset = match cli.command {
        Commands::Demo => records::sample_dataset(),
        _ => load_data(&cli)?,
    };

    match cli.command {
        Commands::Analyze {
            no_brief,
            max_kingpins,
            output,
        } => {
            let mut config = config;
            if let Some(n) = max_kingpins {
                config.max_kingpins = n;
            }
            analyze::run(&dataset, &config, !no_brief, json, output.as_deref())
        }
        Commands::Kingpins {
            top,
            no_metrics,
            all_centralities,
        } => inspect::kingpins(
            &dataset,
            &config,
            top.unwrap_or(config.max_kingpins),
            !no_metrics,
            all_centralities,
            json,
        ),
        Commands::Rings { method, all } => inspect::rings(&dataset, &config, &method, all, json),
        Commands::Risk {
            threshold,
            classifier,
        } => {
            let mut config = config;
            if let Some(kind) = classifier {
                config.classifier = kind;
            }
            let threshold = threshold.unwrap_or(config.risk_threshold);
            inspect::risk(&dataset, &config, threshold, json)
        }
        Commands::Stats => inspect::stats(&dataset, json),
        Commands::Brief { actor_id, offline } => {
            brief::run(&dataset, &config, &actor_id, offline, json)
        }
        Commands::Demo => analyze::demo(&dataset, &config, json),
    }
}

fn load_config(cli: &Cli) -> Result<AnalysisConfig> {
    match &cli.config {
        Some(path) => {
            let mut config = AnalysisConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?;
            config.apply_overrides(|key| std::env::var(key).ok());
            Ok(config)
        }
        None => Ok(AnalysisConfig::load(&cli.data_dir)),
    }
}

fn load_data(cli: &Cli) -> Result<Dataset> {
    if cli.sample {
        return Ok(records::sample_dataset());
    }
    load_from(&cli.data_dir)
}

fn load_from(dir: &Path) -> Result<Dataset> {
    records::load_or_sample(dir)
        .with_context(|| format!("Failed to load records from {}", dir.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}
