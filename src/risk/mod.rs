//! Risk scoring
//!
//! Trains a classifier on weak labels synthesized from graph features and
//! uses its class-1 probability as each actor's risk score.
//!
//! Lifecycle: a scorer starts untrained; `train()` fits the standardizer and
//! model together and may be called again to replace both. `score_nodes()`
//! trains on first use.

mod bootstrap;
mod features;
mod forest;
mod gbdt_model;
mod model;

pub use bootstrap::{ensure_two_classes, heuristic_scores, weak_labels};
pub use features::{extract_features, FeatureVector, FEATURE_NAMES, NUM_FEATURES};
pub use forest::{DecisionTree, ForestConfig, RandomForest};
pub use gbdt_model::{BoostConfig, BoostedTrees};
pub use model::{cross_val_scores, stratified_folds, RiskModel};

use serde::Serialize;
use std::cell::OnceCell;
use tracing::{info, warn};

use crate::config::{AnalysisConfig, ClassifierKind};
use crate::graph::NetworkGraph;
use crate::kingpin::KingpinAnalyzer;
use crate::math::{mean, median, round_to};
use crate::scaler::Standardizer;

const MAX_CV_FOLDS: usize = 3;
const TOP_FEATURES: usize = 5;
const LOW_BUCKET: f64 = 0.3;
const HIGH_BUCKET: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainStatus {
    Trained,
    InsufficientData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainReport {
    pub status: TrainStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv_score_mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv_score_std: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub top_features: Vec<(String, f64)>,
    pub n_samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighRiskNode {
    pub node: String,
    pub risk_score: f64,
    pub degree: usize,
    pub connections: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RiskDistribution {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RiskSummary {
    pub total_nodes: usize,
    pub mean_risk: f64,
    pub median_risk: f64,
    pub max_risk: f64,
    pub min_risk: f64,
    pub high_risk_count: usize,
    pub risk_distribution: RiskDistribution,
}

struct TrainedModel {
    scaler: Standardizer,
    model: RiskModel,
}

enum ScorerState {
    Untrained,
    Trained(TrainedModel),
    /// Fewer than two nodes; every node scores 0
    InsufficientData,
}

pub struct RiskScorer<'g> {
    graph: &'g NetworkGraph,
    centrality: KingpinAnalyzer<'g>,
    classifier: ClassifierKind,
    seed: u64,
    features: OnceCell<Vec<FeatureVector>>,
    state: ScorerState,
}

impl<'g> RiskScorer<'g> {
    pub fn new(graph: &'g NetworkGraph) -> Self {
        Self::from_config(graph, &AnalysisConfig::default())
    }

    pub fn from_config(graph: &'g NetworkGraph, config: &AnalysisConfig) -> Self {
        Self {
            graph,
            centrality: KingpinAnalyzer::from_config(graph, config),
            classifier: config.classifier,
            seed: config.random_state,
            features: OnceCell::new(),
            state: ScorerState::Untrained,
        }
    }

    pub fn with_classifier(mut self, classifier: ClassifierKind) -> Self {
        self.classifier = classifier;
        self.state = ScorerState::Untrained;
        self
    }

    /// Cached per-node feature vectors in graph order
    pub fn features(&self) -> &[FeatureVector] {
        self.features
            .get_or_init(|| extract_features(self.graph, &self.centrality))
    }

    pub fn is_trained(&self) -> bool {
        !matches!(self.state, ScorerState::Untrained)
    }

    /// Fit standardizer and classifier on weak labels, replacing any
    /// previous model.
    pub fn train(&mut self) -> TrainReport {
        let rows: Vec<Vec<f64>> = self.features().iter().map(|f| f.values.to_vec()).collect();
        let n = rows.len();

        if n < 2 {
            warn!("Not enough data to train model ({} nodes)", n);
            self.state = ScorerState::InsufficientData;
            return TrainReport {
                status: TrainStatus::InsufficientData,
                cv_score_mean: None,
                cv_score_std: None,
                top_features: Vec::new(),
                n_samples: n,
            };
        }

        let (scaler, scaled) = Standardizer::fit_transform(&rows);
        let labels = weak_labels(self.features());

        let model = RiskModel::fit(self.classifier, &scaled, &labels, self.seed);
        let scores = cross_val_scores(
            self.classifier,
            &scaled,
            &labels,
            MAX_CV_FOLDS.min(n),
            self.seed,
        );
        let (cv_mean, cv_std) = model::summarize_scores(&scores);

        let importances = model.feature_importances(&scaled, &labels, self.seed);
        let mut ranked: Vec<(String, f64)> = FEATURE_NAMES
            .iter()
            .zip(importances)
            .map(|(name, imp)| (name.to_string(), imp))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(TOP_FEATURES);

        info!("Model trained with CV score: {:.3}", cv_mean);
        self.state = ScorerState::Trained(TrainedModel { scaler, model });

        TrainReport {
            status: TrainStatus::Trained,
            cv_score_mean: Some(round_to(cv_mean, 3)),
            cv_score_std: Some(round_to(cv_std, 3)),
            top_features: ranked,
            n_samples: n,
        }
    }

    /// Risk score per node (graph order), trained on first use
    pub fn score_nodes(&mut self) -> Vec<(String, f64)> {
        if !self.is_trained() {
            self.train();
        }

        let rows: Vec<Vec<f64>> = self.features().iter().map(|f| f.values.to_vec()).collect();
        let probabilities = match &self.state {
            ScorerState::Trained(trained) => trained
                .model
                .predict_proba(&trained.scaler.transform(&rows)),
            _ => vec![0.0; rows.len()],
        };

        let scores: Vec<(String, f64)> = probabilities
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                let p = if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 };
                (self.graph.node_id(i).to_string(), round_to(p, 4))
            })
            .collect();
        info!("Scored {} nodes for risk", scores.len());
        scores
    }

    /// Nodes scoring at or above `threshold`, highest first
    pub fn get_high_risk_nodes(&mut self, threshold: f64) -> Vec<HighRiskNode> {
        let mut high: Vec<HighRiskNode> = self
            .score_nodes()
            .into_iter()
            .filter(|(_, score)| *score >= threshold)
            .map(|(node, risk_score)| HighRiskNode {
                degree: self.graph.degree_of(&node),
                connections: self.graph.neighbor_ids(&node),
                node,
                risk_score,
            })
            .collect();
        high.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));
        high
    }

    pub fn get_risk_summary(&mut self, threshold: f64) -> RiskSummary {
        let values: Vec<f64> = self.score_nodes().into_iter().map(|(_, s)| s).collect();
        summarize(&values, threshold)
    }
}

/// Summary statistics over risk scores; all zeros when empty
pub fn summarize(values: &[f64], threshold: f64) -> RiskSummary {
    if values.is_empty() {
        return RiskSummary::default();
    }
    let count = |pred: &dyn Fn(f64) -> bool| values.iter().filter(|&&s| pred(s)).count();
    RiskSummary {
        total_nodes: values.len(),
        mean_risk: round_to(mean(values), 4),
        median_risk: round_to(median(values), 4),
        max_risk: round_to(values.iter().copied().fold(f64::NEG_INFINITY, f64::max), 4),
        min_risk: round_to(values.iter().copied().fold(f64::INFINITY, f64::min), 4),
        high_risk_count: count(&|s| s >= threshold),
        risk_distribution: RiskDistribution {
            low: count(&|s| s < LOW_BUCKET),
            medium: count(&|s| (LOW_BUCKET..HIGH_BUCKET).contains(&s)),
            high: count(&|s| s >= HIGH_BUCKET),
        },
    }
}
