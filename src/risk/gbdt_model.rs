//! Gradient-boosted trees via the `gbdt` crate
//!
//! Labels use the `LogLikelyhood` convention (1.0 = high risk, -1.0 = low
//! risk) and predictions come back as class-1 probabilities.
//!
//! Note: the gbdt crate works in `f32`; conversions happen at this boundary.

use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Boosting parameters
#[derive(Debug, Clone)]
pub struct BoostConfig {
    pub n_trees: usize,
    pub max_depth: u32,
    pub learning_rate: f64,
    /// Shuffles per feature when measuring permutation importance
    pub n_repeats: usize,
    pub seed: u64,
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 5,
            learning_rate: 0.1,
            n_repeats: 5,
            seed: 42,
        }
    }
}

#[inline]
fn row_to_f32(row: &[f64]) -> Vec<f32> {
    row.iter().map(|&v| v as f32).collect()
}

fn test_data(rows: &[Vec<f64>]) -> DataVec {
    rows.iter()
        .map(|r| Data::new_test_data(row_to_f32(r), None))
        .collect()
}

pub struct BoostedTrees {
    model: GBDT,
}

impl BoostedTrees {
    /// Train on 0/1 labels. Both classes must be present.
    pub fn fit(rows: &[Vec<f64>], labels: &[u8], config: &BoostConfig) -> Result<Self, String> {
        if rows.is_empty() {
            return Err("no training samples provided".into());
        }
        if rows.len() != labels.len() {
            return Err(format!(
                "row count ({}) does not match label count ({})",
                rows.len(),
                labels.len()
            ));
        }

        let mut cfg = Config::new();
        cfg.set_feature_size(rows[0].len());
        cfg.set_max_depth(config.max_depth);
        cfg.set_iterations(config.n_trees);
        cfg.set_shrinkage(config.learning_rate as f32);
        cfg.set_loss("LogLikelyhood");
        cfg.set_debug(false);
        cfg.set_training_optimization_level(2);
        cfg.set_min_leaf_size(1);

        let mut gbdt = GBDT::new(&cfg);
        let mut training_data: DataVec = rows
            .iter()
            .zip(labels)
            .map(|(r, &l)| {
                let label = if l == 1 { 1.0_f32 } else { -1.0_f32 };
                Data::new_training_data(row_to_f32(r), 1.0, label, None)
            })
            .collect();
        gbdt.fit(&mut training_data);

        Ok(Self { model: gbdt })
    }

    /// Class-1 probability per row
    pub fn predict_proba(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        if rows.is_empty() {
            return Vec::new();
        }
        self.model
            .predict(&test_data(rows))
            .into_iter()
            .map(|p| (p as f64).clamp(0.0, 1.0))
            .collect()
    }

    /// Mean drop in accuracy when each feature column is shuffled
    pub fn permutation_importances(
        &self,
        rows: &[Vec<f64>],
        labels: &[u8],
        config: &BoostConfig,
    ) -> Vec<f64> {
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        let baseline = accuracy(&self.predict_proba(rows), labels);
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        (0..width)
            .map(|feature| {
                let repeats = config.n_repeats.max(1);
                let mut drop = 0.0;
                for _ in 0..repeats {
                    let mut column: Vec<f64> = rows.iter().map(|r| r[feature]).collect();
                    column.shuffle(&mut rng);
                    let permuted: Vec<Vec<f64>> = rows
                        .iter()
                        .zip(&column)
                        .map(|(r, &v)| {
                            let mut r = r.clone();
                            r[feature] = v;
                            r
                        })
                        .collect();
                    drop += baseline - accuracy(&self.predict_proba(&permuted), labels);
                }
                drop / repeats as f64
            })
            .collect()
    }
}

/// Fraction of rows where `p > 0.5` matches the label
pub fn accuracy(probabilities: &[f64], labels: &[u8]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let correct = probabilities
        .iter()
        .zip(labels)
        .filter(|(&p, &l)| u8::from(p > 0.5) == l)
        .count();
    correct as f64 / labels.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<Vec<f64>>, Vec<u8>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            rows.push(vec![i as f64 / 10.0, ((i * 7) % 3) as f64]);
            labels.push(0);
        }
        for i in 0..20 {
            rows.push(vec![10.0 + i as f64 / 10.0, ((i * 5) % 3) as f64]);
            labels.push(1);
        }
        (rows, labels)
    }

    #[test]
    fn test_train_and_predict() {
        let (rows, labels) = separable();
        let config = BoostConfig {
            n_trees: 20,
            max_depth: 3,
            ..Default::default()
        };
        let model = BoostedTrees::fit(&rows, &labels, &config).unwrap();
        let probs = model.predict_proba(&rows);
        assert_eq!(probs.len(), rows.len());
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
        assert!(probs[0] < probs[39]);
    }

    #[test]
    fn test_permutation_importance_finds_signal() {
        let (rows, labels) = separable();
        let config = BoostConfig {
            n_trees: 20,
            max_depth: 3,
            ..Default::default()
        };
        let model = BoostedTrees::fit(&rows, &labels, &config).unwrap();
        let imp = model.permutation_importances(&rows, &labels, &config);
        assert_eq!(imp.len(), 2);
        assert!(imp[0] > imp[1]);
    }

    #[test]
    fn test_rejects_mismatched_input() {
        let config = BoostConfig::default();
        assert!(BoostedTrees::fit(&[], &[], &config).is_err());
        assert!(BoostedTrees::fit(&[vec![1.0]], &[0, 1], &config).is_err());
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[0.9, 0.2, 0.6], &[1, 0, 0]), 2.0 / 3.0);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }
}
