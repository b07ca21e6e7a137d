//! Classifier selection, native importances and cross-validation

use tracing::{debug, warn};

use super::forest::{ForestConfig, RandomForest};
use super::gbdt_model::{accuracy, BoostConfig, BoostedTrees};
use crate::config::ClassifierKind;
use crate::math::{mean, std_dev};

/// Trained binary classifier over standardized features
pub enum RiskModel {
    Forest(RandomForest),
    Boosted(BoostedTrees),
    /// Training labels held one class; every row gets that class
    Constant(f64),
}

impl RiskModel {
    pub fn fit(kind: ClassifierKind, rows: &[Vec<f64>], labels: &[u8], seed: u64) -> Self {
        let positives = labels.iter().filter(|&&l| l == 1).count();
        if positives == 0 || positives == labels.len() {
            return RiskModel::Constant(if positives == 0 { 0.0 } else { 1.0 });
        }

        match kind {
            ClassifierKind::RandomForest => {
                let config = ForestConfig {
                    seed,
                    ..Default::default()
                };
                RiskModel::Forest(RandomForest::fit(rows, labels, &config))
            }
            ClassifierKind::GradientBoost => {
                let config = BoostConfig {
                    seed,
                    ..Default::default()
                };
                match BoostedTrees::fit(rows, labels, &config) {
                    Ok(model) => RiskModel::Boosted(model),
                    Err(e) => {
                        warn!("Gradient boosting failed ({}), using random forest", e);
                        let config = ForestConfig {
                            seed,
                            ..Default::default()
                        };
                        RiskModel::Forest(RandomForest::fit(rows, labels, &config))
                    }
                }
            }
        }
    }

    /// Class-1 probability per row
    pub fn predict_proba(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        match self {
            RiskModel::Forest(forest) => rows.iter().map(|r| forest.predict_proba(r)).collect(),
            RiskModel::Boosted(model) => model.predict_proba(rows),
            RiskModel::Constant(p) => vec![*p; rows.len()],
        }
    }

    /// Impurity decrease for forests, permutation importance for boosted trees
    pub fn feature_importances(&self, rows: &[Vec<f64>], labels: &[u8], seed: u64) -> Vec<f64> {
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        match self {
            RiskModel::Forest(forest) => forest.feature_importances().to_vec(),
            RiskModel::Boosted(model) => {
                let config = BoostConfig {
                    seed,
                    ..Default::default()
                };
                model.permutation_importances(rows, labels, &config)
            }
            RiskModel::Constant(_) => vec![0.0; width],
        }
    }
}

/// Stratified k-fold test sets without shuffling.
///
/// Each class is spread over the folds in contiguous blocks sized so that
/// every fold gets roughly the same class mix.
pub fn stratified_folds(labels: &[u8], k: usize) -> Vec<Vec<usize>> {
    let k = k.max(1);
    let mut sorted = labels.to_vec();
    sorted.sort_unstable();

    // allocation[fold][class]
    let mut allocation = vec![[0usize; 2]; k];
    for (i, &label) in sorted.iter().enumerate() {
        allocation[i % k][usize::from(label)] += 1;
    }

    let mut fold_of = vec![0usize; labels.len()];
    for class in 0..2u8 {
        let members: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == class).collect();
        let mut cursor = 0;
        for (fold, counts) in allocation.iter().enumerate() {
            for &i in &members[cursor..cursor + counts[usize::from(class)]] {
                fold_of[i] = fold;
            }
            cursor += counts[usize::from(class)];
        }
    }

    let mut folds = vec![Vec::new(); k];
    for (i, &fold) in fold_of.iter().enumerate() {
        folds[fold].push(i);
    }
    folds
}

/// Accuracy on each held-out fold
pub fn cross_val_scores(
    kind: ClassifierKind,
    rows: &[Vec<f64>],
    labels: &[u8],
    k: usize,
    seed: u64,
) -> Vec<f64> {
    stratified_folds(labels, k)
        .into_iter()
        .filter(|test| !test.is_empty())
        .map(|test| {
            let mut in_test = vec![false; rows.len()];
            for &i in &test {
                in_test[i] = true;
            }
            let train: Vec<usize> = (0..rows.len()).filter(|&i| !in_test[i]).collect();

            let train_rows: Vec<Vec<f64>> = train.iter().map(|&i| rows[i].clone()).collect();
            let train_labels: Vec<u8> = train.iter().map(|&i| labels[i]).collect();
            let test_rows: Vec<Vec<f64>> = test.iter().map(|&i| rows[i].clone()).collect();
            let test_labels: Vec<u8> = test.iter().map(|&i| labels[i]).collect();

            let model = RiskModel::fit(kind, &train_rows, &train_labels, seed);
            let score = accuracy(&model.predict_proba(&test_rows), &test_labels);
            debug!("CV fold: {} train, {} test, accuracy {:.3}", train.len(), test.len(), score);
            score
        })
        .collect()
}

/// (mean, population std) of the fold scores
pub fn summarize_scores(scores: &[f64]) -> (f64, f64) {
    (mean(scores), std_dev(scores))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stratified_folds_cover_all() {
        let labels = vec![0, 1, 0, 1, 0, 0, 1, 0, 1];
        let folds = stratified_folds(&labels, 3);
        assert_eq!(folds.len(), 3);
        let mut all: Vec<usize> = folds.concat();
        all.sort_unstable();
        assert_eq!(all, (0..labels.len()).collect::<Vec<_>>());
        for fold in &folds {
            let positives = fold.iter().filter(|&&i| labels[i] == 1).count();
            assert!((1..=2).contains(&positives));
        }
    }

    #[test]
    fn test_stratified_folds_contiguous_per_class() {
        // class 0: 0,1,2,3  class 1: 4,5
        let labels = vec![0, 0, 0, 0, 1, 1];
        let folds = stratified_folds(&labels, 2);
        assert_eq!(folds, vec![vec![0, 1, 4], vec![2, 3, 5]]);
    }

    #[test]
    fn test_two_samples() {
        let folds = stratified_folds(&[1, 0], 2);
        assert_eq!(folds, vec![vec![1], vec![0]]);
        let rows = vec![vec![0.0], vec![1.0]];
        let scores = cross_val_scores(ClassifierKind::RandomForest, &rows, &[1, 0], 2, 42);
        assert_eq!(scores.len(), 2);
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn test_constant_model() {
        let model = RiskModel::fit(ClassifierKind::GradientBoost, &[vec![1.0]], &[1], 42);
        assert_eq!(model.predict_proba(&[vec![3.0], vec![4.0]]), vec![1.0, 1.0]);
        assert_eq!(model.feature_importances(&[vec![1.0]], &[1], 42), vec![0.0]);
    }

    #[test]
    fn test_summarize_scores() {
        let (m, s) = summarize_scores(&[1.0, 0.5]);
        assert_eq!(m, 0.75);
        assert_eq!(s, 0.25);
    }
}
