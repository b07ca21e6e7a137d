//! Random forest of CART classification trees (binary, gini impurity)

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// Forest configuration
#[derive(Debug, Clone)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Features tried per split; sqrt of the total if None
    pub max_features: Option<usize>,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 2,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf {
        /// Fraction of class-1 samples that reached this leaf
        p_positive: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

/// Single classification tree
#[derive(Debug, Clone)]
pub struct DecisionTree {
    root: TreeNode,
    /// Unnormalized weighted impurity decrease per feature
    importances: Vec<f64>,
}

struct TreeBuilder<'a> {
    rows: &'a [Vec<f64>],
    labels: &'a [u8],
    max_depth: usize,
    min_samples_split: usize,
    max_features: usize,
    n_total: f64,
    importances: Vec<f64>,
}

impl DecisionTree {
    /// Grow a tree on `indices` (duplicates allowed for bootstrap samples)
    pub fn fit(
        rows: &[Vec<f64>],
        labels: &[u8],
        indices: &[usize],
        config: &ForestConfig,
        max_features: usize,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut builder = TreeBuilder {
            rows,
            labels,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            max_features: max_features.clamp(1, width.max(1)),
            n_total: indices.len().max(1) as f64,
            importances: vec![0.0; width],
        };
        let root = builder.grow(indices, 0, rng);
        Self {
            root,
            importances: builder.importances,
        }
    }

    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { p_positive } => return *p_positive,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Importances normalized to sum to 1 (all zeros for a single leaf)
    pub fn feature_importances(&self) -> Vec<f64> {
        normalized(&self.importances)
    }
}

impl TreeBuilder<'_> {
    fn grow(&mut self, indices: &[usize], depth: usize, rng: &mut ChaCha8Rng) -> TreeNode {
        let positives = indices.iter().filter(|&&i| self.labels[i] == 1).count();
        let n = indices.len();
        let p_positive = if n == 0 { 0.0 } else { positives as f64 / n as f64 };
        let impurity = gini(positives, n);

        if depth >= self.max_depth || n < self.min_samples_split || impurity < 1e-12 {
            return TreeNode::Leaf { p_positive };
        }

        let Some(split) = self.best_split(indices, impurity, rng) else {
            return TreeNode::Leaf { p_positive };
        };

        self.importances[split.feature] += (n as f64 / self.n_total) * split.gain;

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.rows[i][split.feature] <= split.threshold);
        let left = self.grow(&left_idx, depth + 1, rng);
        let right = self.grow(&right_idx, depth + 1, rng);

        TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn best_split(&self, indices: &[usize], parent: f64, rng: &mut ChaCha8Rng) -> Option<Split> {
        let width = self.importances.len();
        let mut features: Vec<usize> = (0..width).collect();
        features.shuffle(rng);
        features.truncate(self.max_features);

        let n = indices.len();
        let total_pos = indices.iter().filter(|&&i| self.labels[i] == 1).count();
        let mut best: Option<Split> = None;

        for &feature in &features {
            let mut sorted: Vec<(f64, u8)> = indices
                .iter()
                .map(|&i| (self.rows[i][feature], self.labels[i]))
                .collect();
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            // sweep thresholds between consecutive distinct values
            let mut left_pos = 0;
            for k in 1..n {
                left_pos += usize::from(sorted[k - 1].1 == 1);
                if sorted[k].0 <= sorted[k - 1].0 {
                    continue;
                }
                let left_n = k;
                let right_n = n - k;
                let weighted = (left_n as f64 * gini(left_pos, left_n)
                    + right_n as f64 * gini(total_pos - left_pos, right_n))
                    / n as f64;
                let gain = parent - weighted;
                if gain > best.as_ref().map_or(0.0, |b| b.gain) {
                    best = Some(Split {
                        feature,
                        threshold: (sorted[k - 1].0 + sorted[k].0) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

fn gini(positives: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = positives as f64 / n as f64;
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}

fn normalized(values: &[f64]) -> Vec<f64> {
    let sum: f64 = values.iter().sum();
    if sum > 0.0 {
        values.iter().map(|v| v / sum).collect()
    } else {
        vec![0.0; values.len()]
    }
}

/// Random forest model
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    feature_importances: Vec<f64>,
}

impl RandomForest {
    /// Train the forest (PARALLELIZED: one task per tree)
    pub fn fit(rows: &[Vec<f64>], labels: &[u8], config: &ForestConfig) -> Self {
        let n = rows.len();
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        let max_features = config
            .max_features
            .unwrap_or_else(|| ((width as f64).sqrt() as usize).max(1));

        let trees: Vec<DecisionTree> = (0..config.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(t as u64));
                let indices: Vec<usize> = if config.bootstrap {
                    (0..n).map(|_| rng.random_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                DecisionTree::fit(rows, labels, &indices, config, max_features, &mut rng)
            })
            .collect();

        let mut feature_importances = vec![0.0; width];
        for tree in &trees {
            for (total, imp) in feature_importances.iter_mut().zip(tree.feature_importances()) {
                *total += imp;
            }
        }
        let feature_importances = normalized(&feature_importances);

        Self {
            trees,
            feature_importances,
        }
    }

    /// Probability of class 1: mean of the trees' leaf probabilities
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        self.trees.iter().map(|t| t.predict_proba(row)).sum::<f64>() / self.trees.len() as f64
    }

    /// Mean impurity decrease per feature, normalized to sum to 1
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold_data() -> (Vec<Vec<f64>>, Vec<u8>) {
        // only feature 1 carries signal
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![(i % 7) as f64, i as f64, ((i * 13) % 5) as f64])
            .collect();
        let labels = (0..40).map(|i| u8::from(i >= 20)).collect();
        (rows, labels)
    }

    #[test]
    fn test_tree_separates_threshold() {
        let (rows, labels) = threshold_data();
        let indices: Vec<usize> = (0..rows.len()).collect();
        let config = ForestConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tree = DecisionTree::fit(&rows, &labels, &indices, &config, 3, &mut rng);
        assert_eq!(tree.predict_proba(&[0.0, 5.0, 0.0]), 0.0);
        assert_eq!(tree.predict_proba(&[0.0, 35.0, 0.0]), 1.0);
        let imp = tree.feature_importances();
        assert!((imp[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_forest_probabilities() {
        let (rows, labels) = threshold_data();
        let forest = RandomForest::fit(&rows, &labels, &ForestConfig::default());
        assert_eq!(forest.n_trees(), 100);
        assert!(forest.predict_proba(&rows[0]) < 0.5);
        assert!(forest.predict_proba(&rows[39]) > 0.5);
        for row in &rows {
            let p = forest.predict_proba(row);
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_importances_sum_to_one() {
        let (rows, labels) = threshold_data();
        let forest = RandomForest::fit(&rows, &labels, &ForestConfig::default());
        let sum: f64 = forest.feature_importances().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        let top = forest
            .feature_importances()
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(top, Some(1));
    }

    #[test]
    fn test_deterministic() {
        let (rows, labels) = threshold_data();
        let a = RandomForest::fit(&rows, &labels, &ForestConfig::default());
        let b = RandomForest::fit(&rows, &labels, &ForestConfig::default());
        assert_eq!(a.feature_importances(), b.feature_importances());
    }

    #[test]
    fn test_single_class_leaf() {
        let rows = vec![vec![1.0], vec![2.0]];
        let forest = RandomForest::fit(&rows, &[1, 1], &ForestConfig::default());
        assert_eq!(forest.predict_proba(&[1.5]), 1.0);
        assert_eq!(forest.feature_importances(), &[0.0]);
    }
}
