//! Weak label synthesis
//!
//! No ground truth exists for who is high-risk, so training labels are
//! derived from the features themselves:
//!
//!   combined = 0.4·norm(degree) + 0.3·norm(pagerank) + 0.3·norm(amount_sum)
//!   label    = combined > median(combined)
//!
//! where norm is min-max scaling (constant columns map to 0). If every node
//! ends up in the same class, the first node's label is flipped so the
//! classifier always sees two classes.

use tracing::warn;

use super::features::{FeatureVector, AMOUNT_SUM, DEGREE, PAGERANK};
use crate::math::{median, min_max_normalize};

const DEGREE_WEIGHT: f64 = 0.4;
const PAGERANK_WEIGHT: f64 = 0.3;
const AMOUNT_WEIGHT: f64 = 0.3;

/// Combined heuristic score per node
pub fn heuristic_scores(features: &[FeatureVector]) -> Vec<f64> {
    let column = |idx: usize| -> Vec<f64> { features.iter().map(|f| f.values[idx]).collect() };
    let degree = min_max_normalize(&column(DEGREE));
    let pagerank = min_max_normalize(&column(PAGERANK));
    let amount = min_max_normalize(&column(AMOUNT_SUM));

    degree
        .iter()
        .zip(&pagerank)
        .zip(&amount)
        .map(|((d, p), a)| DEGREE_WEIGHT * d + PAGERANK_WEIGHT * p + AMOUNT_WEIGHT * a)
        .collect()
}

/// Binary labels (1 = high risk) split at the median heuristic score
pub fn weak_labels(features: &[FeatureVector]) -> Vec<u8> {
    let combined = heuristic_scores(features);
    let threshold = median(&combined);
    let mut labels: Vec<u8> = combined.iter().map(|&c| u8::from(c > threshold)).collect();
    ensure_two_classes(&mut labels);
    labels
}

/// Flip the first label when only one class is present.
/// Returns true if a flip happened.
pub fn ensure_two_classes(labels: &mut [u8]) -> bool {
    let Some(&first) = labels.first() else {
        return false;
    };
    if labels.iter().all(|&l| l == first) {
        warn!("Only one class in labels, flipping the first node's label");
        labels[0] = 1 - first;
        return true;
    }
    false
}
