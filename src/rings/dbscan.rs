//! Density-based clustering (DBSCAN)

use crate::math::squared_distance;

pub const NOISE: i64 = -1;

/// Label every row with a cluster id (0..) or `NOISE`.
///
/// A row is a core point when at least `min_samples` rows, itself included,
/// lie within `eps`. Clusters grow from core points in row order; border
/// points join the first cluster that reaches them.
pub fn dbscan(rows: &[Vec<f64>], eps: f64, min_samples: usize) -> Vec<i64> {
    let n = rows.len();
    let eps_sq = eps * eps;
    let neighborhoods: Vec<Vec<usize>> = (0..n)
        .map(|i| {
            (0..n)
                .filter(|&j| squared_distance(&rows[i], &rows[j]) <= eps_sq)
                .collect()
        })
        .collect();
    let is_core: Vec<bool> = neighborhoods
        .iter()
        .map(|hood| hood.len() >= min_samples)
        .collect();

    let mut labels = vec![NOISE; n];
    let mut next_label = 0;
    for start in 0..n {
        if labels[start] != NOISE || !is_core[start] {
            continue;
        }
        let mut stack = vec![start];
        labels[start] = next_label;
        while let Some(i) = stack.pop() {
            if !is_core[i] {
                continue;
            }
            for &j in &neighborhoods[i] {
                if labels[j] == NOISE {
                    labels[j] = next_label;
                    stack.push(j);
                }
            }
        }
        next_label += 1;
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_clusters_and_noise() {
        let rows = vec![
            vec![0.0],
            vec![0.3],
            vec![5.0],
            vec![5.2],
            vec![20.0],
        ];
        let labels = dbscan(&rows, 0.5, 2);
        assert_eq!(labels, vec![0, 0, 1, 1, NOISE]);
    }

    #[test]
    fn test_min_samples_counts_self() {
        let rows = vec![vec![0.0], vec![10.0]];
        assert_eq!(dbscan(&rows, 0.5, 1), vec![0, 1]);
        assert_eq!(dbscan(&rows, 0.5, 2), vec![NOISE, NOISE]);
    }

    #[test]
    fn test_border_point_joins_cluster() {
        // only 0.4 is core; its neighbors become border points
        let rows = vec![vec![0.0], vec![0.4], vec![0.8], vec![3.0]];
        assert_eq!(dbscan(&rows, 0.5, 3), vec![0, 0, 0, NOISE]);
    }
}
