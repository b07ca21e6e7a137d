//! K-means with k-means++ seeding and multiple restarts

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::math::squared_distance;

#[derive(Debug, Clone)]
pub struct KMeans {
    pub k: usize,
    pub n_init: usize,
    pub max_iter: usize,
    /// Relative to the mean per-column variance of the data
    pub tol: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    pub inertia: f64,
}

impl KMeans {
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            n_init: 10,
            max_iter: 300,
            tol: 1e-4,
            seed,
        }
    }

    /// Best of `n_init` runs by inertia. Requires `1 <= k <= rows.len()`;
    /// callers handle smaller inputs themselves.
    pub fn fit(&self, rows: &[Vec<f64>]) -> KMeansFit {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let tol = self.tol * mean_variance(rows);

        let mut best: Option<KMeansFit> = None;
        for _ in 0..self.n_init.max(1) {
            let centroids = self.init_plus_plus(rows, &mut rng);
            let fit = self.lloyd(rows, centroids, tol);
            if best.as_ref().map_or(true, |b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }
        best.unwrap_or_else(|| KMeansFit {
            labels: vec![0; rows.len()],
            centroids: Vec::new(),
            inertia: 0.0,
        })
    }

    /// Greedy k-means++: each new centroid is the best of several candidates
    /// drawn proportionally to squared distance from the chosen set.
    fn init_plus_plus(&self, rows: &[Vec<f64>], rng: &mut ChaCha8Rng) -> Vec<Vec<f64>> {
        let n = rows.len();
        let trials = 2 + (self.k as f64).ln().floor() as usize;

        let first = rng.random_range(0..n);
        let mut centroids = vec![rows[first].clone()];
        let mut closest: Vec<f64> = rows
            .iter()
            .map(|r| squared_distance(r, &rows[first]))
            .collect();
        let mut potential: f64 = closest.iter().sum();

        while centroids.len() < self.k {
            let cumulative: Vec<f64> = closest
                .iter()
                .scan(0.0, |acc, d| {
                    *acc += d;
                    Some(*acc)
                })
                .collect();

            let mut best: Option<(usize, Vec<f64>, f64)> = None;
            for _ in 0..trials {
                let target = rng.random::<f64>() * potential;
                let candidate = cumulative.partition_point(|&c| c < target).min(n - 1);
                let distances: Vec<f64> = rows
                    .iter()
                    .zip(&closest)
                    .map(|(r, &d)| d.min(squared_distance(r, &rows[candidate])))
                    .collect();
                let pot: f64 = distances.iter().sum();
                if best.as_ref().map_or(true, |(_, _, p)| pot < *p) {
                    best = Some((candidate, distances, pot));
                }
            }

            if let Some((candidate, distances, pot)) = best {
                centroids.push(rows[candidate].clone());
                closest = distances;
                potential = pot;
            }
        }
        centroids
    }

    fn lloyd(&self, rows: &[Vec<f64>], mut centroids: Vec<Vec<f64>>, tol: f64) -> KMeansFit {
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut labels = assign(rows, &centroids);

        for _ in 0..self.max_iter {
            let mut sums = vec![vec![0.0; width]; centroids.len()];
            let mut counts = vec![0usize; centroids.len()];
            for (row, &label) in rows.iter().zip(&labels) {
                counts[label] += 1;
                for (s, v) in sums[label].iter_mut().zip(row) {
                    *s += v;
                }
            }

            relocate_empty(rows, &centroids, &mut labels, &mut sums, &mut counts);

            let mut shift = 0.0;
            for (c, (sum, count)) in sums.into_iter().zip(counts).enumerate() {
                if count == 0 {
                    continue;
                }
                let updated: Vec<f64> = sum.into_iter().map(|s| s / count as f64).collect();
                shift += squared_distance(&updated, &centroids[c]);
                centroids[c] = updated;
            }

            let relabeled = assign(rows, &centroids);
            let stable = relabeled == labels;
            labels = relabeled;
            if stable || shift <= tol {
                break;
            }
        }

        let inertia = rows
            .iter()
            .zip(&labels)
            .map(|(r, &l)| squared_distance(r, &centroids[l]))
            .sum();
        KMeansFit {
            labels,
            centroids,
            inertia,
        }
    }
}

/// Give every empty cluster the point farthest from its current centroid,
/// taken from a cluster that keeps at least one member.
fn relocate_empty(
    rows: &[Vec<f64>],
    centroids: &[Vec<f64>],
    labels: &mut [usize],
    sums: &mut [Vec<f64>],
    counts: &mut [usize],
) {
    let empty: Vec<usize> = (0..counts.len()).filter(|&c| counts[c] == 0).collect();
    if empty.is_empty() {
        return;
    }

    let mut moved = vec![false; rows.len()];
    for c in empty {
        let farthest = (0..rows.len())
            .filter(|&i| !moved[i] && counts[labels[i]] > 1)
            .max_by(|&a, &b| {
                squared_distance(&rows[a], &centroids[labels[a]])
                    .total_cmp(&squared_distance(&rows[b], &centroids[labels[b]]))
            });
        let Some(i) = farthest else {
            break;
        };

        let from = labels[i];
        counts[from] -= 1;
        for (s, v) in sums[from].iter_mut().zip(&rows[i]) {
            *s -= v;
        }
        counts[c] = 1;
        sums[c] = rows[i].clone();
        labels[i] = c;
        moved[i] = true;
    }
}

/// Nearest centroid per row; ties go to the lower index
fn assign(rows: &[Vec<f64>], centroids: &[Vec<f64>]) -> Vec<usize> {
    rows.iter()
        .map(|r| {
            let mut best = 0;
            let mut best_dist = f64::INFINITY;
            for (c, centroid) in centroids.iter().enumerate() {
                let d = squared_distance(r, centroid);
                if d < best_dist {
                    best_dist = d;
                    best = c;
                }
            }
            best
        })
        .collect()
}

fn mean_variance(rows: &[Vec<f64>]) -> f64 {
    let width = rows.first().map(|r| r.len()).unwrap_or(0);
    if width == 0 {
        return 0.0;
    }
    let total: f64 = (0..width)
        .map(|col| {
            let column: Vec<f64> = rows.iter().map(|r| r[col]).collect();
            crate::math::std_dev(&column).powi(2)
        })
        .sum();
    total / width as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 10.0],
            vec![10.0, 10.1],
        ]
    }

    #[test]
    fn test_separates_blobs() {
        let fit = KMeans::new(2, 42).fit(&blobs());
        let l = &fit.labels;
        assert_eq!(l[0], l[1]);
        assert_eq!(l[1], l[2]);
        assert_eq!(l[3], l[4]);
        assert_eq!(l[4], l[5]);
        assert_ne!(l[0], l[3]);
        assert!(fit.inertia < 0.1);
    }

    #[test]
    fn test_seeded_runs_match() {
        let a = KMeans::new(3, 7).fit(&blobs());
        let b = KMeans::new(3, 7).fit(&blobs());
        assert_eq!(a, b);
    }

    #[test]
    fn test_k_distinct_rows_give_k_clusters() {
        let rows = blobs();
        for k in 1..=rows.len() {
            let fit = KMeans::new(k, 42).fit(&rows);
            let distinct: std::collections::BTreeSet<usize> = fit.labels.iter().copied().collect();
            assert_eq!(distinct.len(), k, "k = {}", k);
        }
    }

    #[test]
    fn test_empty_cluster_is_relocated() {
        let rows = blobs();
        // The middle centroid starts with no members.
        let centroids = vec![vec![0.0, 0.0], vec![100.0, 100.0], vec![10.0, 10.0]];
        let fit = KMeans::new(3, 42).lloyd(&rows, centroids, 0.0);
        let distinct: std::collections::BTreeSet<usize> = fit.labels.iter().copied().collect();
        assert_eq!(distinct.len(), 3);
        assert!(fit.centroids[1][0] < 50.0);
    }

    #[test]
    fn test_identical_points() {
        let rows = vec![vec![1.0, 1.0]; 4];
        let fit = KMeans::new(2, 42).fit(&rows);
        assert_eq!(fit.labels.len(), 4);
        assert_eq!(fit.inertia, 0.0);
    }
}
