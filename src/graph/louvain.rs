// ============================================================================
// LOUVAIN (Modularity-based Community Detection)
// ============================================================================
//
//   Q = Σ_c [ L_c / m  -  γ * (D_c / 2m)² ]
//
//   m   = total edge weight
//   L_c = edge weight inside community c
//   D_c = sum of weighted degrees of the members of c
//   γ   = resolution (1.0 = classic modularity)
//
// 1. Every node starts alone
// 2. Visit nodes in a seeded shuffled order; move each to the neighboring
//    community with the largest positive gain, repeat until a pass moves nothing
// 3. Collapse communities into super-nodes (internal weight becomes a self-loop)
// 4. Repeat while a level improves modularity by more than the threshold
// ============================================================================

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;

use crate::errors::{AlgoResult, AlgorithmError};

/// Upper bound on local-moving passes per level. Gains are strictly positive,
/// so hitting this means floating point noise is cycling nodes.
const MAX_PASSES: usize = 1000;

/// One level of the aggregation hierarchy
struct Level {
    /// Neighbors excluding self, weights summed per pair
    adj: Vec<Vec<(usize, f64)>>,
    /// Self-loop weight (collapsed internal edges)
    loops: Vec<f64>,
}

impl Level {
    fn len(&self) -> usize {
        self.adj.len()
    }

    fn degree(&self, u: usize) -> f64 {
        self.adj[u].iter().map(|(_, w)| w).sum::<f64>() + 2.0 * self.loops[u]
    }

    fn modularity(&self, labels: &[usize], communities: usize, m: f64, resolution: f64) -> f64 {
        let mut internal = vec![0.0; communities];
        let mut degree = vec![0.0; communities];
        for u in 0..self.len() {
            let c = labels[u];
            degree[c] += self.degree(u);
            internal[c] += self.loops[u];
            for &(v, w) in &self.adj[u] {
                if labels[v] == c {
                    // seen from both endpoints
                    internal[c] += w / 2.0;
                }
            }
        }
        internal
            .iter()
            .zip(&degree)
            .map(|(l, d)| l / m - resolution * (d / (2.0 * m)).powi(2))
            .sum()
    }

    fn aggregate(&self, labels: &[usize], communities: usize) -> Level {
        let mut loops = vec![0.0; communities];
        let mut links: Vec<FxHashMap<usize, f64>> = vec![FxHashMap::default(); communities];
        for u in 0..self.len() {
            let cu = labels[u];
            loops[cu] += self.loops[u];
            for &(v, w) in &self.adj[u] {
                let cv = labels[v];
                if cu == cv {
                    loops[cu] += w / 2.0;
                } else {
                    *links[cu].entry(cv).or_insert(0.0) += w;
                }
            }
        }
        let adj = links
            .into_iter()
            .map(|map| {
                let mut edges: Vec<(usize, f64)> = map.into_iter().collect();
                edges.sort_by_key(|(v, _)| *v);
                edges
            })
            .collect();
        Level { adj, loops }
    }
}

/// Weighted Louvain community detection.
/// Returns one community label per node, numbered 0.. in order of first
/// appearance. A graph without edges yields one community per node.
///
/// # Errors
/// - `InvalidParameter` if resolution <= 0
/// - `Degenerate` if edges exist but their total weight is not positive
/// - `NonConvergence` if local moving keeps cycling
/// - `NonFinite` if modularity becomes NaN/inf
pub fn louvain(
    neighbors: &[Vec<(usize, f64)>],
    resolution: f64,
    threshold: f64,
    seed: u64,
) -> AlgoResult<Vec<usize>> {
    let n = neighbors.len();
    if resolution <= 0.0 {
        return Err(AlgorithmError::InvalidParameter(format!(
            "resolution must be positive, got {}",
            resolution
        )));
    }
    if neighbors.iter().all(|edges| edges.is_empty()) {
        return Ok((0..n).collect());
    }

    let m = neighbors
        .iter()
        .flat_map(|edges| edges.iter().map(|(_, w)| w))
        .sum::<f64>()
        / 2.0;
    if !m.is_finite() || m <= 0.0 {
        return Err(AlgorithmError::Degenerate(format!(
            "total edge weight must be positive, got {}",
            m
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut level = Level {
        adj: neighbors.to_vec(),
        loops: vec![0.0; n],
    };
    let mut assignment: Vec<usize> = (0..n).collect();
    let mut modularity = level.modularity(&assignment, n, m, resolution);

    loop {
        let (communities, improved) = one_level(&level, m, resolution, &mut rng)?;
        let (labels, count) = renumber(&communities);
        for a in assignment.iter_mut() {
            *a = labels[*a];
        }
        if !improved {
            break;
        }

        let new_modularity = level.modularity(&labels, count, m, resolution);
        if !new_modularity.is_finite() {
            return Err(AlgorithmError::NonFinite {
                algorithm: "louvain",
            });
        }
        if new_modularity - modularity <= threshold {
            break;
        }
        modularity = new_modularity;
        level = level.aggregate(&labels, count);
    }

    Ok(renumber(&assignment).0)
}

/// Local moving phase. Returns the community of each level node and whether
/// any node moved.
fn one_level(
    level: &Level,
    m: f64,
    resolution: f64,
    rng: &mut ChaCha8Rng,
) -> AlgoResult<(Vec<usize>, bool)> {
    let n = level.len();
    let degrees: Vec<f64> = (0..n).map(|u| level.degree(u)).collect();
    let mut node2com: Vec<usize> = (0..n).collect();
    let mut totals = degrees.clone();

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);

    let two_m_sq = 2.0 * m * m;
    let mut improved = false;
    let mut passes = 0;
    loop {
        let mut moves = 0;
        for &u in &order {
            let current = node2com[u];
            let weights = community_weights(&level.adj[u], &node2com);
            let degree = degrees[u];

            totals[current] -= degree;
            let to_current = weights
                .iter()
                .find(|(c, _)| *c == current)
                .map(|(_, w)| *w)
                .unwrap_or(0.0);
            let remove_cost = -to_current / m + resolution * totals[current] * degree / two_m_sq;

            let mut best = current;
            let mut best_gain = 0.0;
            for &(community, weight) in &weights {
                let gain =
                    remove_cost + weight / m - resolution * totals[community] * degree / two_m_sq;
                if gain > best_gain {
                    best_gain = gain;
                    best = community;
                }
            }
            totals[best] += degree;

            if best != current {
                node2com[u] = best;
                moves += 1;
                improved = true;
            }
        }

        if moves == 0 {
            break;
        }
        passes += 1;
        if passes >= MAX_PASSES {
            return Err(AlgorithmError::NonConvergence {
                algorithm: "louvain",
                iterations: passes,
            });
        }
    }
    Ok((node2com, improved))
}

/// Edge weight from a node into each neighboring community, first-seen order
fn community_weights(edges: &[(usize, f64)], node2com: &[usize]) -> Vec<(usize, f64)> {
    let mut weights: Vec<(usize, f64)> = Vec::new();
    for &(v, w) in edges {
        let c = node2com[v];
        match weights.iter_mut().find(|(existing, _)| *existing == c) {
            Some(entry) => entry.1 += w,
            None => weights.push((c, w)),
        }
    }
    weights
}

/// Map arbitrary labels onto 0..k by first appearance
fn renumber(labels: &[usize]) -> (Vec<usize>, usize) {
    let mut map: FxHashMap<usize, usize> = FxHashMap::default();
    let renumbered = labels
        .iter()
        .map(|l| {
            let next = map.len();
            *map.entry(*l).or_insert(next)
        })
        .collect();
    (renumbered, map.len())
}
