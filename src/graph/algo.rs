// Graph algorithms over the actor graph
//
// All functions take adjacency lists indexed by node position (the order of
// NetworkGraph::nodes) and return one value per node in that same order.
//
// PARALLELIZATION:
// - Betweenness: Brandes BFS from each source in parallel
// - Closeness: BFS from each node in parallel
// rayon's indexed collect keeps results in node order.
//
// ERROR HANDLING:
// Iterative methods return AlgoResult so that callers can choose a fallback
// (uniform PageRank, degree-based eigenvector) instead of failing.

use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

use crate::errors::{AlgoResult, AlgorithmError};

// ============================================================================
// PAGERANK
// ============================================================================
//
//   PR(v) = (1 - d) / N + d * ( Σ_u PR(u) * w(u,v) / W(u) + D / N )
//
// where W(u) is the total incident weight of u and D is the score currently
// held by dangling nodes (W = 0), redistributed uniformly.
//
// Converged when the L1 change between iterations drops below N * tolerance.
// ============================================================================

/// Edge-weighted PageRank on an undirected graph.
///
/// # Errors
/// - `InvalidParameter` if damping is outside [0, 1]
/// - `NonConvergence` if `max_iterations` pass without meeting the tolerance
/// - `NonFinite` if weights drive scores to NaN/inf
pub fn pagerank(
    neighbors: &[Vec<(usize, f64)>],
    damping: f64,
    max_iterations: usize,
    tolerance: f64,
) -> AlgoResult<Vec<f64>> {
    let n = neighbors.len();
    if n == 0 {
        return Ok(vec![]);
    }
    if !(0.0..=1.0).contains(&damping) {
        return Err(AlgorithmError::InvalidParameter(format!(
            "damping must be in [0, 1], got {}",
            damping
        )));
    }

    let out_weight: Vec<f64> = neighbors
        .iter()
        .map(|edges| edges.iter().map(|(_, w)| w).sum())
        .collect();
    let dangling: Vec<usize> = (0..n).filter(|&i| out_weight[i] == 0.0).collect();

    let uniform = 1.0 / n as f64;
    let mut scores = vec![uniform; n];

    for _ in 0..max_iterations {
        let dangling_mass: f64 = dangling.iter().map(|&i| scores[i]).sum();
        let base = (1.0 - damping) * uniform + damping * dangling_mass * uniform;

        let mut next = vec![base; n];
        for (u, edges) in neighbors.iter().enumerate() {
            if out_weight[u] == 0.0 {
                continue;
            }
            let share = damping * scores[u] / out_weight[u];
            for &(v, w) in edges {
                next[v] += share * w;
            }
        }

        if next.iter().any(|v| !v.is_finite()) {
            return Err(AlgorithmError::NonFinite {
                algorithm: "pagerank",
            });
        }

        let diff: f64 = scores.iter().zip(&next).map(|(a, b)| (a - b).abs()).sum();
        scores = next;
        if diff < n as f64 * tolerance {
            return Ok(scores);
        }
    }

    Err(AlgorithmError::NonConvergence {
        algorithm: "pagerank",
        iterations: max_iterations,
    })
}

// ============================================================================
// BETWEENNESS CENTRALITY (Brandes)
// ============================================================================
//
//   BC(v) = Σ σ_st(v) / σ_st   over ordered pairs s ≠ v ≠ t
//
// Unweighted (hop-count) shortest paths. Each unordered pair is visited from
// both ends, so normalizing by 1 / ((N-1)(N-2)) yields the fraction of pairs.
// ============================================================================

/// Normalized betweenness centrality (PARALLELIZED).
pub fn betweenness_centrality(neighbors: &[Vec<usize>]) -> Vec<f64> {
    let n = neighbors.len();
    if n == 0 {
        return vec![];
    }

    let partials: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|source| brandes_from(neighbors, source))
        .collect();

    let mut betweenness = vec![0.0; n];
    for partial in partials {
        for (total, p) in betweenness.iter_mut().zip(partial) {
            *total += p;
        }
    }

    if n > 2 {
        let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
        for b in &mut betweenness {
            *b *= scale;
        }
    }
    betweenness
}

/// Dependency contributions of a single BFS source.
fn brandes_from(neighbors: &[Vec<usize>], source: usize) -> Vec<f64> {
    let n = neighbors.len();
    let mut stack = Vec::with_capacity(n);
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut sigma = vec![0.0_f64; n];
    let mut distance = vec![-1_i64; n];
    sigma[source] = 1.0;
    distance[source] = 0;

    let mut queue = VecDeque::new();
    queue.push_back(source);
    while let Some(v) = queue.pop_front() {
        stack.push(v);
        for &w in &neighbors[v] {
            if distance[w] < 0 {
                distance[w] = distance[v] + 1;
                queue.push_back(w);
            }
            if distance[w] == distance[v] + 1 {
                sigma[w] += sigma[v];
                predecessors[w].push(v);
            }
        }
    }

    let mut delta = vec![0.0; n];
    let mut partial = vec![0.0; n];
    while let Some(w) = stack.pop() {
        for &v in &predecessors[w] {
            delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
        }
        if w != source {
            partial[w] += delta[w];
        }
    }
    partial
}

// ============================================================================
// CLOSENESS CENTRALITY
// ============================================================================
//
//   C(v) = (r - 1) / Σ d(v, u)  *  (r - 1) / (N - 1)
//
// r counts the nodes reachable from v (v included). The second factor
// (Wasserman-Faust) scales down nodes that live in small components, so
// unreachable nodes never contribute an infinite distance.
// ============================================================================

/// Closeness centrality with the Wasserman-Faust component correction (PARALLELIZED).
pub fn closeness_centrality(neighbors: &[Vec<usize>]) -> Vec<f64> {
    let n = neighbors.len();
    if n == 0 {
        return vec![];
    }

    (0..n)
        .into_par_iter()
        .map(|v| {
            let distances = bfs_distances(neighbors, v);
            let (reached, total) = distances
                .iter()
                .filter_map(|d| *d)
                .fold((0usize, 0usize), |(r, t), d| (r + 1, t + d));
            if total == 0 || n <= 1 {
                return 0.0;
            }
            let r = (reached - 1) as f64;
            (r / total as f64) * (r / (n - 1) as f64)
        })
        .collect()
}

fn bfs_distances(neighbors: &[Vec<usize>], source: usize) -> Vec<Option<usize>> {
    let mut distance = vec![None; neighbors.len()];
    distance[source] = Some(0);
    let mut queue = VecDeque::from([source]);
    while let Some(v) = queue.pop_front() {
        let next = distance[v].map(|d| d + 1);
        for &w in &neighbors[v] {
            if distance[w].is_none() {
                distance[w] = next;
                queue.push_back(w);
            }
        }
    }
    distance
}

// ============================================================================
// EIGENVECTOR CENTRALITY
// ============================================================================
//
// Power iteration on (A + I): the identity shift keeps bipartite graphs from
// oscillating between two eigenvectors. Scores are L2-normalized each round.
// ============================================================================

/// Unweighted eigenvector centrality.
///
/// # Errors
/// - `Degenerate` for the empty graph
/// - `NonConvergence` if `max_iterations` pass without meeting the tolerance
pub fn eigenvector_centrality(
    neighbors: &[Vec<usize>],
    max_iterations: usize,
    tolerance: f64,
) -> AlgoResult<Vec<f64>> {
    let n = neighbors.len();
    if n == 0 {
        return Err(AlgorithmError::Degenerate(
            "eigenvector centrality of the empty graph".into(),
        ));
    }

    let mut x = vec![1.0 / n as f64; n];
    for _ in 0..max_iterations {
        let last = x.clone();
        for (v, adj) in neighbors.iter().enumerate() {
            for &w in adj {
                x[w] += last[v];
            }
        }

        let norm = x.iter().map(|v| v * v).sum::<f64>().sqrt();
        let norm = if norm == 0.0 { 1.0 } else { norm };
        for v in &mut x {
            *v /= norm;
        }

        let diff: f64 = x.iter().zip(&last).map(|(a, b)| (a - b).abs()).sum();
        if diff < n as f64 * tolerance {
            return Ok(x);
        }
    }

    Err(AlgorithmError::NonConvergence {
        algorithm: "eigenvector",
        iterations: max_iterations,
    })
}

// ============================================================================
// LOCAL CLUSTERING COEFFICIENT
// ============================================================================

/// Fraction of a node's neighbor pairs that are themselves linked.
/// Zero for nodes with fewer than two neighbors.
pub fn clustering_coefficients(neighbors: &[Vec<usize>]) -> Vec<f64> {
    let sets: Vec<FxHashSet<usize>> = neighbors
        .iter()
        .map(|adj| adj.iter().copied().collect())
        .collect();

    neighbors
        .iter()
        .enumerate()
        .map(|(v, adj)| {
            let k = adj.len();
            if k < 2 {
                return 0.0;
            }
            let mut links = 0usize;
            for (i, &a) in adj.iter().enumerate() {
                for &b in &adj[i + 1..] {
                    if sets[a].contains(&b) {
                        links += 1;
                    }
                }
            }
            debug_assert!(!sets[v].contains(&v));
            2.0 * links as f64 / (k * (k - 1)) as f64
        })
        .collect()
}

// ============================================================================
// CONNECTED COMPONENTS
// ============================================================================

/// Components in order of their lowest node position; members ascending.
pub fn connected_components(neighbors: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = neighbors.len();
    let mut seen = vec![false; n];
    let mut components = Vec::new();

    for start in 0..n {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        let mut component = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(v) = queue.pop_front() {
            for &w in &neighbors[v] {
                if !seen[w] {
                    seen[w] = true;
                    component.push(w);
                    queue.push_back(w);
                }
            }
        }
        component.sort_unstable();
        components.push(component);
    }
    components
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-6;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn undirected(n: usize, edges: &[(usize, usize)]) -> Vec<Vec<usize>> {
        let mut adj = vec![Vec::new(); n];
        for &(a, b) in edges {
            adj[a].push(b);
            adj[b].push(a);
        }
        adj
    }

    fn weighted(adj: &[Vec<usize>]) -> Vec<Vec<(usize, f64)>> {
        adj.iter()
            .map(|ns| ns.iter().map(|&n| (n, 1.0)).collect())
            .collect()
    }

    fn star(n: usize) -> Vec<Vec<usize>> {
        let edges: Vec<(usize, usize)> = (1..n).map(|i| (0, i)).collect();
        undirected(n, &edges)
    }

    fn path(n: usize) -> Vec<Vec<usize>> {
        let edges: Vec<(usize, usize)> = (0..n - 1).map(|i| (i, i + 1)).collect();
        undirected(n, &edges)
    }

    #[test]
    fn test_pagerank_sums_to_one() {
        let adj = star(5);
        let pr = pagerank(&weighted(&adj), 0.85, 100, 1e-6).unwrap();
        assert!(approx_eq(pr.iter().sum::<f64>(), 1.0));
        assert!(pr[0] > pr[1]);
        assert!(approx_eq(pr[1], pr[4]));
    }

    #[test]
    fn test_pagerank_weights_matter() {
        // a - b heavy, a - c light: b outranks c
        let adj = vec![vec![(1, 10.0), (2, 1.0)], vec![(0, 10.0)], vec![(0, 1.0)]];
        let pr = pagerank(&adj, 0.85, 100, 1e-6).unwrap();
        assert!(pr[1] > pr[2]);
    }

    #[test]
    fn test_pagerank_isolated_nodes_uniform() {
        let adj = vec![Vec::new(); 4];
        let pr = pagerank(&adj, 0.85, 100, 1e-6).unwrap();
        for v in pr {
            assert!(approx_eq(v, 0.25));
        }
    }

    #[test]
    fn test_pagerank_invalid_damping() {
        let result = pagerank(&[vec![]], 1.5, 100, 1e-6);
        assert!(matches!(result, Err(AlgorithmError::InvalidParameter(_))));
    }

    #[test]
    fn test_pagerank_non_convergence_reported() {
        let adj = weighted(&path(6));
        let result = pagerank(&adj, 0.85, 1, 1e-12);
        assert!(matches!(result, Err(AlgorithmError::NonConvergence { .. })));
    }

    #[test]
    fn test_betweenness_star_center_is_one() {
        let bc = betweenness_centrality(&star(5));
        assert!(approx_eq(bc[0], 1.0));
        for leaf in &bc[1..] {
            assert!(approx_eq(*leaf, 0.0));
        }
    }

    #[test]
    fn test_betweenness_path() {
        // 0 - 1 - 2: middle node lies on the only 0..2 path
        let bc = betweenness_centrality(&path(3));
        assert!(approx_eq(bc[1], 1.0));
        assert!(approx_eq(bc[0], 0.0));
    }

    #[test]
    fn test_betweenness_tiny_graphs() {
        assert!(betweenness_centrality(&[]).is_empty());
        assert_eq!(betweenness_centrality(&path(2)), vec![0.0, 0.0]);
    }

    #[test]
    fn test_closeness_path() {
        let cc = closeness_centrality(&path(3));
        assert!(approx_eq(cc[1], 1.0));
        assert!(approx_eq(cc[0], 2.0 / 3.0));
    }

    #[test]
    fn test_closeness_disconnected_scaled() {
        // pair {0,1} plus isolated node 2
        let adj = undirected(3, &[(0, 1)]);
        let cc = closeness_centrality(&adj);
        assert!(approx_eq(cc[0], 0.5));
        assert!(approx_eq(cc[2], 0.0));
    }

    #[test]
    fn test_eigenvector_star() {
        let ev = eigenvector_centrality(&star(4), 1000, 1e-6).unwrap();
        assert!(ev[0] > ev[1]);
        assert!(approx_eq(ev[1], ev[3]));
        let norm: f64 = ev.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!(approx_eq(norm, 1.0));
    }

    #[test]
    fn test_eigenvector_empty_is_degenerate() {
        assert!(matches!(
            eigenvector_centrality(&[], 1000, 1e-6),
            Err(AlgorithmError::Degenerate(_))
        ));
    }

    #[test]
    fn test_clustering_triangle_with_tail() {
        // triangle 0-1-2 plus 2-3
        let adj = undirected(4, &[(0, 1), (1, 2), (2, 0), (2, 3)]);
        let cc = clustering_coefficients(&adj);
        assert!(approx_eq(cc[0], 1.0));
        assert!(approx_eq(cc[2], 1.0 / 3.0));
        assert!(approx_eq(cc[3], 0.0));
    }

    #[test]
    fn test_connected_components() {
        let adj = undirected(5, &[(0, 3), (1, 2)]);
        let comps = connected_components(&adj);
        assert_eq!(comps, vec![vec![0, 3], vec![1, 2], vec![4]]);
    }
}
