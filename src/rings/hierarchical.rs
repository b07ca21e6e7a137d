//! Agglomerative clustering with Ward linkage
//!
//! Merges are driven by the Lance-Williams update on squared Ward distances:
//!
//!   d(k, i∪j) = [(n_i+n_k)·d(k,i) + (n_j+n_k)·d(k,j) − n_k·d(i,j)] / (n_i+n_j+n_k)

use crate::math::squared_distance;

/// Merge rows until `k` clusters remain. Labels are numbered 0.. in order of
/// first appearance. `k` is clamped to [1, rows.len()].
pub fn ward(rows: &[Vec<f64>], k: usize) -> Vec<usize> {
    let n = rows.len();
    if n == 0 {
        return Vec::new();
    }
    let k = k.clamp(1, n);

    // cluster slot -> members; merged slots become None
    let mut members: Vec<Option<Vec<usize>>> = (0..n).map(|i| Some(vec![i])).collect();
    let mut dist: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| squared_distance(&rows[i], &rows[j])).collect())
        .collect();
    let mut active = n;

    while active > k {
        let Some((a, b)) = closest_pair(&members, &dist) else {
            break;
        };
        let size = |slot: usize| members[slot].as_ref().map_or(0, |m| m.len()) as f64;
        let (na, nb) = (size(a), size(b));

        for c in 0..n {
            if c == a || c == b || members[c].is_none() {
                continue;
            }
            let nc = size(c);
            let updated = ((na + nc) * dist[c][a] + (nb + nc) * dist[c][b] - nc * dist[a][b])
                / (na + nb + nc);
            dist[a][c] = updated;
            dist[c][a] = updated;
        }

        if let Some(moved) = members[b].take() {
            if let Some(target) = members[a].as_mut() {
                target.extend(moved);
            }
        }
        active -= 1;
    }

    let mut slot_of = vec![0usize; n];
    for (slot, group) in members.iter().enumerate() {
        if let Some(group) = group {
            for &i in group {
                slot_of[i] = slot;
            }
        }
    }

    let mut labels = vec![0usize; n];
    let mut seen: Vec<usize> = Vec::new();
    for i in 0..n {
        let slot = slot_of[i];
        labels[i] = match seen.iter().position(|&s| s == slot) {
            Some(label) => label,
            None => {
                seen.push(slot);
                seen.len() - 1
            }
        };
    }
    labels
}

/// Lowest-distance pair of live clusters; ties go to the first pair scanned
fn closest_pair(members: &[Option<Vec<usize>>], dist: &[Vec<f64>]) -> Option<(usize, usize)> {
    let live: Vec<usize> = (0..members.len()).filter(|&i| members[i].is_some()).collect();
    let mut best: Option<(usize, usize, f64)> = None;
    for (x, &a) in live.iter().enumerate() {
        for &b in &live[x + 1..] {
            let d = dist[a][b];
            if best.map_or(true, |(_, _, bd)| d < bd) {
                best = Some((a, b, d));
            }
        }
    }
    best.map(|(a, b, _)| (a, b))
}
