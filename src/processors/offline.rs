//! Offline macro extraction: density grouping over micro-cluster centers.
//!
//! On demand, the potential micro-clusters are grouped by density
//! reachability of their centers (neighbor computation parallelized with
//! rayon) and each connected group is collapsed into one macro cluster.
//! This is a pure read over a snapshot of the streaming state.

use std::collections::VecDeque;

use rayon::prelude::*;

use crate::core::loaders::euclidean_distance;
use crate::core::microcluster::ClusterSet;

/// One final cluster produced by the offline grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroCluster {
    /// Indices into the potential-cluster snapshot this group was built from.
    pub members: Vec<usize>,
    /// Weighted mean of the member centers.
    pub center: Vec<f64>,
    /// Summed decayed member weight.
    pub weight: f64,
}

/// Group the potential micro-clusters of a set, reading weights at `now`.
pub fn group_clusters(
    set: &ClusterSet,
    radius: f64,
    min_points: usize,
    now: u64,
) -> Vec<MacroCluster> {
    let centers: Vec<Vec<f64>> = set.iter().map(|c| c.center()).collect();
    let weights: Vec<f64> = set.iter().map(|c| c.weight_at(now)).collect();
    group_centers(&centers, &weights, radius, min_points)
}

/// Density grouping of weighted center vectors.
///
/// A center's neighborhood is every center (itself included) within
/// `radius`; a center with at least `min_points` neighbors is a core.
/// Groups are the density-connected components of the cores plus their
/// border centers; centers reachable from no core are dropped as noise.
///
/// # Arguments
///
/// * `centers` - One vector per micro-cluster center
/// * `weights` - Decayed weight per center, same order
/// * `radius` - Grouping radius
/// * `min_points` - Minimum neighborhood size for a core center
///
/// # Returns
///
/// One [`MacroCluster`] per group, in discovery order, members ascending.
pub fn group_centers(
    centers: &[Vec<f64>],
    weights: &[f64],
    radius: f64,
    min_points: usize,
) -> Vec<MacroCluster> {
    let n = centers.len();
    if n == 0 {
        return Vec::new();
    }
    debug_assert_eq!(n, weights.len(), "one weight per center");

    // Neighbor lists, including the center itself.
    let neighbors: Vec<Vec<usize>> = centers
        .par_iter()
        .map(|center| {
            centers
                .iter()
                .enumerate()
                .filter(|(_, other)| euclidean_distance(center, other) <= radius)
                .map(|(j, _)| j)
                .collect()
        })
        .collect();

    let is_core: Vec<bool> = neighbors
        .par_iter()
        .map(|neigh| neigh.len() >= min_points)
        .collect();

    // Breadth-first expansion over density-connected cores; border centers
    // join the first group that reaches them.
    let mut visited = vec![false; n];
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for seed in 0..n {
        if visited[seed] || !is_core[seed] {
            continue;
        }
        visited[seed] = true;

        let mut members = Vec::new();
        let mut queue = VecDeque::from([seed]);
        while let Some(idx) = queue.pop_front() {
            members.push(idx);
            if is_core[idx] {
                for &next in &neighbors[idx] {
                    if !visited[next] {
                        visited[next] = true;
                        queue.push_back(next);
                    }
                }
            }
        }

        members.sort_unstable();
        groups.push(members);
    }

    let noise = visited.iter().filter(|v| !**v).count();
    if noise > 0 {
        log::debug!("offline grouping: {} centers left as noise", noise);
    }

    groups
        .into_iter()
        .map(|members| {
            let dims = centers[members[0]].len();
            let mut center = vec![0.0; dims];
            let mut weight = 0.0;
            for &idx in &members {
                weight += weights[idx];
                for d in 0..dims {
                    center[d] += centers[idx][d] * weights[idx];
                }
            }
            for value in &mut center {
                *value /= weight;
            }
            MacroCluster {
                members,
                center,
                weight,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_groups_of_centers() {
        let centers = vec![
            vec![0.0, 0.0],
            vec![0.5, 0.0],
            vec![10.0, 10.0],
            vec![10.5, 10.0],
        ];
        let weights = vec![1.0; 4];

        let groups = group_centers(&centers, &weights, 1.0, 1);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].members, vec![0, 1]);
        assert_eq!(groups[1].members, vec![2, 3]);
        assert!((groups[0].center[0] - 0.25).abs() < 1e-12);
        assert!((groups[1].center[1] - 10.0).abs() < 1e-12);
        assert_eq!(groups[0].weight, 2.0);
    }

    #[test]
    fn test_chain_merges_into_one_group() {
        // Ends are far apart but density-connected through the middle.
        let centers = vec![vec![0.0], vec![0.9], vec![1.8], vec![2.7]];
        let weights = vec![1.0; 4];

        let groups = group_centers(&centers, &weights, 1.0, 2);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_isolated_center_is_noise() {
        let centers = vec![vec![0.0], vec![0.5], vec![100.0]];
        let weights = vec![1.0; 3];

        // min_points = 2: the isolated center is not a core and no core
        // reaches it.
        let groups = group_centers(&centers, &weights, 1.0, 2);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members, vec![0, 1]);
    }

    #[test]
    fn test_weighted_center() {
        let centers = vec![vec![0.0], vec![1.0]];
        let weights = vec![3.0, 1.0];

        let groups = group_centers(&centers, &weights, 2.0, 1);

        assert_eq!(groups.len(), 1);
        assert!((groups[0].center[0] - 0.25).abs() < 1e-12);
        assert_eq!(groups[0].weight, 4.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(group_centers(&[], &[], 1.0, 1).is_empty());
    }
}
