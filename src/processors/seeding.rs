//! Initial density-based seeding over the warm-up buffer.
//!
//! Runs exactly once, when the warm-up buffer is full: every sufficiently
//! dense buffered point seeds a micro-cluster that then absorbs its
//! density-reachable neighbors. Points whose neighborhood never clears the
//! density bound stay uncovered and are dropped with the buffer.

use crate::core::loaders::{euclidean_distance, StreamPoint};
use crate::core::microcluster::{ClusterSet, MicroCluster};

/// One in-progress expansion list and the cursor into it.
struct Frame {
    ids: Vec<usize>,
    next: usize,
}

/// Indices of uncovered buffered points strictly within `epsilon` of `values`.
///
/// The query point itself is expected to be covered already, so it never
/// appears in its own neighborhood.
fn neighborhood_of(buffer: &[StreamPoint], values: &[f64], epsilon: f64) -> Vec<usize> {
    buffer
        .iter()
        .enumerate()
        .filter(|(_, point)| !point.covered)
        .filter(|(_, point)| euclidean_distance(values, &point.values) < epsilon)
        .map(|(idx, _)| idx)
        .collect()
}

/// Absorb the density-reachable neighborhood of a seed into `cluster`.
///
/// Stack-driven replacement for the recursive expansion: each frame is one
/// neighborhood list being walked. A neighbor's own neighborhood is pushed
/// for expansion when the *expanding* list's size clears `min_points` --
/// not the freshly computed neighborhood's size. Intentional: expansion
/// keeps going through low-density neighbors of a dense list, so chains
/// hanging off a dense seed are absorbed into the seed's cluster.
fn expand_cluster(
    cluster: &mut MicroCluster,
    buffer: &mut [StreamPoint],
    seed_neighborhood: Vec<usize>,
    epsilon: f64,
    min_points: usize,
    now: u64,
) {
    let mut stack = vec![Frame {
        ids: seed_neighborhood,
        next: 0,
    }];

    loop {
        let (idx, expanding_len) = {
            let Some(frame) = stack.last_mut() else { break };
            if frame.next >= frame.ids.len() {
                stack.pop();
                continue;
            }
            let idx = frame.ids[frame.next];
            frame.next += 1;
            (idx, frame.ids.len())
        };

        if buffer[idx].covered {
            continue;
        }
        buffer[idx].covered = true;
        cluster.insert(&buffer[idx].values, now);

        let next_ids = neighborhood_of(buffer, &buffer[idx].values, epsilon);
        if expanding_len > min_points {
            stack.push(Frame {
                ids: next_ids,
                next: 0,
            });
        }
    }
}

/// Run the one-shot seeding pass over the warm-up buffer.
///
/// For each uncovered point whose neighborhood (uncovered points strictly
/// within `epsilon`) is larger than `min_points`, a micro-cluster is seeded
/// from the point and expanded over the reachable neighborhood. Seeded
/// clusters are appended to `potential`; points that never clear the bound
/// are left uncovered.
///
/// Returns the number of clusters seeded.
pub fn seed_initial_clusters(
    buffer: &mut [StreamPoint],
    potential: &mut ClusterSet,
    epsilon: f64,
    min_points: usize,
    lambda: f64,
    now: u64,
) -> usize {
    let mut seeded = 0;

    for idx in 0..buffer.len() {
        if buffer[idx].covered {
            continue;
        }
        buffer[idx].covered = true;

        let values = buffer[idx].values.clone();
        let neighborhood = neighborhood_of(buffer, &values, epsilon);

        if neighborhood.len() > min_points {
            let mut cluster = MicroCluster::new(&values, now, lambda);
            expand_cluster(&mut cluster, buffer, neighborhood, epsilon, min_points, now);
            potential.add(cluster);
            seeded += 1;
        } else {
            buffer[idx].covered = false;
        }
    }

    let residual = buffer.iter().filter(|p| !p.covered).count();
    log::info!(
        "seeding pass: {} clusters from {} points ({} residual uncovered)",
        seeded,
        buffer.len(),
        residual
    );

    seeded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_from(points: &[&[f64]]) -> Vec<StreamPoint> {
        points
            .iter()
            .map(|values| StreamPoint::new(values.to_vec(), 0))
            .collect()
    }

    #[test]
    fn test_two_groups_seed_two_clusters() {
        let mut buffer = buffer_from(&[
            &[0.0, 0.0],
            &[0.1, 0.0],
            &[0.0, 0.1],
            &[0.1, 0.1],
            &[10.0, 10.0],
            &[10.1, 10.0],
            &[10.0, 10.1],
            &[10.1, 10.1],
        ]);
        let mut potential = ClusterSet::new();

        let seeded = seed_initial_clusters(&mut buffer, &mut potential, 0.5, 1, 0.25, 0);

        assert_eq!(seeded, 2);
        assert_eq!(potential.len(), 2);
        assert!(buffer.iter().all(|p| p.covered));

        let c0 = potential.get(0).unwrap().center();
        let c1 = potential.get(1).unwrap().center();
        assert!((c0[0] - 0.05).abs() < 1e-9 && (c0[1] - 0.05).abs() < 1e-9);
        assert!((c1[0] - 10.05).abs() < 1e-9 && (c1[1] - 10.05).abs() < 1e-9);
        assert!((potential.get(0).unwrap().weight_at(0) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_seeding_leaves_points_uncovered() {
        // Every point is isolated; no neighborhood ever exceeds min_points.
        let mut buffer = buffer_from(&[&[0.0, 0.0], &[5.0, 5.0], &[10.0, 0.0]]);
        let mut potential = ClusterSet::new();

        let seeded = seed_initial_clusters(&mut buffer, &mut potential, 0.5, 1, 0.25, 0);

        assert_eq!(seeded, 0);
        assert!(potential.is_empty());
        assert!(buffer.iter().all(|p| !p.covered));
    }

    #[test]
    fn test_residual_point_stays_uncovered() {
        let mut buffer = buffer_from(&[
            &[0.0, 0.0],
            &[0.1, 0.0],
            &[0.0, 0.1],
            &[50.0, 50.0], // isolated
        ]);
        let mut potential = ClusterSet::new();

        let seeded = seed_initial_clusters(&mut buffer, &mut potential, 0.5, 1, 0.25, 0);

        assert_eq!(seeded, 1);
        assert!(!buffer[3].covered);
    }

    #[test]
    fn test_expansion_guard_uses_expanding_list_size() {
        // p0's neighborhood has 3 points (> min_points = 2), so expansion
        // proceeds through p1 even though p1's own neighborhood only has 2
        // uncovered points. p2 is reachable only through p1; it is absorbed
        // because the guard checks the expanding list, not p1's.
        let mut buffer = buffer_from(&[
            &[0.0, 0.0],  // p0 seed
            &[0.9, 0.0],  // p1
            &[1.8, 0.0],  // p2 only reachable via p1
            &[0.0, 0.5],  // p3
            &[0.5, 0.0],  // p4
        ]);
        let mut potential = ClusterSet::new();

        let seeded = seed_initial_clusters(&mut buffer, &mut potential, 1.0, 2, 0.25, 0);

        assert_eq!(seeded, 1);
        assert!(buffer[2].covered, "p2 must be absorbed through p1");
        assert!((potential.get(0).unwrap().weight_at(0) - 5.0).abs() < 1e-9);
    }
}
