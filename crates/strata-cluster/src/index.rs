use glam::DVec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use strata_math::Aabb;

use crate::cluster::Cluster;
use crate::point::DataPoint;

/// Tuning parameters for the clustering loop.
#[derive(Clone, Copy, Debug)]
pub struct ClusterParams {
    /// Hard cap on Lloyd's iteration rounds. Default: 100.
    pub max_iterations: u32,
    /// Squared-distance tolerance below which a centroid counts as
    /// unmoved when checking round stability. Default: 1e-9.
    pub stability_epsilon: f64,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            stability_epsilon: 1e-9,
        }
    }
}

/// Counters recorded by [`ClusterIndex::build`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Assignment rounds actually run.
    pub rounds: u32,
    /// Whether the loop stopped on stability rather than the iteration cap.
    pub converged: bool,
    /// Degenerate clusters re-seeded across all rounds.
    pub reseeds: u32,
}

/// Spatial index over payload-carrying points, clustered by k-means.
///
/// Lifecycle: register points with [`add_point`](Self::add_point), then call
/// [`build`](Self::build) exactly once, then query with
/// [`nearest_payload`](Self::nearest_payload). Registration after build is
/// rejected with a warning log. All post-build access is `&self`, so a
/// built index can be shared across worker threads.
pub struct ClusterIndex<P> {
    points: Vec<DataPoint<P>>,
    clusters: Vec<Cluster>,
    bounds: Option<Aabb>,
    params: ClusterParams,
    registration_closed: bool,
    build_complete: bool,
    stats: Option<BuildStats>,
}

impl<P: Copy> ClusterIndex<P> {
    /// Create an empty index with default parameters.
    pub fn new() -> Self {
        Self::with_params(ClusterParams::default())
    }

    /// Create an empty index with explicit parameters.
    pub fn with_params(params: ClusterParams) -> Self {
        Self {
            points: Vec::new(),
            clusters: Vec::new(),
            bounds: None,
            params,
            registration_closed: false,
            build_complete: false,
            stats: None,
        }
    }

    /// Register a point. No-op with a warning log once registration closed.
    ///
    /// The running bounding box grows in O(1): the first point sets both
    /// corners, later points update the per-axis min/max by comparison.
    pub fn add_point(&mut self, coordinate: DVec3, payload: P) {
        if self.registration_closed {
            tracing::warn!("point registration closed, dropping point at {coordinate:?}");
            return;
        }
        match &mut self.bounds {
            Some(bounds) => bounds.include(coordinate),
            None => self.bounds = Some(Aabb::from_point(coordinate)),
        }
        self.points.push(DataPoint {
            coordinate,
            payload,
        });
    }

    /// Cluster the registered points into `k` groups.
    ///
    /// Closes registration, then runs Lloyd's iteration seeded from `seed`:
    /// every round assigns each point to its nearest centroid by squared
    /// Euclidean distance (first-encountered cluster wins exact ties) and
    /// recomputes each non-empty cluster's centroid as the mean of its
    /// assignment. A cluster that received no points is re-seeded to a
    /// uniform-random position inside the bounding box so it cannot stay
    /// stranded. The loop stops when no centroid moved beyond the stability
    /// tolerance, or after `max_iterations` rounds. A final assignment pass
    /// then populates the member lists against the settled centroids.
    ///
    /// With zero registered points this is a no-op that only closes
    /// registration; the index keeps zero clusters and every query returns
    /// `None`. Same seed, points, and parameters produce an identical
    /// clustering.
    pub fn build(&mut self, k: usize, seed: u64) {
        self.registration_closed = true;

        if self.points.is_empty() {
            tracing::debug!("cluster build skipped: no points registered");
            return;
        }
        let Some(bounds) = self.bounds else {
            return;
        };
        if k == 0 {
            tracing::warn!("cluster build requested with k = 0, index will answer no queries");
            self.build_complete = true;
            self.stats = Some(BuildStats::default());
            return;
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.clusters = (0..k).map(|_| Cluster::seeded(&bounds, &mut rng)).collect();

        let mut rounds = 0;
        let mut reseeds = 0;
        let mut converged = false;
        while rounds < self.params.max_iterations && !converged {
            rounds += 1;

            for point in &self.points {
                let nearest = Self::nearest_cluster(&self.clusters, point.coordinate);
                self.clusters[nearest].accumulate(point.coordinate);
            }

            converged = true;
            for cluster in &mut self.clusters {
                if cluster.member_count > 0 {
                    let centroid = cluster.accumulator / f64::from(cluster.member_count);
                    if centroid.distance_squared(cluster.centroid) > self.params.stability_epsilon {
                        converged = false;
                    }
                    cluster.centroid = centroid;
                } else {
                    // Degenerate: the cluster's region was absorbed by its
                    // neighbors. Re-seeding does not unset round stability,
                    // so a cluster re-seeded on the last round may carry a
                    // centroid that is not a member mean.
                    cluster.randomize(&bounds, &mut rng);
                    reseeds += 1;
                }
                cluster.reset_accumulator();
            }
        }

        for (point_idx, point) in self.points.iter().enumerate() {
            let nearest = Self::nearest_cluster(&self.clusters, point.coordinate);
            self.clusters[nearest].members.push(point_idx);
        }

        self.build_complete = true;
        self.stats = Some(BuildStats {
            rounds,
            converged,
            reseeds,
        });
        tracing::debug!(
            points = self.points.len(),
            clusters = k,
            rounds,
            converged,
            reseeds,
            "cluster index built"
        );
    }

    /// Return the payload of an approximately-nearest registered point, or
    /// `None` if the index holds no clusters or has not been built.
    ///
    /// Two-stage search: linear scan over cluster centroids, then linear
    /// scan over the winning cluster's members. The result is approximate:
    /// a member of a neighboring cluster can be closer to the query than
    /// every member of the selected cluster. Also `None` when the selected
    /// cluster ended the build empty (possible after a last-round re-seed).
    pub fn nearest_payload(&self, coordinate: DVec3) -> Option<P> {
        if !self.build_complete || self.clusters.is_empty() {
            return None;
        }

        let cluster = &self.clusters[Self::nearest_cluster(&self.clusters, coordinate)];

        let mut nearest: Option<(usize, f64)> = None;
        for &point_idx in cluster.members() {
            let dist = self.points[point_idx].coordinate.distance_squared(coordinate);
            if nearest.is_none_or(|(_, best)| dist < best) {
                nearest = Some((point_idx, dist));
            }
        }
        nearest.map(|(point_idx, _)| self.points[point_idx].payload)
    }

    /// Index of the cluster whose centroid is nearest to `coordinate`.
    /// Strict `<` comparison keeps the first-encountered cluster on ties.
    ///
    /// Callers guarantee `clusters` is non-empty.
    fn nearest_cluster(clusters: &[Cluster], coordinate: DVec3) -> usize {
        let mut best = 0;
        let mut best_dist = clusters[0].centroid.distance_squared(coordinate);
        for (idx, cluster) in clusters.iter().enumerate().skip(1) {
            let dist = cluster.centroid.distance_squared(coordinate);
            if dist < best_dist {
                best = idx;
                best_dist = dist;
            }
        }
        best
    }

    /// All registered points, in registration order.
    pub fn points(&self) -> &[DataPoint<P>] {
        &self.points
    }

    /// All clusters. Empty before build (and after a zero-point build).
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// The running bounding box, `None` while no point is registered.
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    /// Number of registered points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if no points are registered.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns true once registration has closed.
    pub fn is_closed(&self) -> bool {
        self.registration_closed
    }

    /// Returns true once a build has completed.
    pub fn is_built(&self) -> bool {
        self.build_complete
    }

    /// Counters from the completed build, `None` before it.
    pub fn build_stats(&self) -> Option<BuildStats> {
        self.stats
    }

    /// The active tuning parameters.
    pub fn params(&self) -> &ClusterParams {
        &self.params
    }
}

impl<P: Copy> Default for ClusterIndex<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    const SEED: u64 = 42;

    fn scattered_index(count: usize) -> ClusterIndex<usize> {
        let mut rng = ChaCha8Rng::seed_from_u64(0xC0FFEE);
        let mut index = ClusterIndex::new();
        for i in 0..count {
            let p = DVec3::new(
                rng.random_range(0.0..=100.0),
                rng.random_range(0.0..=100.0),
                rng.random_range(0.0..=100.0),
            );
            index.add_point(p, i);
        }
        index
    }

    #[test]
    fn test_bounds_track_true_min_max() {
        let index = scattered_index(64);
        let bounds = index.bounds().unwrap();
        for axis in 0..3 {
            let lo = index
                .points()
                .iter()
                .map(|p| p.coordinate[axis])
                .fold(f64::INFINITY, f64::min);
            let hi = index
                .points()
                .iter()
                .map(|p| p.coordinate[axis])
                .fold(f64::NEG_INFINITY, f64::max);
            assert_eq!(bounds.min[axis], lo, "axis {axis} min");
            assert_eq!(bounds.max[axis], hi, "axis {axis} max");
        }
    }

    #[test]
    fn test_first_point_sets_both_corners() {
        let mut index = ClusterIndex::new();
        index.add_point(DVec3::new(4.0, 5.0, 6.0), 0usize);
        let bounds = index.bounds().unwrap();
        assert_eq!(bounds.min, bounds.max);
    }

    #[test]
    fn test_every_point_in_exactly_one_member_list() {
        let mut index = scattered_index(50);
        index.build(7, SEED);

        let mut seen = vec![0u32; index.len()];
        for cluster in index.clusters() {
            for &point_idx in cluster.members() {
                seen[point_idx] += 1;
            }
        }
        assert!(
            seen.iter().all(|&count| count == 1),
            "every point must appear in exactly one member list: {seen:?}"
        );
        let total: usize = index.clusters().iter().map(|c| c.len()).sum();
        assert_eq!(total, index.len());
    }

    #[test]
    fn test_centroid_equals_member_mean_after_convergence() {
        let mut index = scattered_index(200);
        index.build(2, SEED);

        let stats = index.build_stats().unwrap();
        assert!(stats.converged, "2 clusters over 200 points should stabilize");
        assert_eq!(stats.reseeds, 0, "well-spread points should not go degenerate");

        for cluster in index.clusters() {
            if cluster.is_empty() {
                continue;
            }
            let mean = cluster
                .members()
                .iter()
                .fold(DVec3::ZERO, |acc, &i| acc + index.points()[i].coordinate)
                / cluster.len() as f64;
            assert!(
                mean.distance_squared(cluster.centroid()) < 1e-6,
                "centroid {:?} diverges from member mean {mean:?}",
                cluster.centroid()
            );
        }
    }

    #[test]
    fn test_build_is_deterministic_for_fixed_seed() {
        let mut a = scattered_index(80);
        let mut b = scattered_index(80);
        a.build(9, SEED);
        b.build(9, SEED);

        assert_eq!(a.build_stats(), b.build_stats());
        for (ca, cb) in a.clusters().iter().zip(b.clusters()) {
            assert_eq!(ca.centroid(), cb.centroid());
            assert_eq!(ca.members(), cb.members());
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let mut a = scattered_index(80);
        let mut b = scattered_index(80);
        a.build(9, 1);
        b.build(9, 2);

        let same = a
            .clusters()
            .iter()
            .zip(b.clusters())
            .all(|(ca, cb)| ca.centroid() == cb.centroid());
        assert!(!same, "different seeds should move at least one centroid");
    }

    #[test]
    fn test_build_with_zero_points_leaves_zero_clusters() {
        let mut index: ClusterIndex<usize> = ClusterIndex::new();
        index.build(4, SEED);

        assert!(index.is_closed());
        assert!(!index.is_built());
        assert!(index.clusters().is_empty());
        assert_eq!(index.nearest_payload(DVec3::ZERO), None);
    }

    #[test]
    fn test_query_before_build_returns_none() {
        let mut index = ClusterIndex::new();
        index.add_point(DVec3::new(1.0, 1.0, 1.0), 0usize);
        assert_eq!(index.nearest_payload(DVec3::new(1.0, 1.0, 1.0)), None);
    }

    #[test]
    fn test_registration_closed_after_build() {
        let mut index = scattered_index(10);
        index.build(2, SEED);
        let len_before = index.len();
        index.add_point(DVec3::new(50.0, 50.0, 50.0), 999);
        assert_eq!(index.len(), len_before, "late registration must be ignored");
    }

    #[test]
    fn test_single_cluster_query_is_exact() {
        let mut index = ClusterIndex::new();
        index.add_point(DVec3::new(10.0, 10.0, 0.0), 0usize);
        index.add_point(DVec3::new(90.0, 90.0, 0.0), 1usize);
        index.add_point(DVec3::new(50.0, 10.0, 50.0), 2usize);
        index.build(1, SEED);

        // One cluster holds every point, so the member scan is a full scan.
        assert_eq!(index.nearest_payload(DVec3::new(12.0, 11.0, 1.0)), Some(0));
        assert_eq!(index.nearest_payload(DVec3::new(88.0, 91.0, 2.0)), Some(1));
        assert_eq!(index.nearest_payload(DVec3::new(49.0, 12.0, 48.0)), Some(2));
    }

    #[test]
    fn test_equidistant_points_first_registered_wins() {
        let mut index = ClusterIndex::new();
        index.add_point(DVec3::new(0.0, 0.0, 0.0), 0usize);
        index.add_point(DVec3::new(2.0, 0.0, 0.0), 1usize);
        index.build(1, SEED);

        // (1, 0, 0) is exactly 1.0 away from both points.
        assert_eq!(index.nearest_payload(DVec3::new(1.0, 0.0, 0.0)), Some(0));
    }

    #[test]
    fn test_iteration_cap_respected() {
        let mut index = scattered_index(120);
        index.build(12, SEED);
        let stats = index.build_stats().unwrap();
        assert!(stats.rounds >= 1);
        assert!(stats.rounds <= index.params().max_iterations);
    }

    #[test]
    fn test_build_with_k_zero_answers_no_queries() {
        let mut index = scattered_index(10);
        index.build(0, SEED);
        assert!(index.is_built());
        assert!(index.clusters().is_empty());
        assert_eq!(index.nearest_payload(DVec3::new(50.0, 50.0, 50.0)), None);
    }

    #[test]
    fn test_identical_points_collapse_to_one_centroid() {
        let mut index = ClusterIndex::new();
        let p = DVec3::new(25.0, 25.0, 25.0);
        for i in 0..6 {
            index.add_point(p, i);
        }
        index.build(2, SEED);

        // All points tie for every centroid; the first-encountered cluster
        // takes them all, and its centroid must settle on the point itself.
        let full: Vec<_> = index.clusters().iter().filter(|c| !c.is_empty()).collect();
        assert_eq!(full.len(), 1);
        assert!(full[0].centroid().distance_squared(p) < 1e-9);
        assert_eq!(full[0].len(), 6);
    }
}
