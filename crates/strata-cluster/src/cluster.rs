use glam::DVec3;
use rand::Rng;
use strata_math::Aabb;

/// One cluster of the index: a centroid plus the points assigned to it.
///
/// During build, `accumulator` and `member_count` carry the running sum used
/// to recompute the centroid after each assignment round. `members` holds
/// indices into the owning index's point arena and is written exactly once,
/// by the final assignment pass after the centroids stabilize.
#[derive(Clone, Debug)]
pub struct Cluster {
    pub(crate) centroid: DVec3,
    pub(crate) accumulator: DVec3,
    pub(crate) member_count: u32,
    pub(crate) members: Vec<usize>,
}

impl Cluster {
    /// Create a cluster with a centroid drawn uniformly at random inside
    /// `bounds`. This is a seeding heuristic; separation is not guaranteed.
    pub(crate) fn seeded(bounds: &Aabb, rng: &mut impl Rng) -> Self {
        let mut cluster = Self {
            centroid: DVec3::ZERO,
            accumulator: DVec3::ZERO,
            member_count: 0,
            members: Vec::new(),
        };
        cluster.randomize(bounds, rng);
        cluster
    }

    /// Move the centroid to a fresh uniform-random point inside `bounds`.
    ///
    /// Used for initial seeding and to recover a cluster that finished an
    /// assignment round with zero members.
    pub(crate) fn randomize(&mut self, bounds: &Aabb, rng: &mut impl Rng) {
        self.centroid = DVec3::new(
            rng.random_range(bounds.min.x..=bounds.max.x),
            rng.random_range(bounds.min.y..=bounds.max.y),
            rng.random_range(bounds.min.z..=bounds.max.z),
        );
    }

    /// Fold a point into the running sum for the current round.
    pub(crate) fn accumulate(&mut self, point: DVec3) {
        self.accumulator += point;
        self.member_count += 1;
    }

    /// Clear the running sum ahead of the next assignment round.
    pub(crate) fn reset_accumulator(&mut self) {
        self.accumulator = DVec3::ZERO;
        self.member_count = 0;
    }

    /// The cluster's current centroid.
    pub fn centroid(&self) -> DVec3 {
        self.centroid
    }

    /// Indices (into the index's point arena) of the points assigned to this
    /// cluster by the final pass. Empty until the build completes.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Number of assigned points.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if no points were assigned to this cluster.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
