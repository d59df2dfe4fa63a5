use glam::DVec3;

/// A registered data point: a feature-space coordinate plus the payload it
/// stands for.
///
/// Created once at registration and immutable afterwards; points live as
/// long as the owning index and are never removed individually.
#[derive(Clone, Copy, Debug)]
pub struct DataPoint<P> {
    /// Position in feature space.
    pub coordinate: DVec3,
    /// Typed back-reference to the owning record (e.g. a catalog id).
    pub payload: P,
}
