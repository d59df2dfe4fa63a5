use glam::DVec3;

/// Axis-Aligned Bounding Box in f64 feature space.
///
/// Invariant: min.x <= max.x, min.y <= max.y, min.z <= max.z.
/// The two-corner constructor enforces this by sorting components.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    /// Create an AABB from two corners. Automatically sorts
    /// components so that min <= max on every axis.
    pub fn new(a: DVec3, b: DVec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create a degenerate AABB containing exactly one point.
    pub fn from_point(p: DVec3) -> Self {
        Self { min: p, max: p }
    }

    /// Grow the box so that it contains `p`.
    ///
    /// Per-axis comparison against the current corners; no recomputation
    /// over previously included points.
    pub fn include(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Returns true if the point lies inside or on the boundary.
    pub fn contains_point(&self, p: DVec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Returns the center point of the box.
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the size along each axis.
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// Returns true if the box has zero extent on at least one axis.
    pub fn is_degenerate(&self) -> bool {
        self.min.x == self.max.x || self.min.y == self.max.y || self.min.z == self.max.z
    }
}
