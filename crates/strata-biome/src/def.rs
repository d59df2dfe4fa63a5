//! Biome definition: feature point and surface layer materials.

use glam::DVec3;

use crate::material::MaterialRef;

/// Compact identifier for a registered biome. Equals the biome's insertion
/// index in its catalog; id 0 is the reserved default biome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BiomeId(pub u8);

impl BiomeId {
    /// The reserved default biome, present in every catalog and used as the
    /// fallback classification answer.
    pub const DEFAULT: Self = Self(0);
}

/// Full descriptor for a biome.
#[derive(Clone, Debug)]
pub struct BiomeDef {
    /// Human-readable name (e.g. "tundra", "savanna").
    pub name: String,
    /// Position on the heat axis of the classification space.
    pub heat_point: f64,
    /// Position on the humidity axis.
    pub humidity_point: f64,
    /// Position on the elevation axis.
    pub elevation_point: f64,
    /// Material placed on the terrain surface.
    pub surface: MaterialRef,
    /// Depth of the surface layer, in voxels.
    pub surface_depth: i16,
    /// Material for the layers below the surface.
    pub filler: MaterialRef,
    /// Depth of the filler layer, in voxels.
    pub filler_depth: i16,
}

impl BiomeDef {
    /// The biome's position in (heat, humidity, elevation) space.
    pub fn feature_point(&self) -> DVec3 {
        DVec3::new(self.heat_point, self.humidity_point, self.elevation_point)
    }
}
