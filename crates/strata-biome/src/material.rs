//! Material references and the external name-resolution interface.

/// Numeric id of a terrain material, assigned by the material registry
/// (an external collaborator of this crate).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u16);

impl MaterialId {
    /// Air. The safe substitute when a symbolic name cannot be resolved.
    pub const AIR: Self = Self(0);
}

/// A biome's reference to a material: symbolic until the catalog freezes,
/// numeric afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MaterialRef {
    /// Symbolic name (e.g. "default:dirt_with_grass"), resolved at freeze.
    Named(String),
    /// Resolved numeric id.
    Id(MaterialId),
}

impl MaterialRef {
    /// The resolved id, or `None` while still symbolic.
    pub fn id(&self) -> Option<MaterialId> {
        match self {
            MaterialRef::Named(_) => None,
            MaterialRef::Id(id) => Some(*id),
        }
    }
}

/// Symbolic-name-to-id resolution, provided by the material registry.
///
/// Invoked only while the catalog freezes. Resolution failure is non-fatal:
/// the catalog substitutes [`MaterialId::AIR`] and a zero-depth extent.
pub trait MaterialResolver {
    /// Resolve a symbolic material name to its numeric id.
    fn resolve(&self, name: &str) -> Option<MaterialId>;
}
