//! Biome catalog: registration, freeze protocol, and classification queries.

use glam::DVec3;
use hashbrown::HashMap;
use strata_cluster::{BuildStats, ClusterIndex};
use thiserror::Error;

use crate::climate::ClimateMap;
use crate::def::{BiomeDef, BiomeId};
use crate::material::{MaterialId, MaterialRef, MaterialResolver};

/// Most non-default biomes a catalog accepts; with the default entry every
/// id fits in 8 bits.
pub const MAX_BIOMES: usize = 255;

/// Errors that can occur when registering biomes.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Registration arrived after the catalog froze.
    #[error("biome registration is closed, dropped '{0}'")]
    RegistrationClosed(String),
    /// All non-default slots are taken.
    #[error("biome catalog is full ({MAX_BIOMES} biomes), dropped '{0}'")]
    CatalogFull(String),
    /// A biome with this name is already registered.
    #[error("duplicate biome name: {0}")]
    DuplicateName(String),
}

/// Append-only biome catalog with a freeze-then-query lifecycle.
///
/// Construction creates the reserved default biome (id 0, air materials,
/// zero feature point); it answers queries against an empty catalog and is
/// excluded from every nearest-distance comparison. Registered biomes get
/// dense sequential ids and their feature points feed the cluster index.
/// [`freeze`](Self::freeze) transitions the catalog from OPEN to FROZEN
/// exactly once; afterwards both classification paths are `&self` reads and
/// safe to call from parallel generation workers.
pub struct BiomeCatalog {
    biomes: Vec<BiomeDef>,
    name_to_id: HashMap<String, BiomeId>,
    index: ClusterIndex<BiomeId>,
    seed: u64,
    frozen: bool,
}

impl BiomeCatalog {
    /// Create an open catalog holding only the default biome.
    ///
    /// `seed` drives centroid seeding during the freeze-time clusterization,
    /// making the built index reproducible.
    pub fn new(seed: u64) -> Self {
        let default = BiomeDef {
            name: "default".to_string(),
            heat_point: 0.0,
            humidity_point: 0.0,
            elevation_point: 0.0,
            surface: MaterialRef::Id(MaterialId::AIR),
            surface_depth: 0,
            filler: MaterialRef::Id(MaterialId::AIR),
            filler_depth: i16::MAX,
        };
        let mut name_to_id = HashMap::new();
        name_to_id.insert(default.name.clone(), BiomeId::DEFAULT);

        Self {
            biomes: vec![default],
            name_to_id,
            index: ClusterIndex::new(),
            seed,
            frozen: false,
        }
    }

    /// Register a biome, returning its assigned id.
    ///
    /// The feature point is forwarded to the cluster index so the biome
    /// participates in indexed classification after freeze.
    ///
    /// # Errors
    ///
    /// [`CatalogError::RegistrationClosed`] after [`freeze`](Self::freeze),
    /// [`CatalogError::CatalogFull`] past [`MAX_BIOMES`] non-default
    /// entries, [`CatalogError::DuplicateName`] when the name is taken.
    /// All three leave the catalog unchanged; none is fatal.
    pub fn register(&mut self, def: BiomeDef) -> Result<BiomeId, CatalogError> {
        if self.frozen {
            tracing::warn!("biome registration already frozen, dropping '{}'", def.name);
            return Err(CatalogError::RegistrationClosed(def.name));
        }
        if self.biomes.len() > MAX_BIOMES {
            tracing::warn!("too many biomes, dropping '{}'", def.name);
            return Err(CatalogError::CatalogFull(def.name));
        }
        if self.name_to_id.contains_key(&def.name) {
            tracing::warn!("duplicate biome name '{}', dropping", def.name);
            return Err(CatalogError::DuplicateName(def.name));
        }

        let id = BiomeId(self.biomes.len() as u8);
        self.name_to_id.insert(def.name.clone(), id);
        self.index.add_point(def.feature_point(), id);
        tracing::debug!("registered biome '{}' as id {}", def.name, id.0);
        self.biomes.push(def);
        Ok(id)
    }

    /// Freeze the catalog: close registration, resolve symbolic material
    /// names, and clusterize the registered feature points.
    ///
    /// A name the resolver cannot find is replaced by air with a zero-depth
    /// extent and a warning log; the freeze itself never fails. The cluster
    /// count is derived from the catalog size `n` as
    /// `ceil(n / 3) + floor(n / 30)`.
    ///
    /// Calling freeze again is a no-op with a warning log.
    pub fn freeze(&mut self, resolver: &dyn MaterialResolver) {
        if self.frozen {
            tracing::warn!("biome catalog already frozen, ignoring repeated freeze");
            return;
        }
        self.frozen = true;

        for biome in &mut self.biomes {
            resolve_layer(&mut biome.surface, &mut biome.surface_depth, &biome.name, resolver);
            resolve_layer(&mut biome.filler, &mut biome.filler_depth, &biome.name, resolver);
        }

        let n = self.biomes.len();
        // Integer arithmetic: (n + 2) / 3 rounds n / 3 up.
        let k = (n + 2) / 3 + n / 30;
        self.index.build(k, self.seed);
    }

    /// Classify by brute-force scan over every non-default biome.
    ///
    /// Exact: always returns the globally nearest feature point by squared
    /// Euclidean distance, first-registered winning exact ties. Linear in
    /// the catalog size; kept as the reference oracle for the indexed path.
    /// Returns the default id when the catalog holds no non-default biomes.
    pub fn classify_exact(&self, heat: f64, humidity: f64, elevation: f64) -> BiomeId {
        let query = DVec3::new(heat, humidity, elevation);
        let mut nearest: Option<(BiomeId, f64)> = None;
        for (idx, biome) in self.biomes.iter().enumerate().skip(1) {
            let dist = biome.feature_point().distance_squared(query);
            if nearest.is_none_or(|(_, best)| dist < best) {
                nearest = Some((BiomeId(idx as u8), dist));
            }
        }
        nearest.map_or(BiomeId::DEFAULT, |(id, _)| id)
    }

    /// Classify through the cluster index.
    ///
    /// Approximately nearest: cheaper than the exact scan for large
    /// catalogs, but may return a neighbor of the true nearest biome.
    /// Returns the default id when the index answers no queries (catalog
    /// never frozen, or frozen while empty).
    pub fn classify_indexed(&self, heat: f64, humidity: f64, elevation: f64) -> BiomeId {
        self.index
            .nearest_payload(DVec3::new(heat, humidity, elevation))
            .unwrap_or(BiomeId::DEFAULT)
    }

    /// Classify every column of a climate map through the indexed path.
    ///
    /// Raw heat and humidity noise is normalized from `[-1, 1]` to
    /// `[0, 100]`; elevation is used as-is. The output is row-major and has
    /// one id per column.
    pub fn classify_map(&self, climate: &ClimateMap) -> Vec<BiomeId> {
        let mut ids = Vec::with_capacity(climate.len());
        for i in 0..climate.len() {
            let heat = (climate.heat[i] + 1.0) * 50.0;
            let humidity = (climate.humidity[i] + 1.0) * 50.0;
            ids.push(self.classify_indexed(heat, humidity, f64::from(climate.elevation[i])));
        }
        ids
    }

    /// Returns the definition for the given biome id.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range; ids are only produced by the catalog
    /// itself, so this indicates a programming error.
    pub fn get(&self, id: BiomeId) -> &BiomeDef {
        &self.biomes[id.0 as usize]
    }

    /// Looks up a biome id by name.
    pub fn lookup_by_name(&self, name: &str) -> Option<BiomeId> {
        self.name_to_id.get(name).copied()
    }

    /// Total number of biomes, the default included.
    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    /// Returns true if only the default biome exists.
    pub fn is_empty(&self) -> bool {
        self.biomes.len() <= 1
    }

    /// Returns true once the catalog froze.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Counters from the freeze-time clusterization, `None` before freeze
    /// or when the catalog froze empty.
    pub fn build_stats(&self) -> Option<BuildStats> {
        self.index.build_stats()
    }
}

/// Resolve one material layer in place. Failure substitutes air and zeroes
/// the layer's depth extent.
fn resolve_layer(
    layer: &mut MaterialRef,
    depth: &mut i16,
    biome: &str,
    resolver: &dyn MaterialResolver,
) {
    if let MaterialRef::Named(name) = layer {
        match resolver.resolve(name) {
            Some(id) => *layer = MaterialRef::Id(id),
            None => {
                tracing::warn!("material '{name}' not defined for biome '{biome}', using air");
                *layer = MaterialRef::Id(MaterialId::AIR);
                *depth = 0;
            }
        }
    }
}
