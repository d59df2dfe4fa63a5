//! Spatial approximate-nearest-neighbor index built by k-means clustering.
//!
//! Points register with a typed payload during a build-up phase; a single
//! build runs Lloyd's iteration (with degenerate-cluster recovery) over the
//! registered coordinates; afterwards [`ClusterIndex::nearest_payload`]
//! answers read-only queries in two stages: nearest cluster by centroid,
//! then nearest member within that cluster.
//!
//! The query is approximate by design: a point belonging to a neighboring
//! cluster may be geometrically closer than any member of the selected
//! cluster. That inexactness is traded for sub-linear average-case query
//! cost and is part of this crate's contract, not a defect.

mod cluster;
mod index;
mod point;

pub use cluster::Cluster;
pub use index::{BuildStats, ClusterIndex, ClusterParams};
pub use point::DataPoint;
