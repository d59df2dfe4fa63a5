//! Shared f64 math types for the Strata generation stack.

mod aabb;

pub use aabb::Aabb;
