//! Planar geometry in a local metric coordinate system. Everything here works in meters, with x
//! pointing east and y pointing north.

#[macro_use]
extern crate anyhow;

mod angle;
mod bounds;
mod distance;
mod line;
mod pt;
mod ring;
mod spatial;
mod vector;

pub use crate::angle::Angle;
pub use crate::bounds::Bounds;
pub use crate::distance::Distance;
pub use crate::line::{InfiniteLine, Line};
pub use crate::pt::{HashablePt2D, Pt2D};
pub use crate::ring::Ring;
pub use crate::spatial::SpatialIndex;
pub use crate::vector::Vec2D;

/// Two points closer than this (in each axis) are considered the same, and a point this close to
/// a segment lies on it.
pub const EPSILON_DIST: f64 = 1e-6;

/// Reduce the precision of an f64. This helps ensure serialization is idempotent (everything is
/// exactly the same before and after saving/loading). Ideally we'd use some kind of proper
/// fixed-precision type instead of f64.
pub fn trim_f64(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
