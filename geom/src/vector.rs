use std::fmt;
use std::ops;

use serde::{Deserialize, Serialize};

use crate::{Angle, EPSILON_DIST};

/// A displacement or direction in world-space. Unlike `Pt2D`, this has no position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vec2D {
    x: f64,
    y: f64,
}

impl Vec2D {
    pub const ZERO: Vec2D = Vec2D { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Vec2D {
        Vec2D { x, y }
    }

    pub fn x(self) -> f64 {
        self.x
    }

    pub fn y(self) -> f64 {
        self.y
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn dot(self, other: Vec2D) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// The z component of the 3D cross product. Positive when `other` is counter-clockwise of
    /// `self`.
    pub fn cross(self, other: Vec2D) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Scales to unit length. Returns None for (nearly) zero vectors, where there's no direction.
    pub fn normalize(self) -> Option<Vec2D> {
        let len = self.length();
        if len <= EPSILON_DIST || !len.is_finite() {
            return None;
        }
        Some(Vec2D::new(self.x / len, self.y / len))
    }

    /// The unit vector pointing 90 degrees counter-clockwise, so to the left of travel.
    pub fn left_normal(self) -> Option<Vec2D> {
        Vec2D::new(-self.y, self.x).normalize()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Compass bearing, measured clockwise from north.
    pub fn bearing(self) -> Angle {
        Angle::new_rads(self.x.atan2(self.y))
    }
}

impl fmt::Display for Vec2D {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Vec2D({0}, {1})", self.x, self.y)
    }
}

impl ops::Add for Vec2D {
    type Output = Vec2D;

    fn add(self, other: Vec2D) -> Vec2D {
        Vec2D::new(self.x + other.x, self.y + other.y)
    }
}

impl ops::AddAssign for Vec2D {
    fn add_assign(&mut self, other: Vec2D) {
        *self = *self + other;
    }
}

impl ops::Sub for Vec2D {
    type Output = Vec2D;

    fn sub(self, other: Vec2D) -> Vec2D {
        Vec2D::new(self.x - other.x, self.y - other.y)
    }
}

impl ops::Neg for Vec2D {
    type Output = Vec2D;

    fn neg(self) -> Vec2D {
        Vec2D::new(-self.x, -self.y)
    }
}

impl ops::Mul<f64> for Vec2D {
    type Output = Vec2D;

    fn mul(self, scalar: f64) -> Vec2D {
        Vec2D::new(self.x * scalar, self.y * scalar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normals() {
        let east = Vec2D::new(2.0, 0.0);
        assert_eq!(east.left_normal(), Some(Vec2D::new(0.0, 1.0)));
        assert_eq!(Vec2D::ZERO.normalize(), None);
        assert_eq!(east.cross(Vec2D::new(0.0, 1.0)), 2.0);
    }

    #[test]
    fn bearings_go_clockwise_from_north() {
        let north = Vec2D::new(0.0, 1.0).bearing().normalized_degrees();
        let east = Vec2D::new(1.0, 0.0).bearing().normalized_degrees();
        let west = Vec2D::new(-1.0, 0.0).bearing().normalized_degrees();
        assert!(north.abs() < 1e-9);
        assert!((east - 90.0).abs() < 1e-9);
        assert!((west - 270.0).abs() < 1e-9);
    }
}
