use std::fmt;
use std::ops;

use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

use crate::{Distance, Vec2D, EPSILON_DIST};

/// A point in world-space, in meters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pt2D {
    x: f64,
    y: f64,
}

impl Pt2D {
    pub fn new(x: f64, y: f64) -> Pt2D {
        if !x.is_finite() || !y.is_finite() {
            panic!("Bad Pt2D {}, {}", x, y);
        }

        Pt2D { x, y }
    }

    /// Like `new`, but returns None for NaN or infinite coordinates instead of panicking. Use this
    /// on the results of numerical computations that might be degenerate.
    pub fn maybe_new(x: f64, y: f64) -> Option<Pt2D> {
        if x.is_finite() && y.is_finite() {
            Some(Pt2D { x, y })
        } else {
            None
        }
    }

    pub fn x(self) -> f64 {
        self.x
    }

    pub fn y(self) -> f64 {
        self.y
    }

    pub fn dist_to(self, to: Pt2D) -> Distance {
        Distance::meters((to - self).length())
    }

    /// True if both coordinates differ by at most `EPSILON_DIST`.
    pub fn approx_eq(self, other: Pt2D) -> bool {
        (self.x - other.x).abs() <= EPSILON_DIST && (self.y - other.y).abs() <= EPSILON_DIST
    }

    pub fn offset(self, dx: f64, dy: f64) -> Pt2D {
        Pt2D::new(self.x + dx, self.y + dy)
    }

    pub fn to_vec(self) -> Vec2D {
        Vec2D::new(self.x, self.y)
    }

    pub fn center(pts: &[Pt2D]) -> Pt2D {
        let mut x = 0.0;
        let mut y = 0.0;
        for pt in pts {
            x += pt.x;
            y += pt.y;
        }
        let len = pts.len() as f64;
        Pt2D::new(x / len, y / len)
    }

    pub fn to_hashable(self) -> HashablePt2D {
        HashablePt2D::from(self)
    }

    pub fn to_geo(self) -> geo::Point<f64> {
        geo::Point::new(self.x, self.y)
    }
}

impl fmt::Display for Pt2D {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Pt2D({0}, {1})", self.x, self.y)
    }
}

impl ops::Sub for Pt2D {
    type Output = Vec2D;

    fn sub(self, other: Pt2D) -> Vec2D {
        Vec2D::new(self.x - other.x, self.y - other.y)
    }
}

impl ops::Add<Vec2D> for Pt2D {
    type Output = Pt2D;

    fn add(self, v: Vec2D) -> Pt2D {
        Pt2D::new(self.x + v.x(), self.y + v.y())
    }
}

impl ops::Sub<Vec2D> for Pt2D {
    type Output = Pt2D;

    fn sub(self, v: Vec2D) -> Pt2D {
        Pt2D::new(self.x - v.x(), self.y - v.y())
    }
}

// This isn't opinionated about what the (x, y) represents.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct HashablePt2D {
    x_nan: NotNan<f64>,
    y_nan: NotNan<f64>,
}

impl From<Pt2D> for HashablePt2D {
    fn from(pt: Pt2D) -> Self {
        // Pt2D is always finite
        HashablePt2D {
            x_nan: NotNan::new(pt.x).unwrap(),
            y_nan: NotNan::new(pt.y).unwrap(),
        }
    }
}
