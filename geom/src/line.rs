use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{Bounds, Distance, Pt2D, Vec2D, EPSILON_DIST};

/// A line segment.
#[derive(PartialEq, Serialize, Deserialize, Clone, Copy, Debug)]
pub struct Line(Pt2D, Pt2D);

impl Line {
    /// Creates a line segment between two points, which must not be the same point.
    pub fn new(pt1: Pt2D, pt2: Pt2D) -> Result<Line> {
        if pt1.approx_eq(pt2) {
            bail!("Line from {} to {} too small", pt1, pt2);
        }
        Ok(Line(pt1, pt2))
    }

    /// Equivalent to `Line::new(pt1, pt2).ok()`.
    pub fn maybe_new(pt1: Pt2D, pt2: Pt2D) -> Option<Line> {
        Line::new(pt1, pt2).ok()
    }

    /// Creates a line segment between two points, which must not be the same point. Panics
    /// otherwise.
    pub fn must_new(pt1: Pt2D, pt2: Pt2D) -> Line {
        Line::new(pt1, pt2).unwrap()
    }

    pub fn pt1(&self) -> Pt2D {
        self.0
    }

    pub fn pt2(&self) -> Pt2D {
        self.1
    }

    pub fn points(&self) -> Vec<Pt2D> {
        vec![self.0, self.1]
    }

    pub fn length(&self) -> Distance {
        self.pt1().dist_to(self.pt2())
    }

    /// The vector from `pt1` to `pt2`.
    pub fn vector(&self) -> Vec2D {
        self.1 - self.0
    }

    /// The unit vector from `pt1` to `pt2`.
    pub fn direction(&self) -> Vec2D {
        // Lines are never degenerate
        self.vector().normalize().unwrap_or(Vec2D::ZERO)
    }

    /// The unit normal pointing to the left of travel from `pt1` to `pt2`.
    pub fn left_normal(&self) -> Vec2D {
        self.vector().left_normal().unwrap_or(Vec2D::ZERO)
    }

    pub fn middle(&self) -> Pt2D {
        self.percent_along(0.5)
    }

    pub fn reversed(&self) -> Line {
        Line(self.pt2(), self.pt1())
    }

    /// Interpolates along the line, without any bounds checking.
    pub fn percent_along(&self, percent: f64) -> Pt2D {
        self.0 + self.vector() * percent
    }

    /// Returns the parameter of the orthogonal projection of `pt` onto this line, where 0 is
    /// `pt1` and 1 is `pt2`. The result isn't clamped.
    pub fn project_param(&self, pt: Pt2D) -> f64 {
        let v = self.vector();
        (pt - self.0).dot(v) / v.dot(v)
    }

    /// The orthogonal projection of `pt`, only if it lands within the segment.
    pub fn project_pt(&self, pt: Pt2D) -> Option<Pt2D> {
        let t = self.project_param(pt);
        if !t.is_finite() || !(0.0..=1.0).contains(&t) {
            return None;
        }
        Pt2D::maybe_new(self.0.x() + t * self.vector().x(), self.0.y() + t * self.vector().y())
    }

    /// The closest point on the segment to `pt`.
    pub fn closest_pt(&self, pt: Pt2D) -> Pt2D {
        let t = self.project_param(pt);
        if !t.is_finite() {
            return self.0;
        }
        self.percent_along(t.clamp(0.0, 1.0))
    }

    /// True if `pt` lies on this segment, with a tolerance of `EPSILON_DIST` in each axis.
    pub fn contains_pt(&self, pt: Pt2D) -> bool {
        self.closest_pt(pt).approx_eq(pt)
    }

    /// If the two segments touch or cross, returns the point where they meet. Collinear
    /// overlapping segments return None.
    pub fn intersection(&self, other: &Line) -> Option<Pt2D> {
        let (t1, t2) = self.infinite().intersection_params(&other.infinite())?;
        let tol1 = EPSILON_DIST / self.length().inner_meters().max(EPSILON_DIST);
        let tol2 = EPSILON_DIST / other.length().inner_meters().max(EPSILON_DIST);
        if t1 < -tol1 || t1 > 1.0 + tol1 || t2 < -tol2 || t2 > 1.0 + tol2 {
            return None;
        }
        Pt2D::maybe_new(
            self.0.x() + t1 * self.vector().x(),
            self.0.y() + t1 * self.vector().y(),
        )
    }

    /// True if the segments share any point, including collinear segments that overlap.
    pub fn intersects(&self, other: &Line) -> bool {
        if self.intersection(other).is_some() {
            return true;
        }
        // Only collinear overlaps are left
        let len = self.length().inner_meters();
        if (other.0 - self.0).cross(self.vector()).abs() / len > EPSILON_DIST
            || (other.1 - self.0).cross(self.vector()).abs() / len > EPSILON_DIST
        {
            return false;
        }
        let t1 = self.project_param(other.0);
        let t2 = self.project_param(other.1);
        let tol = EPSILON_DIST / len;
        t1.min(t2) <= 1.0 + tol && t1.max(t2) >= -tol
    }

    /// Shifts the line perpendicularly. Positive distances go to the left of travel, negative to
    /// the right.
    pub fn shift_left(&self, width: Distance) -> Line {
        let offset = self.left_normal() * width.inner_meters();
        Line(self.0 + offset, self.1 + offset)
    }

    /// Trims `dist` from both ends. Returns None if nothing would be left.
    pub fn shortened(&self, dist: Distance) -> Option<Line> {
        let len = self.length();
        if dist * 2.0 >= len {
            return None;
        }
        let percent = dist / len;
        Line::maybe_new(
            self.percent_along(percent),
            self.percent_along(1.0 - percent),
        )
    }

    pub fn infinite(&self) -> InfiniteLine {
        InfiniteLine::new(self.0, self.vector())
    }

    pub fn get_bounds(&self) -> Bounds {
        Bounds::from(&self.points())
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Line::new(")?;
        writeln!(f, "  Pt2D::new({}, {}),", self.0.x(), self.0.y())?;
        writeln!(f, "  Pt2D::new({}, {}),", self.1.x(), self.1.y())?;
        write!(f, ")")
    }
}

/// A line extending forever in both directions, parametrized as `origin + t * direction`. The
/// direction doesn't need to be normalized, so with t = 1 the line reaches `origin + direction`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InfiniteLine {
    origin: Pt2D,
    direction: Vec2D,
}

impl InfiniteLine {
    pub fn new(origin: Pt2D, direction: Vec2D) -> InfiniteLine {
        InfiniteLine { origin, direction }
    }

    pub fn origin(&self) -> Pt2D {
        self.origin
    }

    pub fn direction(&self) -> Vec2D {
        self.direction
    }

    pub fn point_at(&self, t: f64) -> Option<Pt2D> {
        Pt2D::maybe_new(
            self.origin.x() + t * self.direction.x(),
            self.origin.y() + t * self.direction.y(),
        )
    }

    /// The cosine of the angle between the two directions. None if either direction is zero.
    pub fn cos_angle(&self, other: &InfiniteLine) -> Option<f64> {
        let a = self.direction.normalize()?;
        let b = other.direction.normalize()?;
        Some(a.dot(b))
    }

    /// Solves `self.point_at(t1) == other.point_at(t2)`. Returns None for parallel lines.
    pub fn intersection_params(&self, other: &InfiniteLine) -> Option<(f64, f64)> {
        let denom = self.direction.cross(other.direction);
        let scale = self.direction.length() * other.direction.length();
        if scale == 0.0 || (denom / scale).abs() < 1e-12 {
            return None;
        }
        let delta = other.origin - self.origin;
        let t1 = delta.cross(other.direction) / denom;
        let t2 = delta.cross(self.direction) / denom;
        if t1.is_finite() && t2.is_finite() {
            Some((t1, t2))
        } else {
            None
        }
    }

    pub fn intersection(&self, other: &InfiniteLine) -> Option<Pt2D> {
        let (t1, _) = self.intersection_params(other)?;
        self.point_at(t1)
    }

    /// Translates the line by `dist` along its left normal.
    pub fn shift_left(&self, dist: Distance) -> Option<InfiniteLine> {
        let normal = self.direction.left_normal()?;
        Some(InfiniteLine::new(
            self.origin + normal * dist.inner_meters(),
            self.direction,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64) -> Pt2D {
        Pt2D::new(x, y)
    }

    #[test]
    fn segment_intersection() {
        let l1 = Line::must_new(pt(0.0, 0.0), pt(10.0, 0.0));
        let l2 = Line::must_new(pt(5.0, -5.0), pt(5.0, 5.0));
        assert_eq!(l1.intersection(&l2), Some(pt(5.0, 0.0)));

        let l3 = Line::must_new(pt(5.0, 1.0), pt(5.0, 5.0));
        assert_eq!(l1.intersection(&l3), None);

        // Touching at an endpoint counts
        let l4 = Line::must_new(pt(10.0, 0.0), pt(10.0, 5.0));
        assert!(l1.intersection(&l4).unwrap().approx_eq(pt(10.0, 0.0)));

        // Parallel lines never meet
        let l5 = Line::must_new(pt(0.0, 1.0), pt(10.0, 1.0));
        assert_eq!(l1.intersection(&l5), None);
        assert!(!l1.intersects(&l5));

        // Collinear overlap has no single point, but still counts as touching
        let l6 = Line::must_new(pt(8.0, 0.0), pt(12.0, 0.0));
        assert_eq!(l1.intersection(&l6), None);
        assert!(l1.intersects(&l6));
        let l7 = Line::must_new(pt(11.0, 0.0), pt(12.0, 0.0));
        assert!(!l1.intersects(&l7));
    }

    #[test]
    fn projection() {
        let l = Line::must_new(pt(0.0, 0.0), pt(10.0, 0.0));
        assert_eq!(l.project_pt(pt(3.0, 4.0)), Some(pt(3.0, 0.0)));
        assert_eq!(l.project_pt(pt(-1.0, 4.0)), None);
        assert!(l.contains_pt(pt(7.0, 0.0)));
        assert!(!l.contains_pt(pt(7.0, 0.001)));
        assert!(!l.contains_pt(pt(10.5, 0.0)));
    }

    #[test]
    fn shifting() {
        let l = Line::must_new(pt(0.0, 0.0), pt(10.0, 0.0));
        let left = l.shift_left(Distance::meters(2.0));
        assert_eq!(left.pt1(), pt(0.0, 2.0));
        let right = l.shift_left(Distance::meters(-2.0));
        assert_eq!(right.pt2(), pt(10.0, -2.0));

        let short = l.shortened(Distance::meters(1.0)).unwrap();
        assert_eq!(short.length(), Distance::meters(8.0));
        assert!(l.shortened(Distance::meters(5.0)).is_none());
    }

    #[test]
    fn infinite_params() {
        let a = InfiniteLine::new(pt(0.0, 0.0), Vec2D::new(2.0, 0.0));
        let b = InfiniteLine::new(pt(3.0, -1.0), Vec2D::new(0.0, 4.0));
        let (t1, t2) = a.intersection_params(&b).unwrap();
        assert!((t1 - 1.5).abs() < 1e-9);
        assert!((t2 - 0.25).abs() < 1e-9);

        let parallel = InfiniteLine::new(pt(0.0, 5.0), Vec2D::new(-1.0, 0.0));
        assert!(a.intersection_params(&parallel).is_none());
    }
}
