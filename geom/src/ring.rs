use std::fmt;

use anyhow::Result;
use geo::{Area, Contains};
use serde::{Deserialize, Serialize};

use crate::{Bounds, Line, Pt2D};

/// A closed loop of points. The last point isn't repeated; the ring implicitly closes from the
/// last point back to the first.
#[derive(PartialEq, Serialize, Deserialize, Clone, Debug)]
pub struct Ring {
    pts: Vec<Pt2D>,
}

impl Ring {
    /// Accepts points with or without the first point repeated at the end. Consecutive duplicate
    /// points are collapsed.
    pub fn new(mut pts: Vec<Pt2D>) -> Result<Ring> {
        pts.dedup_by(|a, b| a.approx_eq(*b));
        if pts.len() >= 2 && pts[0].approx_eq(pts[pts.len() - 1]) {
            pts.pop();
        }
        if pts.len() < 3 {
            bail!("Can't make a ring with < 3 distinct points");
        }
        Ok(Ring { pts })
    }

    pub fn points(&self) -> &Vec<Pt2D> {
        &self.pts
    }

    /// Every edge of the ring, including the one closing it.
    pub fn lines(&self) -> Vec<Line> {
        let mut lines = Vec::new();
        for idx in 0..self.pts.len() {
            let next = self.pts[(idx + 1) % self.pts.len()];
            if let Some(l) = Line::maybe_new(self.pts[idx], next) {
                lines.push(l);
            }
        }
        lines
    }

    /// Positive for counter-clockwise rings, negative for clockwise.
    pub fn signed_area(&self) -> f64 {
        self.to_geo().signed_area()
    }

    pub fn is_counter_clockwise(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// True if the point is strictly inside the ring. Points on the boundary don't count.
    pub fn contains_pt(&self, pt: Pt2D) -> bool {
        self.to_geo().contains(&pt.to_geo())
    }

    /// True if the point is on some edge of the ring.
    pub fn on_boundary(&self, pt: Pt2D) -> bool {
        self.lines().iter().any(|l| l.contains_pt(pt))
    }

    /// True if the segment lies entirely inside the ring: it doesn't cross any edge and its
    /// midpoint is inside. Segments sharing an endpoint with the ring are still considered.
    pub fn contains_line(&self, line: &Line) -> bool {
        for edge in self.lines() {
            if let Some(hit) = edge.intersection(line) {
                if !hit.approx_eq(line.pt1()) && !hit.approx_eq(line.pt2()) {
                    return false;
                }
            }
        }
        self.contains_pt(line.middle())
    }

    pub fn get_bounds(&self) -> Bounds {
        Bounds::from(&self.pts)
    }

    pub fn to_geo(&self) -> geo::Polygon<f64> {
        let mut coords: Vec<geo::Coordinate<f64>> = self
            .pts
            .iter()
            .map(|pt| geo::Coordinate { x: pt.x(), y: pt.y() })
            .collect();
        coords.push(coords[0]);
        geo::Polygon::new(geo::LineString::from(coords), Vec::new())
    }
}

impl fmt::Display for Ring {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Ring::new(vec![")?;
        for pt in &self.pts {
            writeln!(f, "  Pt2D::new({}, {}),", pt.x(), pt.y())?;
        }
        write!(f, "])")
    }
}
