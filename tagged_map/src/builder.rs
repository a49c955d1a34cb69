use geom::Pt2D;
use maputil::Tags;

use crate::{NodeID, TaggedMap, WayID};

/// Builds small maps by hand, for tests and demos. Ways are given as lists of (x, y) points;
/// a point already used by an earlier way is shared instead of duplicated.
///
/// Panics if an edit fails, which only happens for ways with fewer than 2 points.
pub struct MapBuilder {
    pub map: TaggedMap,
    pts: Vec<(Pt2D, NodeID)>,
}

impl MapBuilder {
    pub fn new() -> MapBuilder {
        MapBuilder {
            map: TaggedMap::blank(),
            pts: Vec::new(),
        }
    }

    /// The node at this point, creating it if needed.
    pub fn node(&mut self, x: f64, y: f64) -> NodeID {
        self.tagged_node(x, y, Tags::empty())
    }

    /// Like `node`, but tags are only applied if the node is new.
    pub fn tagged_node(&mut self, x: f64, y: f64, tags: Tags) -> NodeID {
        let pt = Pt2D::new(x, y);
        if let Some((_, id)) = self.pts.iter().find(|(p, _)| p.approx_eq(pt)) {
            return *id;
        }
        let mut edit = self.map.edit();
        let id = edit.add_node(pt, tags);
        edit.commit().expect("adding a node can't fail");
        self.pts.push((pt, id));
        id
    }

    pub fn way(&mut self, pts: &[(f64, f64)], tags: Vec<(&str, &str)>) -> WayID {
        let nodes: Vec<NodeID> = pts.iter().map(|(x, y)| self.node(*x, *y)).collect();
        let mut edit = self.map.edit();
        let id = edit.add_way(nodes, tags.into_iter().collect());
        if let Err(err) = edit.commit() {
            panic!("Can't add way through {:?}: {}", pts, err);
        }
        id
    }

    pub fn road(&mut self, pts: &[(f64, f64)], width_mm: &str) -> WayID {
        self.way(pts, vec![("rcr:type", "road"), ("rcr:width", width_mm)])
    }

    /// A closed building through the points. The first point shouldn't be repeated.
    pub fn building_pts(&mut self, pts: &[(f64, f64)]) -> WayID {
        let mut ring = pts.to_vec();
        ring.push(pts[0]);
        self.way(&ring, vec![("rcr:type", "building")])
    }

    /// An axis-aligned rectangle, counter-clockwise from the bottom-left corner.
    pub fn building(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> WayID {
        self.building_pts(&[(x1, y1), (x2, y1), (x2, y2), (x1, y2)])
    }
}

impl Default for MapBuilder {
    fn default() -> Self {
        Self::new()
    }
}
