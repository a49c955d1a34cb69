use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use geom::{Distance, Line, Pt2D, Ring};
use tagged_map::WayID;

use crate::{EdgeID, GraphNodeID, MapError, PlanarMap, ShapeID};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    Building { floors: u32, code: u32 },
    /// A road mapped as a polygon
    AreaRoad,
    /// The polygon around one span of a road centerline
    RoadSegment,
    /// The space between the ends of the road segments meeting at a node
    Junction,
}

impl ShapeKind {
    /// Everything except buildings can be walked through.
    pub fn is_road(self) -> bool {
        !matches!(self, ShapeKind::Building { .. })
    }

    pub fn is_building(self) -> bool {
        !self.is_road()
    }
}

/// One edge of a shape's boundary, in the order the shape traverses it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct DirectedEdge {
    pub edge: EdgeID,
    /// True if the shape goes from the edge's `src` to its `dst`.
    pub forward: bool,
    /// The shape on the other side, if the edge is passable.
    pub neighbour: Option<ShapeID>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Shape {
    pub id: ShapeID,
    pub kind: ShapeKind,
    /// The closed way this was built from, or the road way for road segments.
    pub source: Option<WayID>,
    /// A closed cycle. The end of each edge is the start of the next one.
    pub edges: Vec<DirectedEdge>,
}

impl PlanarMap {
    /// Where a directed edge starts and ends.
    pub fn directed_endpoints(&self, de: &DirectedEdge) -> (GraphNodeID, GraphNodeID) {
        let edge = &self.edges[&de.edge];
        if de.forward {
            (edge.src, edge.dst)
        } else {
            (edge.dst, edge.src)
        }
    }

    /// The boundary vertices of a shape in order, without repeating the first.
    pub fn shape_nodes(&self, id: ShapeID) -> Vec<GraphNodeID> {
        self.shapes[&id]
            .edges
            .iter()
            .map(|de| self.directed_endpoints(de).0)
            .collect()
    }

    pub fn shape_ring(&self, id: ShapeID) -> Option<Ring> {
        Ring::new(
            self.shape_nodes(id)
                .into_iter()
                .map(|n| self.nodes[&n].pt)
                .collect(),
        )
        .ok()
    }

    /// The segment covered by a directed edge.
    pub(crate) fn directed_line(&self, de: &DirectedEdge) -> Option<Line> {
        let (a, b) = self.directed_endpoints(de);
        Line::maybe_new(self.nodes[&a].pt, self.nodes[&b].pt)
    }

    /// The edge of a shape passing through `pt`.
    pub(crate) fn edge_containing(&self, shape: ShapeID, pt: Pt2D) -> Option<EdgeID> {
        self.shapes[&shape]
            .edges
            .iter()
            .find(|de| {
                self.directed_line(de)
                    .map(|l| l.contains_pt(pt))
                    .unwrap_or(false)
            })
            .map(|de| de.edge)
    }

    /// Where a ray leaves the shape. The ray starts at `line.pt1()` and is treated as infinite
    /// in both directions; crossings are ordered by how far along `line` they are, with 1.0 at
    /// `line.pt2()`. Walking the crossings in order, we're alternately entering and leaving the
    /// shape; the answer is the last exit before the first entry past the end of `line`.
    ///
    /// Each edge is half-open, so a ray through a vertex only counts once. If the ray just
    /// touches the boundary, the crossing count is odd and there's no sensible answer.
    pub(crate) fn ray_exit(&self, shape: ShapeID, line: &Line) -> Option<(Pt2D, EdgeID)> {
        let ray = line.infinite();
        let mut crossings: Vec<(f64, EdgeID)> = Vec::new();
        for de in &self.shapes[&shape].edges {
            let boundary = match self.directed_line(de) {
                Some(l) => l,
                None => continue,
            };
            if let Some((t_ray, t_edge)) = ray.intersection_params(&boundary.infinite()) {
                if (0.0..1.0).contains(&t_edge) {
                    crossings.push((t_ray, de.edge));
                }
            }
        }
        if crossings.len() % 2 == 1 {
            return None;
        }
        crossings.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let mut inside = false;
        let mut exit = None;
        for (t, edge) in crossings {
            inside = !inside;
            if inside {
                if t >= 1.0 {
                    break;
                }
            } else {
                exit = Some((t, edge));
            }
        }
        let (t, edge) = exit?;
        Some((ray.point_at(t)?, edge))
    }

    /// The vertices walked along the boundary from one vertex to another, taking the shorter
    /// way around. Both ends are included.
    pub(crate) fn shortest_boundary_path(
        &self,
        shape: ShapeID,
        from: GraphNodeID,
        to: GraphNodeID,
    ) -> Result<Vec<GraphNodeID>, MapError> {
        let cycle = self.shape_nodes(shape);
        let find = |n: GraphNodeID| {
            cycle.iter().position(|x| *x == n).ok_or_else(|| {
                MapError::InconsistentTopology(format!("{} isn't on the boundary of {}", n, shape))
            })
        };
        let start = find(from)?;
        let end = find(to)?;
        if start == end {
            return Ok(vec![from]);
        }

        let len = cycle.len();
        let walk = |step: usize| -> (Vec<GraphNodeID>, Distance) {
            let mut path = vec![cycle[start]];
            let mut dist = Distance::ZERO;
            let mut idx = start;
            while idx != end {
                let next = (idx + step) % len;
                dist += self.nodes[&cycle[idx]]
                    .pt
                    .dist_to(self.nodes[&cycle[next]].pt);
                path.push(cycle[next]);
                idx = next;
            }
            (path, dist)
        };
        let (forwards, dist1) = walk(1);
        let (backwards, dist2) = walk(len - 1);
        if dist1 <= dist2 {
            Ok(forwards)
        } else {
            Ok(backwards)
        }
    }
}
