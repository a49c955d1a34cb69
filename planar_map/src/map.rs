use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;

use geom::{Line, Pt2D};
use maputil::{prettyprint_usize, MultiMap};
use tagged_map::{NodeID, WayID};

use crate::{
    DirectedEdge, Edge, EdgeID, GraphNode, GraphNodeID, MapError, PlanarMap, Shape, ShapeID,
    ShapeKind,
};

impl PlanarMap {
    pub(crate) fn blank() -> PlanarMap {
        PlanarMap {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            shapes: BTreeMap::new(),
            main_group: BTreeSet::new(),
            next_node: 0,
            next_edge: 0,
            next_shape: 0,
            edge_shapes: MultiMap::new(),
        }
    }

    pub fn get_node(&self, id: GraphNodeID) -> &GraphNode {
        &self.nodes[&id]
    }

    pub fn get_edge(&self, id: EdgeID) -> &Edge {
        &self.edges[&id]
    }

    pub fn get_shape(&self, id: ShapeID) -> &Shape {
        &self.shapes[&id]
    }

    pub fn all_nodes(&self) -> &BTreeMap<GraphNodeID, GraphNode> {
        &self.nodes
    }

    pub fn all_edges(&self) -> &BTreeMap<EdgeID, Edge> {
        &self.edges
    }

    pub fn all_shapes(&self) -> &BTreeMap<ShapeID, Shape> {
        &self.shapes
    }

    /// The largest set of shapes mutually reachable through passable edges.
    pub fn main_group(&self) -> &BTreeSet<ShapeID> {
        &self.main_group
    }

    /// The shapes whose boundary uses this edge. After export, there are at most two.
    pub fn shapes_of_edge(&self, id: EdgeID) -> &BTreeSet<ShapeID> {
        self.edge_shapes.get(id)
    }

    pub fn edge_line(&self, id: EdgeID) -> Option<Line> {
        let edge = &self.edges[&id];
        Line::maybe_new(self.nodes[&edge.src].pt, self.nodes[&edge.dst].pt)
    }

    /// The edge between two nodes, in either direction.
    pub fn find_edge(&self, n1: GraphNodeID, n2: GraphNodeID) -> Option<EdgeID> {
        self.edges
            .values()
            .find(|e| (e.src == n1 && e.dst == n2) || (e.src == n2 && e.dst == n1))
            .map(|e| e.id)
    }

    /// The graph node created for a tagged node, if it made it into the output.
    pub fn node_for_source(&self, source: NodeID) -> Option<GraphNodeID> {
        self.nodes
            .values()
            .find(|n| n.source == Some(source))
            .map(|n| n.id)
    }

    /// Every shape built from this way.
    pub fn shapes_from_way(&self, way: WayID) -> Vec<ShapeID> {
        self.shapes
            .values()
            .filter(|s| s.source == Some(way))
            .map(|s| s.id)
            .collect()
    }

    pub fn summary(&self) -> String {
        let mut buildings = 0;
        let mut roads = 0;
        let mut junctions = 0;
        for shape in self.shapes.values() {
            match shape.kind {
                ShapeKind::Building { .. } => buildings += 1,
                ShapeKind::AreaRoad | ShapeKind::RoadSegment => roads += 1,
                ShapeKind::Junction => junctions += 1,
            }
        }
        let passable = self.edges.values().filter(|e| e.passable).count();
        format!(
            "{} nodes, {} edges ({} passable), {} buildings, {} road shapes, {} junctions, {} shapes in the main group",
            prettyprint_usize(self.nodes.len()),
            prettyprint_usize(self.edges.len()),
            prettyprint_usize(passable),
            prettyprint_usize(buildings),
            prettyprint_usize(roads),
            prettyprint_usize(junctions),
            prettyprint_usize(self.main_group.len())
        )
    }

    /// Checks the structural invariants of an exported map: every edge references existing
    /// nodes, no two edges connect the same pair of nodes, and every shape is a closed cycle
    /// of existing edges.
    pub fn validate(&self) -> Result<(), MapError> {
        let mut pairs = BTreeSet::new();
        for edge in self.edges.values() {
            for n in [edge.src, edge.dst] {
                if !self.nodes.contains_key(&n) {
                    return Err(MapError::InconsistentTopology(format!(
                        "{} references missing {}",
                        edge.id, n
                    )));
                }
            }
            if edge.src == edge.dst {
                return Err(MapError::InconsistentTopology(format!(
                    "{} starts and ends at {}",
                    edge.id, edge.src
                )));
            }
            if !pairs.insert((edge.src.min(edge.dst), edge.src.max(edge.dst))) {
                return Err(MapError::InconsistentTopology(format!(
                    "{} duplicates another edge between {} and {}",
                    edge.id, edge.src, edge.dst
                )));
            }
        }

        for shape in self.shapes.values() {
            if shape.edges.len() < 3 {
                return Err(MapError::InconsistentTopology(format!(
                    "{} only has {} edges",
                    shape.id,
                    shape.edges.len()
                )));
            }
            for de in &shape.edges {
                if !self.edges.contains_key(&de.edge) {
                    return Err(MapError::InconsistentTopology(format!(
                        "{} uses missing {}",
                        shape.id, de.edge
                    )));
                }
            }
            for pair in shape.edges.windows(2) {
                if self.directed_endpoints(&pair[0]).1 != self.directed_endpoints(&pair[1]).0 {
                    return Err(MapError::InconsistentTopology(format!(
                        "{} has a gap after {}",
                        shape.id, pair[0].edge
                    )));
                }
            }
            let first = &shape.edges[0];
            let last = &shape.edges[shape.edges.len() - 1];
            if self.directed_endpoints(last).1 != self.directed_endpoints(first).0 {
                return Err(MapError::InconsistentTopology(format!(
                    "{} isn't closed",
                    shape.id
                )));
            }
        }
        Ok(())
    }

    pub fn save_json(&self, path: &str) -> Result<()> {
        maputil::write_json(path, self)
    }

    /// Restores a map saved with serde, rebuilding the derived lookups.
    pub fn from_serialized(raw: &str) -> Result<PlanarMap> {
        let mut map: PlanarMap = maputil::from_json(raw)?;
        map.rebuild_edge_shapes();
        Ok(map)
    }

    pub(crate) fn rebuild_edge_shapes(&mut self) {
        self.edge_shapes = MultiMap::new();
        for shape in self.shapes.values() {
            for de in &shape.edges {
                self.edge_shapes.insert(de.edge, shape.id);
            }
        }
    }

    pub(crate) fn new_node(&mut self, pt: Pt2D, source: Option<NodeID>) -> GraphNodeID {
        let id = GraphNodeID(self.next_node);
        self.next_node += 1;
        self.nodes.insert(id, GraphNode { id, pt, source });
        id
    }

    fn new_edge(&mut self, src: GraphNodeID, dst: GraphNodeID) -> EdgeID {
        let id = EdgeID(self.next_edge);
        self.next_edge += 1;
        self.edges.insert(
            id,
            Edge {
                id,
                src,
                dst,
                passable: false,
            },
        );
        id
    }

    /// Creates a shape with a fresh edge between each consecutive pair of vertices, closing the
    /// loop. Repeated consecutive vertices are skipped. Returns None if fewer than 3 distinct
    /// vertices are left.
    pub(crate) fn new_shape(
        &mut self,
        kind: ShapeKind,
        source: Option<WayID>,
        mut vertices: Vec<GraphNodeID>,
    ) -> Option<ShapeID> {
        vertices.dedup();
        while vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        if vertices.len() < 3 {
            return None;
        }

        let id = ShapeID(self.next_shape);
        self.next_shape += 1;
        let mut edges = Vec::new();
        for idx in 0..vertices.len() {
            let edge = self.new_edge(vertices[idx], vertices[(idx + 1) % vertices.len()]);
            self.edge_shapes.insert(edge, id);
            edges.push(DirectedEdge {
                edge,
                forward: true,
                neighbour: None,
            });
        }
        self.shapes.insert(
            id,
            Shape {
                id,
                kind,
                source,
                edges,
            },
        );
        Some(id)
    }

    /// Replaces an edge by two edges meeting at `node`, in every shape using it.
    pub(crate) fn split_edge(&mut self, id: EdgeID, node: GraphNodeID) {
        let (src, dst) = {
            let edge = &self.edges[&id];
            (edge.src, edge.dst)
        };
        if node == src || node == dst {
            return;
        }
        let e1 = self.new_edge(src, node);
        let e2 = self.new_edge(node, dst);
        let users: Vec<ShapeID> = self.edge_shapes.get(id).iter().cloned().collect();
        for shape_id in users {
            let shape = match self.shapes.get_mut(&shape_id) {
                Some(s) => s,
                None => continue,
            };
            let mut edges = Vec::with_capacity(shape.edges.len() + 1);
            for de in shape.edges.drain(..) {
                if de.edge != id {
                    edges.push(de);
                } else if de.forward {
                    edges.push(DirectedEdge { edge: e1, ..de });
                    edges.push(DirectedEdge { edge: e2, ..de });
                } else {
                    edges.push(DirectedEdge { edge: e2, ..de });
                    edges.push(DirectedEdge { edge: e1, ..de });
                }
            }
            shape.edges = edges;
            self.edge_shapes.remove(id, shape_id);
            self.edge_shapes.insert(e1, shape_id);
            self.edge_shapes.insert(e2, shape_id);
        }
        self.edges.remove(&id);
    }

    /// Splits an edge at a point on it, returning the vertex there. If the point is one of the
    /// edge's ends, nothing changes.
    pub(crate) fn split_edge_at(&mut self, id: EdgeID, pt: Pt2D) -> GraphNodeID {
        let (src, dst) = {
            let edge = &self.edges[&id];
            (edge.src, edge.dst)
        };
        if self.nodes[&src].pt.approx_eq(pt) {
            return src;
        }
        if self.nodes[&dst].pt.approx_eq(pt) {
            return dst;
        }
        let node = self.new_node(pt, None);
        self.split_edge(id, node);
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splitting_shared_edges() {
        let mut map = PlanarMap::blank();
        let pts = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let n: Vec<GraphNodeID> = pts
            .iter()
            .map(|(x, y)| map.new_node(Pt2D::new(*x, *y), None))
            .collect();
        let square = map
            .new_shape(ShapeKind::AreaRoad, None, vec![n[0], n[1], n[2], n[3], n[0]])
            .unwrap();
        assert_eq!(map.get_shape(square).edges.len(), 4);
        let bottom = map.find_edge(n[0], n[1]).unwrap();

        // Make a second shape traverse the bottom edge backwards
        let below = map.new_node(Pt2D::new(5.0, -5.0), None);
        let other = map
            .new_shape(ShapeKind::Junction, None, vec![n[1], n[0], below])
            .unwrap();
        let dup = map.get_shape(other).edges[0].edge;
        {
            let shape = map.shapes.get_mut(&other).unwrap();
            shape.edges[0] = DirectedEdge {
                edge: bottom,
                forward: false,
                neighbour: None,
            };
        }
        map.edges.remove(&dup);
        map.rebuild_edge_shapes();
        assert_eq!(map.shapes_of_edge(bottom).len(), 2);
        map.validate().unwrap();

        let middle = map.split_edge_at(bottom, Pt2D::new(5.0, 0.0));
        assert!(!map.all_edges().contains_key(&bottom));
        assert_eq!(map.shape_nodes(square), vec![n[0], middle, n[1], n[2], n[3]]);
        assert_eq!(map.shape_nodes(other), vec![n[1], middle, n[0], below]);
        map.validate().unwrap();
        for e in [map.find_edge(n[0], middle), map.find_edge(middle, n[1])] {
            assert_eq!(map.shapes_of_edge(e.unwrap()).len(), 2);
        }

        // Splitting at an existing end is a no-op
        let edges_before = map.all_edges().len();
        let e = map.find_edge(n[1], n[2]).unwrap();
        assert_eq!(map.split_edge_at(e, Pt2D::new(10.0, 10.0)), n[2]);
        assert_eq!(map.all_edges().len(), edges_before);
    }

    #[test]
    fn degenerate_shapes_are_refused() {
        let mut map = PlanarMap::blank();
        let a = map.new_node(Pt2D::new(0.0, 0.0), None);
        let b = map.new_node(Pt2D::new(1.0, 0.0), None);
        assert!(map
            .new_shape(ShapeKind::Junction, None, vec![a, b, b, a])
            .is_none());
        assert!(map.all_edges().is_empty());
    }
}
