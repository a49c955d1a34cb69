use std::collections::BTreeSet;

use anyhow::Result;

use geom::Line;
use tagged_map::{NodeID, RawWay, WayID, WayKind};

use super::{AreaShape, Builder};
use crate::{MapError, ShapeKind};

impl<'a> Builder<'a> {
    /// Buildings first, then area roads.
    pub fn make_area_shapes(&mut self) -> Result<()> {
        let map = self.map;
        for (id, way) in map.all_ways() {
            if way.kind.is_building() && way.is_closed() {
                self.make_area_shape(*id, way)?;
            }
        }
        for (id, way) in map.all_ways() {
            if way.kind == WayKind::AreaRoad && way.is_closed() {
                self.make_area_shape(*id, way)?;
            }
        }
        Ok(())
    }

    fn make_area_shape(&mut self, id: WayID, way: &RawWay) -> Result<()> {
        let mut used = BTreeSet::new();
        let mut vertices = Vec::new();
        for n in way.nodes.iter().skip(1) {
            if self.is_redundant(id, way, *n)? {
                continue;
            }
            used.insert(*n);
            vertices.push(self.graph_node(*n)?);
        }

        let kind = match way.kind {
            WayKind::Building { floors, code } => ShapeKind::Building { floors, code },
            _ => ShapeKind::AreaRoad,
        };
        let shape = match self.planar.new_shape(kind, Some(id), vertices) {
            Some(s) => s,
            None => {
                warn!("{} has fewer than 3 distinct corners, skipping it", id);
                return Ok(());
            }
        };
        self.area_shapes.insert(id, AreaShape { id: shape, used });

        for n in way.distinct_nodes() {
            if !self.roads_at(n)?.is_empty() {
                self.intersections.entry(n).or_insert_with(Vec::new).push(id);
            }
        }
        Ok(())
    }

    /// A boundary node can be left out if it sits on the straight line between its neighbours
    /// and no other area shape uses it.
    fn is_redundant(&self, id: WayID, way: &RawWay, n: NodeID) -> Result<bool> {
        for other in self.map.ways_at_node(n) {
            if *other != id && self.map.get_way(*other)?.kind.is_area() {
                return Ok(false);
            }
        }
        let neighbours: Vec<NodeID> = way.neighbours_of(n).into_iter().collect();
        if neighbours.len() != 2 {
            return Ok(false);
        }
        let line = match Line::maybe_new(self.map.pt(neighbours[0])?, self.map.pt(neighbours[1])?)
        {
            Some(l) => l,
            None => return Ok(false),
        };
        Ok(line.contains_pt(self.map.pt(n)?))
    }

    /// Makes sure a source node that was left out of an area shape becomes one of its vertices,
    /// by splitting the edge running past it.
    pub(crate) fn split_at_source(&mut self, way: WayID, n: NodeID) -> Result<()> {
        let shape = match self.area_shapes.get_mut(&way) {
            Some(area) => {
                if !area.used.insert(n) {
                    return Ok(());
                }
                area.id
            }
            None => {
                return Err(MapError::InconsistentTopology(format!(
                    "{} has no shape to split at {}",
                    way, n
                ))
                .into());
            }
        };
        let gn = self.graph_node(n)?;
        if self.planar.shape_nodes(shape).contains(&gn) {
            return Ok(());
        }
        let pt = self.planar.get_node(gn).pt;
        let edge = self.planar.edge_containing(shape, pt).ok_or_else(|| {
            MapError::InconsistentTopology(format!(
                "{} should be on the boundary of {} (from {}), but isn't on any edge",
                n, shape, way
            ))
        })?;
        self.planar.split_edge(edge, gn);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use maputil::Timer;
    use tagged_map::MapBuilder;

    use crate::{ExportOptions, PlanarMap};

    #[test]
    fn collinear_corners_are_dropped() {
        let mut b = MapBuilder::new();
        // The node at (5, 0) is on a straight wall; (10, 5) is shared with the neighbour
        let bldg = b.building_pts(&[
            (0.0, 0.0),
            (5.0, 0.0),
            (10.0, 0.0),
            (10.0, 5.0),
            (10.0, 10.0),
            (0.0, 10.0),
        ]);
        let neighbour = b.building_pts(&[(10.0, 5.0), (20.0, 5.0), (20.0, 10.0), (10.0, 10.0)]);

        let opts = ExportOptions {
            skip_repair: true,
            ..Default::default()
        };
        let planar = PlanarMap::export(&b.map, &opts, &mut Timer::throwaway()).unwrap();
        let shape = planar.shapes_from_way(bldg)[0];
        assert_eq!(planar.shape_nodes(shape).len(), 5);
        assert!(planar.node_for_source(b.node(5.0, 0.0)).is_none());
        assert!(planar.node_for_source(b.node(10.0, 5.0)).is_some());
        assert_eq!(planar.shapes_from_way(neighbour).len(), 1);
    }
}
