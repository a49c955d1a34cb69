use std::cmp::Ordering;

use anyhow::Result;

use geom::{Line, Pt2D};
use maputil::Timer;
use tagged_map::{NodeID, WayID};

use super::Builder;
use crate::{GraphNodeID, MapError, ShapeKind};

/// Something leaving a node where roads meet shapes.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Spoke {
    /// The wall of a shape where the outside begins, going clockwise
    Start(WayID),
    /// The wall of a shape where the outside ends
    End(WayID),
    Road(usize),
}

/// Roads between two walls, going clockwise around a node through open space.
#[derive(Debug, PartialEq)]
struct Arc {
    start: WayID,
    end: WayID,
    roads: Vec<usize>,
}

impl<'a> Builder<'a> {
    pub fn resolve_shape_junctions(&mut self, timer: &mut Timer) -> Result<()> {
        let nodes: Vec<NodeID> = self.intersections.keys().cloned().collect();
        timer.start_iter("resolve junctions at shapes", nodes.len());
        for n in nodes {
            timer.next();
            self.processed.insert(n);
            let shapes = self.intersections[&n].clone();
            let roads = self.roads_at(n)?;
            for arc in self.outside_arcs(n, &roads, &shapes)? {
                self.connect_roads_and_shapes(n, arc)?;
            }
        }
        Ok(())
    }

    pub fn resolve_plain_junctions(&mut self, timer: &mut Timer) -> Result<()> {
        let map = self.map;
        timer.start_iter("resolve plain junctions", map.all_nodes().len());
        for n in map.all_nodes().keys() {
            timer.next();
            let roads = self.roads_at(*n)?;
            if roads.is_empty() || !self.processed.insert(*n) {
                continue;
            }

            if roads.len() == 1 {
                let road = roads[0];
                let left = self.segments[road].left_kerb(*n).pt1();
                let right = self.segments[road].right_kerb(*n).pt1();
                let left = self.planar.new_node(left, None);
                let right = self.planar.new_node(right, None);
                self.segments[road].set_left(*n, left);
                self.segments[road].set_right(*n, right);
                continue;
            }

            let mut roads = roads;
            self.sort_clockwise(*n, &mut roads);
            let mut apexes = Vec::new();
            let mut prev = roads[roads.len() - 1];
            for road in roads {
                let pt = self.segments[prev].intersect(&self.segments[road], *n, self.opts);
                let apex = self.planar.new_node(pt, None);
                self.segments[prev].set_right(*n, apex);
                self.segments[road].set_left(*n, apex);
                apexes.push(apex);
                prev = road;
            }
            if apexes.len() > 2 {
                self.make_junction(*n, apexes);
            }
        }
        Ok(())
    }

    pub fn make_road_shapes(&mut self) -> Result<()> {
        for idx in 0..self.segments.len() {
            let (way, head, tail) = {
                let s = &self.segments[idx];
                (s.way, s.head, s.tail)
            };
            let head = self.graph_node(head)?;
            let tail = self.graph_node(tail)?;
            let apexes = self.segments[idx].apexes(head, tail);
            if self
                .planar
                .new_shape(ShapeKind::RoadSegment, Some(way), apexes)
                .is_none()
            {
                warn!(
                    "The segment of {} between {} and {} collapsed to a line",
                    way, self.segments[idx].head, self.segments[idx].tail
                );
            }
        }
        Ok(())
    }

    fn make_junction(&mut self, n: NodeID, apexes: Vec<GraphNodeID>) {
        if self
            .planar
            .new_shape(ShapeKind::Junction, None, apexes)
            .is_none()
        {
            warn!("The junction at {} collapsed", n);
        }
    }

    fn sort_clockwise(&self, n: NodeID, roads: &mut [usize]) {
        roads.sort_by(|a, b| {
            self.segments[*a]
                .bearing_from(n)
                .partial_cmp(&self.segments[*b].bearing_from(n))
                .unwrap_or(Ordering::Equal)
        });
    }

    /// The neighbours of `center` along a closed way, ordered so that sweeping clockwise from
    /// the first to the second stays outside the shape.
    fn outside_nodes(&self, center: NodeID, way: WayID) -> Result<(NodeID, NodeID)> {
        let segments = self.map.get_way(way)?.segments();
        let mut area = 0.0;
        let mut before = None;
        let mut after = None;
        for (a, b) in &segments {
            let p1 = self.map.pt(*a)?;
            let p2 = self.map.pt(*b)?;
            area += p1.x() * p2.y() - p2.x() * p1.y();
            if *b == center {
                before = Some(*a);
            }
            if *a == center {
                after = Some(*b);
            }
        }
        match (before, after) {
            (Some(before), Some(after)) => {
                if area > 0.0 {
                    Ok((after, before))
                } else {
                    Ok((before, after))
                }
            }
            _ => Err(MapError::InconsistentTopology(format!(
                "{} isn't surrounded by other nodes on {}",
                center, way
            ))
            .into()),
        }
    }

    /// Groups the roads at a node by the gap between shapes they pass through. Roads running
    /// along the outline of a shape don't count. Only gaps with at least one road are returned.
    fn outside_arcs(&self, center: NodeID, roads: &[usize], shapes: &[WayID]) -> Result<Vec<Arc>> {
        let center_pt = self.map.pt(center)?;
        let bearing = |pt: Pt2D| (pt - center_pt).bearing().normalized_radians();

        let mut spokes: Vec<(f64, Spoke)> = Vec::new();
        for way in shapes {
            let (start, end) = self.outside_nodes(center, *way)?;
            spokes.push((bearing(self.map.pt(start)?), Spoke::Start(*way)));
            spokes.push((bearing(self.map.pt(end)?), Spoke::End(*way)));
        }
        for road in roads {
            let segment = &self.segments[*road];
            let mut along_outline = false;
            for way in shapes {
                let nodes = &self.map.get_way(*way)?.nodes;
                if nodes.contains(&segment.head) && nodes.contains(&segment.tail) {
                    along_outline = true;
                }
            }
            if !along_outline {
                spokes.push((segment.bearing_from(center), Spoke::Road(*road)));
            }
        }
        spokes.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        // Go around twice, so an arc can wrap past north
        let mut arcs = Vec::new();
        let mut current: Option<Arc> = None;
        let mut first = None;
        for (idx, (_, spoke)) in spokes.iter().chain(spokes.iter()).enumerate() {
            match spoke {
                Spoke::Start(way) => {
                    if first == Some(idx % spokes.len()) {
                        break;
                    }
                    if first.is_none() {
                        first = Some(idx);
                    }
                    current = Some(Arc {
                        start: *way,
                        end: *way,
                        roads: Vec::new(),
                    });
                }
                Spoke::Road(road) => {
                    if let Some(ref mut arc) = current {
                        arc.roads.push(*road);
                    }
                }
                Spoke::End(way) => {
                    if let Some(mut arc) = current.take() {
                        if !arc.roads.is_empty() {
                            arc.end = *way;
                            arcs.push(arc);
                        }
                    }
                }
            }
        }
        Ok(arcs)
    }

    /// Cuts the kerbs of the roads in an arc into the walls on either side, and builds the
    /// junction filling the space between the road ends and the walls.
    fn connect_roads_and_shapes(&mut self, center: NodeID, arc: Arc) -> Result<()> {
        let mut apexes = Vec::new();
        for (idx, road) in arc.roads.iter().enumerate() {
            if idx == 0 {
                let kerb = self.segments[*road].left_kerb(center);
                let apex = self.cut_into_shape(arc.start, center, &kerb)?;
                self.segments[*road].set_left(center, apex);
                apexes.push(apex);
            } else {
                let prev = arc.roads[idx - 1];
                let pt = self.segments[prev].intersect(&self.segments[*road], center, self.opts);
                let apex = self.planar.new_node(pt, None);
                self.segments[prev].set_right(center, apex);
                self.segments[*road].set_left(center, apex);
                apexes.push(apex);
            }
        }
        let last = arc.roads[arc.roads.len() - 1];
        let kerb = self.segments[last].right_kerb(center);
        let apex = self.cut_into_shape(arc.end, center, &kerb)?;
        self.segments[last].set_right(center, apex);
        apexes.push(apex);

        let start_shape = self.area_shape(arc.start)?;
        let end_shape = self.area_shape(arc.end)?;
        let first_apex = apexes[0];
        let last_apex = apexes[apexes.len() - 1];
        let cap = if arc.start == arc.end {
            self.planar
                .shortest_boundary_path(start_shape, last_apex, first_apex)?
        } else {
            // The cap runs along the end shape to the node, then along the start shape
            self.split_at_source(arc.start, center)?;
            self.split_at_source(arc.end, center)?;
            let via = self.graph_node(center)?;
            let mut cap = self
                .planar
                .shortest_boundary_path(end_shape, last_apex, via)?;
            cap.extend(
                self.planar
                    .shortest_boundary_path(start_shape, via, first_apex)?
                    .into_iter()
                    .skip(1),
            );
            cap.dedup();
            cap
        };

        if apexes.len() > 2 {
            if cap.len() > 2 {
                apexes.extend(cap[1..cap.len() - 1].iter().cloned());
            }
            self.make_junction(center, apexes);
        } else if cap.len() > 2 {
            self.segments[last].set_end_apexes(center, cap);
        }
        Ok(())
    }

    /// Where a kerb leaves the shape built from `way`, as a vertex on its boundary. If the kerb
    /// misses, falls back to the node itself.
    fn cut_into_shape(&mut self, way: WayID, center: NodeID, kerb: &Line) -> Result<GraphNodeID> {
        let shape = self.area_shape(way)?;
        match self.planar.ray_exit(shape, kerb) {
            Some((pt, edge)) => Ok(self.planar.split_edge_at(edge, pt)),
            None => {
                debug!("Kerb from {} misses {}, using the node itself", center, way);
                self.split_at_source(way, center)?;
                self.graph_node(center)
            }
        }
    }

    fn area_shape(&self, way: WayID) -> Result<crate::ShapeID> {
        match self.area_shapes.get(&way) {
            Some(area) => Ok(area.id),
            None => Err(MapError::InconsistentTopology(format!("{} has no shape", way)).into()),
        }
    }
}
