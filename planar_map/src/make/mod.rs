//! Turns a `TaggedMap` into a `PlanarMap`. The passes, in order:
//!
//! 1. Every closed building and area road becomes a shape.
//! 2. Where road centerlines end on one of those shapes, the road kerbs are cut into the shape's
//!    boundary.
//! 3. Every other node with roads gets kerb apexes, and a junction shape if more than two roads
//!    meet there.
//! 4. Each road segment becomes a shape spanning the apexes at both ends.
//! 5. Coincident nodes and edges are merged, so touching shapes share edges.
//! 6. Edges between a road and anything else become passable, and stranded buildings are
//!    connected to the largest group.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;

use maputil::Timer;
use tagged_map::{NodeID, TaggedMap, WayID};

use crate::{ExportOptions, GraphNodeID, PlanarMap, ShapeID};

pub(crate) use self::road_segment::RoadSegment;

mod connectivity;
mod dedup;
mod junctions;
mod road_segment;
mod shapes;

impl PlanarMap {
    pub fn export(map: &TaggedMap, opts: &ExportOptions, timer: &mut Timer) -> Result<PlanarMap> {
        timer.start("export planar map");
        let mut builder = Builder::new(map, opts);

        timer.start("make area shapes");
        builder.make_area_shapes()?;
        timer.stop("make area shapes");

        builder.resolve_shape_junctions(timer)?;
        builder.resolve_plain_junctions(timer)?;

        timer.start("make road shapes");
        builder.make_road_shapes()?;
        timer.stop("make road shapes");

        let mut planar = builder.planar;
        timer.start("merge duplicates");
        planar.merge_duplicates(timer);
        timer.stop("merge duplicates");

        planar.compute_passability();
        planar.find_main_group();
        if !opts.skip_repair {
            planar.repair(timer)?;
        }
        timer.note(planar.summary());
        timer.stop("export planar map");
        Ok(planar)
    }
}

/// Working state for one export.
pub(crate) struct Builder<'a> {
    map: &'a TaggedMap,
    opts: &'a ExportOptions,
    planar: PlanarMap,

    graph_nodes: BTreeMap<NodeID, GraphNodeID>,
    area_shapes: BTreeMap<WayID, AreaShape>,
    /// Nodes where road centerlines touch a building or area road, and which ones.
    intersections: BTreeMap<NodeID, Vec<WayID>>,
    processed: BTreeSet<NodeID>,

    segments: Vec<RoadSegment>,
    /// Keyed by the way and both ends, smallest node first. None for zero-length segments.
    segment_lookup: BTreeMap<(WayID, NodeID, NodeID), Option<usize>>,
}

struct AreaShape {
    id: ShapeID,
    /// Source nodes that are vertices of the shape.
    used: BTreeSet<NodeID>,
}

impl<'a> Builder<'a> {
    fn new(map: &'a TaggedMap, opts: &'a ExportOptions) -> Builder<'a> {
        Builder {
            map,
            opts,
            planar: PlanarMap::blank(),
            graph_nodes: BTreeMap::new(),
            area_shapes: BTreeMap::new(),
            intersections: BTreeMap::new(),
            processed: BTreeSet::new(),
            segments: Vec::new(),
            segment_lookup: BTreeMap::new(),
        }
    }

    /// The output vertex for a tagged node, created the first time it's needed.
    fn graph_node(&mut self, n: NodeID) -> Result<GraphNodeID> {
        if let Some(id) = self.graph_nodes.get(&n) {
            return Ok(*id);
        }
        let pt = self.map.pt(n)?;
        let id = self.planar.new_node(pt, Some(n));
        self.graph_nodes.insert(n, id);
        Ok(id)
    }

    /// Every road segment with an end at this node, creating them as needed.
    fn roads_at(&mut self, n: NodeID) -> Result<Vec<usize>> {
        let map = self.map;
        let mut result = BTreeSet::new();
        for way_id in map.ways_at_node(n) {
            let way = map.get_way(*way_id)?;
            if !way.kind.is_centerline() {
                continue;
            }
            for other in way.neighbours_of(n) {
                if let Some(idx) = self.get_segment(*way_id, n, other)? {
                    result.insert(idx);
                }
            }
        }
        Ok(result.into_iter().collect())
    }

    fn get_segment(&mut self, way: WayID, n1: NodeID, n2: NodeID) -> Result<Option<usize>> {
        let key = (way, n1.min(n2), n1.max(n2));
        if let Some(idx) = self.segment_lookup.get(&key) {
            return Ok(*idx);
        }
        let width = match self.map.get_way(way)?.kind.width() {
            Some(w) => w,
            None => bail!("{} is a road without a width", way),
        };
        match RoadSegment::new(way, n1, self.map.pt(n1)?, n2, self.map.pt(n2)?, width) {
            Some(segment) => {
                let idx = self.segments.len();
                self.segments.push(segment);
                self.segment_lookup.insert(key, Some(idx));
                Ok(Some(idx))
            }
            None => {
                warn!(
                    "{} has a zero-length segment between {} and {}, skipping it",
                    way, n1, n2
                );
                self.segment_lookup.insert(key, None);
                Ok(None)
            }
        }
    }
}
