//! A loosely-tagged graph of nodes and ways, the input to planarization. Ways are classified once
//! at ingestion into a `WayKind`, so nothing downstream needs to look at string tags to decide
//! what a way represents.
//!
//! The map keeps a few derived structures in sync with its contents: which ways reference each
//! node, and a spatial index over way bounding boxes. All structural changes go through a
//! `MapEdit` transaction, so those structures are never observed half-updated.

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use geom::{Bounds, Line, Pt2D, Ring, SpatialIndex};
use maputil::{deserialize_btreemap, serialize_btreemap, MultiMap, Tags};

pub use self::builder::MapBuilder;
pub use self::cleanup::line_crosses_way;
pub use self::edit::{EditEffects, MapEdit};
pub use self::input::{InputNode, InputWay, RawInput};
pub use self::kind::{
    infer_width_mm, is_marked_entrance, WayKind, AUTOGENERATED_ENTRANCE_TAGS,
    DEFAULT_BUILDING_CODE, DEFAULT_ENTRANCE_WIDTH_MM, DEFAULT_FLOORS, DEFAULT_LANE_WIDTH_MM,
    FOOTWAY_WIDTH_MM, MINIMUM_ROAD_WIDTH_MM, SERVICE_DEFAULT_WIDTH_MM, SERVICE_DRIVEWAY_WIDTH_MM,
};

mod builder;
mod cleanup;
mod connectivity;
mod edit;
mod input;
mod kind;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeID(pub i64);

impl fmt::Display for NodeID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Node #{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WayID(pub i64);

impl fmt::Display for WayID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Way #{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RawNode {
    pub pt: Pt2D,
    pub tags: Tags,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RawWay {
    pub nodes: Vec<NodeID>,
    pub tags: Tags,
    pub kind: WayKind,
}

impl RawWay {
    /// Closed ways start and end at the same node.
    pub fn is_closed(&self) -> bool {
        self.nodes.len() > 2 && self.nodes.first() == self.nodes.last()
    }

    /// Every consecutive pair of nodes. For closed ways, this includes the segment back to the
    /// start.
    pub fn segments(&self) -> Vec<(NodeID, NodeID)> {
        self.nodes.windows(2).map(|pair| (pair[0], pair[1])).collect()
    }

    /// The distinct nodes of the way, without repeating the first node of a closed way.
    pub fn distinct_nodes(&self) -> Vec<NodeID> {
        let mut nodes = self.nodes.clone();
        if self.is_closed() {
            nodes.pop();
        }
        nodes
    }

    /// The nodes directly before and after `node` along the way, deduplicated.
    pub fn neighbours_of(&self, node: NodeID) -> BTreeSet<NodeID> {
        let mut result = BTreeSet::new();
        for (a, b) in self.segments() {
            if a == node && b != node {
                result.insert(b);
            }
            if b == node && a != node {
                result.insert(a);
            }
        }
        result
    }

    pub fn is_entrance(&self) -> bool {
        self.kind.is_centerline() && self.tags.is("rcr:entrance", "yes")
    }
}

#[derive(Serialize, Deserialize)]
pub struct TaggedMap {
    #[serde(
        serialize_with = "serialize_btreemap",
        deserialize_with = "deserialize_btreemap"
    )]
    nodes: BTreeMap<NodeID, RawNode>,
    #[serde(
        serialize_with = "serialize_btreemap",
        deserialize_with = "deserialize_btreemap"
    )]
    ways: BTreeMap<WayID, RawWay>,

    // Derived from the above, rebuilt after loading
    #[serde(skip)]
    referrers: MultiMap<NodeID, WayID>,
    #[serde(skip)]
    index: SpatialIndex<WayID>,
}

impl TaggedMap {
    pub fn blank() -> TaggedMap {
        TaggedMap {
            nodes: BTreeMap::new(),
            ways: BTreeMap::new(),
            referrers: MultiMap::new(),
            index: SpatialIndex::new(),
        }
    }

    /// Starts a transaction. Nothing happens to the map until the edit is committed.
    pub fn edit(&mut self) -> MapEdit {
        MapEdit::new(self)
    }

    pub fn get_node(&self, id: NodeID) -> Result<&RawNode> {
        self.nodes
            .get(&id)
            .ok_or_else(|| anyhow!("{} doesn't exist", id))
    }

    pub fn get_way(&self, id: WayID) -> Result<&RawWay> {
        self.ways.get(&id).ok_or_else(|| anyhow!("{} doesn't exist", id))
    }

    pub fn all_nodes(&self) -> &BTreeMap<NodeID, RawNode> {
        &self.nodes
    }

    pub fn all_ways(&self) -> &BTreeMap<WayID, RawWay> {
        &self.ways
    }

    pub fn pt(&self, id: NodeID) -> Result<Pt2D> {
        Ok(self.get_node(id)?.pt)
    }

    /// Every point along the way, in order.
    pub fn way_pts(&self, id: WayID) -> Result<Vec<Pt2D>> {
        self.get_way(id)?
            .nodes
            .iter()
            .map(|n| self.pt(*n))
            .collect()
    }

    /// The line segments of a way, skipping zero-length segments.
    pub fn way_lines(&self, id: WayID) -> Result<Vec<(NodeID, NodeID, Line)>> {
        let mut lines = Vec::new();
        for (a, b) in self.get_way(id)?.segments() {
            if let Some(line) = Line::maybe_new(self.pt(a)?, self.pt(b)?) {
                lines.push((a, b, line));
            }
        }
        Ok(lines)
    }

    /// The outline of a closed way. None for open or degenerate ways.
    pub fn way_ring(&self, id: WayID) -> Option<Ring> {
        let way = self.ways.get(&id)?;
        if !way.is_closed() {
            return None;
        }
        Ring::new(self.way_pts(id).ok()?).ok()
    }

    pub fn way_bounds(&self, id: WayID) -> Result<Bounds> {
        Ok(Bounds::from(&self.way_pts(id)?))
    }

    /// Every way whose bounding box touches the query box.
    pub fn ways_touching(&self, bounds: &Bounds) -> Vec<WayID> {
        self.index.query(bounds)
    }

    /// Every way referencing the node.
    pub fn ways_at_node(&self, id: NodeID) -> &BTreeSet<WayID> {
        self.referrers.get(id)
    }

    pub fn bounds(&self) -> Bounds {
        let mut b = Bounds::new();
        for node in self.nodes.values() {
            b.update(node.pt);
        }
        b
    }

    /// Recalculates everything derived from nodes and ways.
    pub(crate) fn rebuild_derived(&mut self) {
        self.referrers = MultiMap::new();
        self.index = SpatialIndex::new();
        let ids: Vec<WayID> = self.ways.keys().cloned().collect();
        for id in ids {
            self.index_way(id);
        }
    }

    pub(crate) fn index_way(&mut self, id: WayID) {
        if let Some(way) = self.ways.get(&id) {
            for n in &way.nodes {
                self.referrers.insert(*n, id);
            }
        }
        match self.way_bounds(id) {
            Ok(b) if !b.is_empty() => self.index.insert(id, b),
            _ => self.index.remove(&id),
        }
    }

    pub(crate) fn unindex_way(&mut self, id: WayID) {
        if let Some(way) = self.ways.get(&id) {
            for n in way.nodes.clone() {
                self.referrers.remove(n, id);
            }
        }
        self.index.remove(&id);
    }

    pub(crate) fn next_node_id(&self) -> NodeID {
        NodeID(self.nodes.keys().next_back().map(|id| id.0 + 1).unwrap_or(1).max(1))
    }

    pub(crate) fn next_way_id(&self) -> WayID {
        WayID(self.ways.keys().next_back().map(|id| id.0 + 1).unwrap_or(1).max(1))
    }

    pub fn summary(&self) -> String {
        let mut roads = 0;
        let mut area_roads = 0;
        let mut buildings = 0;
        let mut other = 0;
        for way in self.ways.values() {
            match way.kind {
                WayKind::Road { .. } => roads += 1,
                WayKind::AreaRoad => area_roads += 1,
                WayKind::Building { .. } => buildings += 1,
                WayKind::Other => other += 1,
            }
        }
        format!(
            "{} nodes, {} road centerlines, {} area roads, {} buildings, {} other ways",
            self.nodes.len(),
            roads,
            area_roads,
            buildings,
            other
        )
    }
}

impl Default for TaggedMap {
    fn default() -> Self {
        Self::blank()
    }
}
