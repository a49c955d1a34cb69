//! A planar subdivision of a `TaggedMap`, ready for a disaster simulation. Every building and
//! road becomes a `Shape` bounded by a cycle of `Edge`s; shapes touching along an edge share
//! it, and an edge is passable when people can walk across it from one shape to the other.
//!
//! Two things live here:
//! - `EntranceGenerator` searches for short connectors linking buildings to the road network,
//!   and writes them back into the `TaggedMap`.
//! - `PlanarMap::export` turns road centerlines into polygons with proper kerbs at junctions,
//!   glues everything into one planar graph, and makes sure every building is reachable.

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use geom::Pt2D;
use maputil::{deserialize_btreemap, serialize_btreemap, MultiMap};
use tagged_map::NodeID;

pub use self::entrances::{
    EntranceCandidate, EntranceEndpoint, EntranceGenerator, EntranceMode, RankingStage,
};
pub use self::options::{EntranceOptions, ExportOptions};
pub use self::shape::{DirectedEdge, Shape, ShapeKind};

mod entrances;
mod make;
mod map;
mod options;
mod shape;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GraphNodeID(pub usize);

impl fmt::Display for GraphNodeID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "GraphNode #{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeID(pub usize);

impl fmt::Display for EdgeID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Edge #{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShapeID(pub usize);

impl fmt::Display for ShapeID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Shape #{}", self.0)
    }
}

/// A vertex of the planar graph.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GraphNode {
    pub id: GraphNodeID,
    pub pt: Pt2D,
    /// The tagged node this came from. Kerb apexes computed at junctions have none.
    pub source: Option<NodeID>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Edge {
    pub id: EdgeID,
    pub src: GraphNodeID,
    pub dst: GraphNodeID,
    pub passable: bool,
}

impl Edge {
    pub fn other_end(&self, n: GraphNodeID) -> GraphNodeID {
        if self.src == n {
            self.dst
        } else {
            self.src
        }
    }
}

/// Things that can go wrong while building a planar map. These convert into `anyhow::Error`;
/// use `downcast_ref` to match on them.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MapError {
    #[error("inconsistent topology: {0}")]
    InconsistentTopology(String),
    #[error("{0} can't be connected to anything, because no shapes share any edges")]
    UnreachableShape(ShapeID),
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PlanarMap {
    #[serde(
        serialize_with = "serialize_btreemap",
        deserialize_with = "deserialize_btreemap"
    )]
    nodes: BTreeMap<GraphNodeID, GraphNode>,
    #[serde(
        serialize_with = "serialize_btreemap",
        deserialize_with = "deserialize_btreemap"
    )]
    edges: BTreeMap<EdgeID, Edge>,
    #[serde(
        serialize_with = "serialize_btreemap",
        deserialize_with = "deserialize_btreemap"
    )]
    shapes: BTreeMap<ShapeID, Shape>,
    main_group: BTreeSet<ShapeID>,

    next_node: usize,
    next_edge: usize,
    next_shape: usize,

    // Derived from shapes, rebuilt after loading
    #[serde(skip)]
    edge_shapes: MultiMap<EdgeID, ShapeID>,
}
