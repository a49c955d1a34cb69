use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use geom::Pt2D;
use maputil::{Tags, Timer};

use crate::{NodeID, TaggedMap, WayID};

/// The plain JSON form of a tagged map. Coordinates are already projected to meters.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RawInput {
    pub nodes: Vec<InputNode>,
    pub ways: Vec<InputWay>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct InputNode {
    pub id: i64,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct InputWay {
    pub id: i64,
    pub nodes: Vec<i64>,
    #[serde(default)]
    pub tags: Tags,
}

impl TaggedMap {
    /// Builds a map, classifying every way. Fails on dangling node references, ways with fewer
    /// than 2 nodes, or duplicate IDs.
    pub fn from_input(input: RawInput, timer: &mut Timer) -> Result<TaggedMap> {
        timer.start("ingest tagged map");
        let mut map = TaggedMap::blank();
        let mut edit = map.edit();
        for node in input.nodes {
            let pt = Pt2D::maybe_new(node.x, node.y)
                .ok_or_else(|| anyhow!("Node #{} has bad coordinates", node.id))?;
            edit.add_node_with_id(NodeID(node.id), pt, node.tags);
        }
        for way in input.ways {
            edit.add_way_with_id(
                WayID(way.id),
                way.nodes.into_iter().map(NodeID).collect(),
                way.tags,
            );
        }
        edit.commit().context("bad input")?;
        timer.note(map.summary());
        timer.stop("ingest tagged map");
        Ok(map)
    }

    pub fn to_input(&self) -> RawInput {
        RawInput {
            nodes: self
                .nodes
                .iter()
                .map(|(id, node)| InputNode {
                    id: id.0,
                    x: node.pt.x(),
                    y: node.pt.y(),
                    tags: node.tags.clone(),
                })
                .collect(),
            ways: self
                .ways
                .iter()
                .map(|(id, way)| InputWay {
                    id: id.0,
                    nodes: way.nodes.iter().map(|n| n.0).collect(),
                    tags: way.tags.clone(),
                })
                .collect(),
        }
    }

    pub fn load_json(path: &str, timer: &mut Timer) -> Result<TaggedMap> {
        let input: RawInput = maputil::read_json(path)?;
        TaggedMap::from_input(input, timer)
    }

    pub fn save_json(&self, path: &str) -> Result<()> {
        maputil::write_json(path, &self.to_input())
    }

    /// Restores a map saved with serde directly, rebuilding the derived lookups.
    pub fn from_serialized(raw: &str) -> Result<TaggedMap> {
        let mut map: TaggedMap = maputil::from_json(raw)?;
        map.rebuild_derived();
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WayKind;

    const INPUT: &str = r#"{
        "nodes": [
            {"id": 1, "x": 0.0, "y": 0.0},
            {"id": 2, "x": 50.0, "y": 0.0},
            {"id": 3, "x": 10.0, "y": 5.0},
            {"id": 4, "x": 20.0, "y": 5.0},
            {"id": 5, "x": 20.0, "y": 15.0},
            {"id": 6, "x": 10.0, "y": 15.0, "tags": {"addr:housenumber": "4"}}
        ],
        "ways": [
            {"id": 10, "nodes": [1, 2], "tags": {"rcr:type": "road", "rcr:width": "6000"}},
            {"id": 11, "nodes": [3, 4, 5, 6, 3], "tags": {"rcr:type": "building", "rcr:floors": "2"}}
        ]
    }"#;

    #[test]
    fn ingest() {
        let input: RawInput = maputil::from_json(INPUT).unwrap();
        let map = TaggedMap::from_input(input.clone(), &mut Timer::throwaway()).unwrap();
        assert_eq!(
            map.get_way(WayID(10)).unwrap().kind,
            WayKind::Road { width_mm: 6000 }
        );
        assert_eq!(
            map.get_way(WayID(11)).unwrap().kind,
            WayKind::Building { floors: 2, code: 0 }
        );
        assert_eq!(map.to_input(), input);

        // New IDs don't collide with loaded ones
        let mut map = map;
        let mut edit = map.edit();
        let n = edit.add_node(Pt2D::new(1.0, 1.0), Tags::empty());
        assert_eq!(n, NodeID(7));
    }

    #[test]
    fn serde_round_trip_rebuilds_lookups() {
        let input: RawInput = maputil::from_json(INPUT).unwrap();
        let map = TaggedMap::from_input(input, &mut Timer::throwaway()).unwrap();
        let raw = maputil::to_json(&map).unwrap();
        let restored = TaggedMap::from_serialized(&raw).unwrap();
        assert_eq!(restored.ways_at_node(NodeID(3)).len(), 1);
        assert_eq!(restored.summary(), map.summary());
    }

    #[test]
    fn dangling_reference() {
        let mut input: RawInput = maputil::from_json(INPUT).unwrap();
        input.ways[0].nodes.push(99);
        assert!(TaggedMap::from_input(input, &mut Timer::throwaway()).is_err());
    }
}
