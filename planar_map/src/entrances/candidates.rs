use std::collections::BTreeMap;

use anyhow::Result;

use geom::{Bounds, Distance, Line, Pt2D, Vec2D};
use tagged_map::{is_marked_entrance, NodeID, TaggedMap, WayID};

use super::EntranceGenerator;
use crate::EntranceOptions;

/// One end of a possible entrance.
#[derive(Clone, Debug, PartialEq)]
pub struct EntranceEndpoint {
    pub way: WayID,
    pub pt: Pt2D,
    /// Set if the endpoint is an existing node; otherwise it's somewhere along a segment.
    pub node: Option<NodeID>,
    /// The direction a connector should ideally run in here, perpendicular to the outline.
    /// The sign doesn't matter.
    pub normal: Vec2D,
    /// For endpoints on buildings, true if this is a node marked as a door or address.
    pub marked: bool,
}

/// A possible entrance from a building to a road or another building.
#[derive(Clone, Debug, PartialEq)]
pub struct EntranceCandidate {
    pub building: EntranceEndpoint,
    pub target: EntranceEndpoint,
    pub target_is_road: bool,
    /// Whether the target can already reach the main network.
    pub target_connected: bool,
}

impl EntranceCandidate {
    /// None if both ends are at the same spot.
    pub fn line(&self) -> Option<Line> {
        Line::maybe_new(self.building.pt, self.target.pt)
    }

    pub fn length(&self) -> Distance {
        self.building.pt.dist_to(self.target.pt)
    }

    /// How well the connector's direction agrees with the outlines at both ends. 1 when it
    /// leaves the building and meets the target head-on, 0 when it runs along either of them.
    pub fn alignment(&self) -> f64 {
        match (self.target.pt - self.building.pt).normalize() {
            Some(dir) => dir.dot(self.building.normal).abs() * dir.dot(self.target.normal).abs(),
            None => 0.0,
        }
    }

    /// `1 - alignment()`
    pub fn mismatch(&self) -> f64 {
        1.0 - self.alignment()
    }
}

/// Where entrances can start on a building: every marked node with two neighbours along the
/// outline, then the middle of every wall at least `min_wall_length` long.
pub(crate) fn building_anchors(
    map: &TaggedMap,
    building: WayID,
    opts: &EntranceOptions,
) -> Result<Vec<EntranceEndpoint>> {
    let way = map.get_way(building)?;
    let mut anchors = Vec::new();
    for n in way.distinct_nodes() {
        if !is_marked_entrance(&map.get_node(n)?.tags) {
            continue;
        }
        let neighbours: Vec<NodeID> = way.neighbours_of(n).into_iter().collect();
        if neighbours.len() != 2 {
            continue;
        }
        let pt = map.pt(n)?;
        let before = (map.pt(neighbours[0])? - pt).left_normal();
        let after = (pt - map.pt(neighbours[1])?).left_normal();
        let normal = match (before, after) {
            (Some(n1), Some(n2)) => (n1 + n2).normalize(),
            _ => None,
        };
        match normal {
            Some(normal) => anchors.push(EntranceEndpoint {
                way: building,
                pt,
                node: Some(n),
                normal,
                marked: true,
            }),
            None => debug!("Can't find a direction for the entrance at {}", n),
        }
    }

    let min_wall = Distance::meters(opts.min_wall_length);
    for (_, _, wall) in map.way_lines(building)? {
        if wall.length() < min_wall {
            continue;
        }
        anchors.push(EntranceEndpoint {
            way: building,
            pt: wall.middle(),
            node: None,
            normal: wall.left_normal(),
            marked: false,
        });
    }
    Ok(anchors)
}

/// Where an entrance from `anchor` could end on a way: straight across to every segment the
/// anchor projects onto, and for road centerlines, every vertex.
pub(crate) fn targets_on_way(
    map: &TaggedMap,
    anchor: &EntranceEndpoint,
    way: WayID,
) -> Result<Vec<EntranceEndpoint>> {
    let mut targets = Vec::new();
    let mut normal_sums: BTreeMap<NodeID, Vec2D> = BTreeMap::new();
    for (a, b, line) in map.way_lines(way)? {
        let normal = line.left_normal();
        if let Some(pt) = line.project_pt(anchor.pt) {
            targets.push(EntranceEndpoint {
                way,
                pt,
                node: None,
                normal,
                marked: false,
            });
        }
        *normal_sums.entry(a).or_insert(Vec2D::ZERO) += normal;
        *normal_sums.entry(b).or_insert(Vec2D::ZERO) += normal;
    }

    let road = map.get_way(way)?;
    if !road.kind.is_centerline() {
        return Ok(targets);
    }
    for n in road.distinct_nodes() {
        let pt = map.pt(n)?;
        let dead_end = map.ways_at_node(n).len() == 1 && road.neighbours_of(n).len() == 1;
        let normal = if dead_end {
            (anchor.pt - pt).normalize()
        } else {
            normal_sums.get(&n).and_then(|v| v.normalize())
        };
        if let Some(normal) = normal {
            targets.push(EntranceEndpoint {
                way,
                pt,
                node: Some(n),
                normal,
                marked: false,
            });
        }
    }
    Ok(targets)
}

impl EntranceGenerator {
    /// Every candidate within the length limits, unranked.
    pub(crate) fn find_candidates(
        &mut self,
        map: &TaggedMap,
        building: WayID,
    ) -> Result<Vec<EntranceCandidate>> {
        let attached = self.attached_buildings(map, building);
        let mut connected: BTreeMap<WayID, bool> = BTreeMap::new();
        let mut candidates = Vec::new();

        for anchor in building_anchors(map, building, &self.opts)? {
            let search = Bounds::around(anchor.pt, self.opts.max_length());
            for way in map.ways_touching(&search) {
                let kind = map.get_way(way)?.kind;
                if way == building || !kind.is_relevant() {
                    continue;
                }
                if kind.is_building() && attached.contains(&way) {
                    continue;
                }
                let target_connected = match connected.get(&way) {
                    Some(c) => *c,
                    None => {
                        let c = self.is_connected(map, way);
                        connected.insert(way, c);
                        c
                    }
                };

                for target in targets_on_way(map, &anchor, way)? {
                    let candidate = EntranceCandidate {
                        building: anchor.clone(),
                        target,
                        target_is_road: kind.is_road(),
                        target_connected,
                    };
                    let length = candidate.length();
                    if length >= self.opts.min_length() && length <= self.opts.max_length() {
                        candidates.push(candidate);
                    }
                }
            }
        }
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use maputil::Tags;
    use tagged_map::MapBuilder;

    use super::*;

    #[test]
    fn anchors() {
        let mut b = MapBuilder::new();
        let mut door = Tags::empty();
        door.insert("entrance", "main");
        b.tagged_node(5.0, 0.0, door);
        // A short wall from (10, 0) to (11, 1)
        let bldg = b.building_pts(&[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0), (11.0, 1.0), (11.0, 10.0), (0.0, 10.0)]);

        let anchors = building_anchors(&b.map, bldg, &EntranceOptions::default()).unwrap();
        // The door, then 5 walls long enough
        assert_eq!(anchors.len(), 6);
        assert!(anchors[0].marked);
        assert_eq!(anchors[0].pt, Pt2D::new(5.0, 0.0));
        assert!((anchors[0].normal.dot(Vec2D::new(0.0, 1.0)).abs() - 1.0).abs() < 1e-9);
        assert!(anchors[1..].iter().all(|a| !a.marked && a.node.is_none()));
        assert!(anchors
            .iter()
            .all(|a| !a.pt.approx_eq(Pt2D::new(10.5, 0.5))));
    }

    #[test]
    fn targets() {
        let mut b = MapBuilder::new();
        let road = b.road(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)], "6000");
        let anchor = EntranceEndpoint {
            way: WayID(999),
            pt: Pt2D::new(4.0, 5.0),
            node: None,
            normal: Vec2D::new(0.0, -1.0),
            marked: false,
        };
        let targets = targets_on_way(&b.map, &anchor, road).unwrap();
        // One projection onto the first segment, then all 3 vertices
        assert_eq!(targets.len(), 4);
        assert_eq!(targets[0].pt, Pt2D::new(4.0, 0.0));
        assert_eq!(targets[0].node, None);

        // The dead end at the start points towards the anchor
        let start = &targets[1];
        assert_eq!(start.node, Some(b.node(0.0, 0.0)));
        let expected = (Pt2D::new(4.0, 5.0) - Pt2D::new(0.0, 0.0)).normalize().unwrap();
        assert!((start.normal.dot(expected) - 1.0).abs() < 1e-9);
        // The middle vertex uses the road's normal
        assert!((targets[2].normal.dot(Vec2D::new(0.0, 1.0)).abs() - 1.0).abs() < 1e-9);

        let mismatch = EntranceCandidate {
            building: anchor.clone(),
            target: targets[0].clone(),
            target_is_road: true,
            target_connected: true,
        }
        .mismatch();
        assert!(mismatch.abs() < 1e-9);
    }
}
