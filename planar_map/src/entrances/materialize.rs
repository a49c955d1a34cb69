use anyhow::Result;

use geom::{Line, Pt2D, EPSILON_DIST};
use maputil::Tags;
use tagged_map::{MapEdit, NodeID, TaggedMap, WayID, AUTOGENERATED_ENTRANCE_TAGS};

use super::{EntranceCandidate, EntranceGenerator, EntranceMode};
use crate::{EntranceOptions, MapError};

/// Where one end of a connector will attach.
enum Attachment {
    Existing(NodeID),
    /// A new node inserted into the way between the two nodes of the segment.
    Split {
        way: WayID,
        segment: (NodeID, NodeID),
        pt: Pt2D,
    },
}

impl Attachment {
    fn apply(self, edit: &mut MapEdit) -> NodeID {
        match self {
            Attachment::Existing(n) => n,
            Attachment::Split { way, segment, pt } => {
                let n = edit.add_node(pt, AUTOGENERATED_ENTRANCE_TAGS.iter().cloned().collect());
                edit.split_segment(way, segment, n);
                n
            }
        }
    }
}

pub(crate) fn connector_tags(opts: &EntranceOptions) -> Tags {
    let mut tags = Tags::empty();
    tags.insert("rcr:type", "road");
    tags.insert("rcr:entrance", "yes");
    tags.insert("rcr:width", opts.entrance_width_mm.to_string());
    tags
}

impl EntranceGenerator {
    /// Writes the candidate into the map as a connector road, reusing nearby nodes where possible.
    /// Returns the new way with the line it was actually built along, or None if both ends turn
    /// out to be the same node.
    pub(crate) fn materialize(
        &self,
        map: &mut TaggedMap,
        candidate: &EntranceCandidate,
        mode: EntranceMode,
    ) -> Result<Option<(WayID, Line)>> {
        if candidate.length().inner_meters() < EPSILON_DIST {
            return Ok(None);
        }
        let mut built = candidate.clone();
        let from = self.plan_attachment(map, &mut built, false, mode)?;
        let to = self.plan_attachment(map, &mut built, true, mode)?;
        if let (Attachment::Existing(n1), Attachment::Existing(n2)) = (&from, &to) {
            if n1 == n2 {
                return Ok(None);
            }
        }
        let line = match built.line() {
            Some(l) => l,
            None => return Ok(None),
        };

        let mut edit = map.edit();
        let n1 = from.apply(&mut edit);
        let n2 = to.apply(&mut edit);
        let way = edit.add_way(vec![n1, n2], connector_tags(&self.opts));
        edit.commit()?;
        info!(
            "Connected {} to {} with {}",
            candidate.building.way, candidate.target.way, way
        );
        Ok(Some((way, line)))
    }

    /// Decides how to attach one end of the candidate. An end on a segment snaps to the
    /// segment's closer node if it's within half the entrance width, the connector length stays
    /// within limits, and the moved connector still doesn't cross anything. Otherwise a new node
    /// is inserted. A snap updates the candidate, so the other end is planned against it.
    fn plan_attachment(
        &self,
        map: &TaggedMap,
        candidate: &mut EntranceCandidate,
        at_target: bool,
        mode: EntranceMode,
    ) -> Result<Attachment> {
        let (endpoint, other_end) = if at_target {
            (candidate.target.clone(), candidate.building.pt)
        } else {
            (candidate.building.clone(), candidate.target.pt)
        };
        if let Some(n) = endpoint.node {
            return Ok(Attachment::Existing(n));
        }

        let (a, b, line) = map
            .way_lines(endpoint.way)?
            .into_iter()
            .find(|(_, _, l)| l.contains_pt(endpoint.pt))
            .ok_or_else(|| {
                MapError::InconsistentTopology(format!(
                    "entrance endpoint {} isn't on {}",
                    endpoint.pt, endpoint.way
                ))
            })?;

        let mut ends = vec![(a, line.pt1()), (b, line.pt2())];
        ends.sort_by_key(|(_, pt)| pt.dist_to(endpoint.pt));
        for (n, pt) in ends {
            if pt.dist_to(endpoint.pt) > self.opts.entrance_width() / 2.0 {
                continue;
            }
            let length = pt.dist_to(other_end);
            if length < self.opts.min_length() || length > self.opts.max_length() {
                continue;
            }
            let mut snapped = candidate.clone();
            let end = if at_target {
                &mut snapped.target
            } else {
                &mut snapped.building
            };
            end.pt = pt;
            end.node = Some(n);
            if self.is_valid(map, &snapped, mode) {
                *candidate = snapped;
                return Ok(Attachment::Existing(n));
            }
            debug!("Not snapping the entrance from {} to {}", endpoint.way, n);
        }

        Ok(Attachment::Split {
            way: endpoint.way,
            segment: (a, b),
            pt: endpoint.pt,
        })
    }
}

#[cfg(test)]
mod tests {
    use geom::Vec2D;
    use tagged_map::{line_crosses_way, MapBuilder};

    use super::*;
    use crate::EntranceEndpoint;

    fn build(map: &mut TaggedMap, candidate: &EntranceCandidate) -> Result<Option<(WayID, Line)>> {
        let gen = EntranceGenerator::new(map, EntranceOptions::default());
        gen.materialize(map, candidate, EntranceMode::Any)
    }

    fn endpoint(way: WayID, x: f64, y: f64) -> EntranceEndpoint {
        EntranceEndpoint {
            way,
            pt: Pt2D::new(x, y),
            node: None,
            normal: Vec2D::new(0.0, 1.0),
            marked: false,
        }
    }

    #[test]
    fn snapping() {
        let mut b = MapBuilder::new();
        let road = b.road(&[(-20.0, 0.0), (20.0, 0.0)], "4000");
        let house = b.building(-5.0, 3.0, 5.0, 13.0);

        // 1m from the corner at (5, 3): snaps there on the building side
        let candidate = EntranceCandidate {
            building: endpoint(house, 4.0, 3.0),
            target: endpoint(road, 4.0, 0.0),
            target_is_road: true,
            target_connected: true,
        };
        let (way, line) = build(&mut b.map, &candidate).unwrap().unwrap();
        let nodes = b.map.get_way(way).unwrap().nodes.clone();
        assert_eq!(nodes[0], b.node(5.0, 3.0));
        assert_eq!(line.pt1(), Pt2D::new(5.0, 3.0));
        assert_eq!(b.map.pt(nodes[1]).unwrap(), Pt2D::new(4.0, 0.0));
        assert!(b.map.get_way(way).unwrap().is_entrance());
        // The road gained the new node
        assert_eq!(b.map.get_way(road).unwrap().nodes.len(), 3);
        assert!(b.map.get_node(nodes[1]).unwrap().tags.is("rcr:autogenerated", "entrance"));
        assert_eq!(b.map.get_way(house).unwrap().nodes.len(), 5);
    }

    #[test]
    fn snapping_keeps_the_length_in_bounds() {
        let mut b = MapBuilder::new();
        let road = b.road(&[(-20.0, 0.0), (20.0, 0.0)], "4000");
        // A corner sits right above the road, so snapping would make the connector too short
        let house = b.building_pts(&[(-5.0, 0.3), (0.0, 1.0), (5.0, 1.0), (5.0, 6.0), (-5.0, 6.0)]);

        let candidate = EntranceCandidate {
            building: endpoint(house, -4.0, 0.44),
            target: endpoint(road, -5.0, 0.0),
            target_is_road: true,
            target_connected: true,
        };
        let (way, _) = build(&mut b.map, &candidate).unwrap().unwrap();
        let nodes = b.map.get_way(way).unwrap().nodes.clone();
        assert_ne!(nodes[0], b.node(-5.0, 0.3));
        assert_eq!(b.map.get_way(house).unwrap().nodes.len(), 7);
    }

    #[test]
    fn off_the_way() {
        let mut b = MapBuilder::new();
        let road = b.road(&[(-20.0, 0.0), (20.0, 0.0)], "4000");
        let house = b.building(-5.0, 3.0, 5.0, 13.0);
        let candidate = EntranceCandidate {
            building: endpoint(house, 0.0, 2.0),
            target: endpoint(road, 0.0, 0.0),
            target_is_road: true,
            target_connected: true,
        };
        let err = build(&mut b.map, &candidate).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MapError>(),
            Some(MapError::InconsistentTopology(_))
        ));
    }

    /// A narrow house 3m above the road, with a shed below its east corner.
    fn house_over_shed() -> (MapBuilder, EntranceCandidate, WayID, WayID) {
        let mut b = MapBuilder::new();
        let road = b.road(&[(-20.0, 0.0), (20.0, 0.0)], "4000");
        let house = b.building_pts(&[(2.5, 3.0), (0.0, 3.0), (0.0, 10.0), (2.5, 10.0)]);
        let shed = b.building(1.6, 1.2, 2.2, 1.8);
        let candidate = EntranceCandidate {
            building: endpoint(house, 1.25, 3.0),
            target: endpoint(road, 1.25, 0.0),
            target_is_road: true,
            target_connected: true,
        };
        (b, candidate, house, shed)
    }

    #[test]
    fn snapping_never_crosses_anything() {
        // The east corner is blocked, so the west one is used
        let (mut b, candidate, _, shed) = house_over_shed();
        let (way, line) = build(&mut b.map, &candidate).unwrap().unwrap();
        let nodes = b.map.get_way(way).unwrap().nodes.clone();
        assert_eq!(nodes[0], b.node(0.0, 3.0));
        assert_eq!(line.pt1(), Pt2D::new(0.0, 3.0));
        assert!(!line_crosses_way(&line, &b.map.way_lines(shed).unwrap()));

        // With both corners blocked, a new node goes in the middle of the wall
        let (mut b, candidate, house, east_shed) = house_over_shed();
        let west_shed = b.building(0.3, 1.2, 0.9, 1.8);
        let (way, line) = build(&mut b.map, &candidate).unwrap().unwrap();
        let nodes = b.map.get_way(way).unwrap().nodes.clone();
        assert_eq!(b.map.pt(nodes[0]).unwrap(), Pt2D::new(1.25, 3.0));
        assert_eq!(line.pt1(), Pt2D::new(1.25, 3.0));
        assert_eq!(b.map.get_way(house).unwrap().nodes.len(), 6);
        for shed in [east_shed, west_shed] {
            assert!(!line_crosses_way(&line, &b.map.way_lines(shed).unwrap()));
        }
    }
}
