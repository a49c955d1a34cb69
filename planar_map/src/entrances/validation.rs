use geom::Distance;
use tagged_map::{line_crosses_way, TaggedMap};

use super::{EntranceCandidate, EntranceGenerator, EntranceMode};

/// Planned entrances are checked against a copy of the new line trimmed by this much at both
/// ends, so two connectors sharing an endpoint don't count as crossing.
const PLANNED_ENTRANCE_TRIM: Distance = Distance::const_meters(0.01);

impl EntranceGenerator {
    /// True if the candidate can be built without cutting through anything.
    pub(crate) fn is_valid(
        &self,
        map: &TaggedMap,
        candidate: &EntranceCandidate,
        mode: EntranceMode,
    ) -> bool {
        if mode == EntranceMode::RoadsOnly && !candidate.target_is_road {
            return false;
        }
        let line = match candidate.line() {
            Some(l) => l,
            None => return false,
        };
        let own = candidate.building.way;

        for way in map.ways_touching(&line.get_bounds()) {
            let kind = match map.get_way(way) {
                Ok(w) => w.kind,
                Err(_) => continue,
            };
            if !kind.is_relevant() {
                continue;
            }
            let crosses = match map.way_lines(way) {
                Ok(lines) => line_crosses_way(&line, &lines),
                Err(_) => false,
            };
            if crosses {
                debug!("Entrance from {} at {} crosses {}", own, line.pt1(), way);
                return false;
            }
            if kind.is_building() && way != own {
                if let Some(ring) = map.way_ring(way) {
                    if ring.contains_line(&line) {
                        debug!("Entrance from {} at {} is inside {}", own, line.pt1(), way);
                        return false;
                    }
                }
            }
        }

        let trimmed = line.shortened(PLANNED_ENTRANCE_TRIM).unwrap_or(line);
        if let Some(other) = self.planned.iter().find(|p| trimmed.intersects(&p.line)) {
            debug!(
                "Entrance from {} at {} crosses the earlier entrance from {}",
                own,
                line.pt1(),
                other.building
            );
            return false;
        }

        // Concave buildings can have candidates running back through their own interior
        if let Some(ring) = map.way_ring(own) {
            if ring.contains_line(&trimmed) {
                debug!("Entrance from {} at {} runs through itself", own, line.pt1());
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use geom::Pt2D;
    use tagged_map::{MapBuilder, WayID};

    use super::*;
    use crate::{EntranceEndpoint, EntranceOptions};

    fn candidate(
        building: WayID,
        from: (f64, f64),
        target: WayID,
        to: (f64, f64),
    ) -> EntranceCandidate {
        let endpoint = |way, (x, y): (f64, f64)| EntranceEndpoint {
            way,
            pt: Pt2D::new(x, y),
            node: None,
            normal: geom::Vec2D::new(0.0, 1.0),
            marked: false,
        };
        EntranceCandidate {
            building: endpoint(building, from),
            target: endpoint(target, to),
            target_is_road: true,
            target_connected: true,
        }
    }

    #[test]
    fn crossings() {
        let mut b = MapBuilder::new();
        let road = b.road(&[(-20.0, 0.0), (20.0, 0.0)], "4000");
        let house = b.building(-5.0, 10.0, 5.0, 20.0);
        let shed = b.building(-2.0, 4.0, 2.0, 6.0);
        let gen = EntranceGenerator::new(&b.map, EntranceOptions::default());

        // Straight down through the shed
        let blocked = candidate(house, (0.0, 10.0), road, (0.0, 0.0));
        assert!(!gen.is_valid(&b.map, &blocked, EntranceMode::Any));
        // Down from the corner, past the shed
        let clear = candidate(house, (-5.0, 10.0), road, (-5.0, 0.0));
        assert!(gen.is_valid(&b.map, &clear, EntranceMode::Any));

        let mut to_shed = candidate(house, (0.0, 10.0), shed, (0.0, 6.0));
        to_shed.target_is_road = false;
        assert!(gen.is_valid(&b.map, &to_shed, EntranceMode::Any));
        assert!(!gen.is_valid(&b.map, &to_shed, EntranceMode::RoadsOnly));
    }

    #[test]
    fn concave_building() {
        let mut b = MapBuilder::new();
        // A U shape, open to the top
        let u = b.building_pts(&[
            (0.0, 0.0),
            (30.0, 0.0),
            (30.0, 20.0),
            (20.0, 20.0),
            (20.0, 10.0),
            (10.0, 10.0),
            (10.0, 20.0),
            (0.0, 20.0),
        ]);
        let road = b.road(&[(-10.0, 30.0), (40.0, 30.0)], "4000");
        let gen = EntranceGenerator::new(&b.map, EntranceOptions::default());

        // From the bottom wall straight through the building
        let through = candidate(u, (15.0, 0.0), road, (15.0, 30.0));
        assert!(!gen.is_valid(&b.map, &through, EntranceMode::Any));
        // From the inner wall of the U
        let out = candidate(u, (15.0, 10.0), road, (15.0, 30.0));
        assert!(gen.is_valid(&b.map, &out, EntranceMode::Any));
        // Running along the inside, between two walls of the building
        let inside = candidate(u, (5.0, 0.0), u, (5.0, 20.0));
        assert!(!gen.is_valid(&b.map, &inside, EntranceMode::Any));
    }
}
