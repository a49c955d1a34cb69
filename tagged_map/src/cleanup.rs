use std::collections::BTreeSet;

use anyhow::Result;

use geom::{Distance, Line};
use maputil::{prettyprint_usize, Timer};

use crate::{NodeID, TaggedMap, WayID};

impl TaggedMap {
    /// Collapses runs of the same node repeated consecutively. Returns true if anything changed.
    pub fn remove_duplicate_nodes(&mut self, id: WayID) -> Result<bool> {
        let mut nodes = self.get_way(id)?.nodes.clone();
        let before = nodes.len();
        nodes.dedup();
        if nodes.len() == before {
            return Ok(false);
        }
        let mut edit = self.edit();
        edit.set_way_nodes(id, nodes)?;
        edit.commit()?;
        Ok(true)
    }

    /// Keeps only the largest cluster of ways reachable from some road, deleting every other
    /// cluster along with nodes nobody else uses. Returns the number of deleted ways.
    pub fn remove_disconnected_roads(&mut self, timer: &mut Timer) -> Result<usize> {
        timer.start("remove disconnected roads");
        let mut remaining: BTreeSet<WayID> = self
            .ways
            .iter()
            .filter(|(_, w)| w.kind.is_road())
            .map(|(id, _)| *id)
            .collect();
        let road_count = remaining.len();

        let mut clusters: Vec<BTreeSet<WayID>> = Vec::new();
        while let Some(start) = remaining.iter().next().cloned() {
            let cluster = self.connected_ways(start);
            for id in &cluster {
                remaining.remove(id);
            }
            clusters.push(cluster);
        }
        let largest_idx = match clusters
            .iter()
            .enumerate()
            .max_by_key(|(idx, c)| (c.len(), std::cmp::Reverse(*idx)))
        {
            Some((idx, _)) => idx,
            None => {
                timer.stop("remove disconnected roads");
                return Ok(0);
            }
        };
        let largest_roads = clusters[largest_idx]
            .iter()
            .filter(|id| self.ways[id].kind.is_road())
            .count();
        if (largest_roads as f64) < (road_count as f64) * 0.7 {
            timer.warn(format!(
                "The largest cluster only has {} of {} roads; there are probably large disconnected pieces",
                prettyprint_usize(largest_roads),
                prettyprint_usize(road_count)
            ));
        }

        let mut doomed: BTreeSet<WayID> = BTreeSet::new();
        for (idx, cluster) in clusters.into_iter().enumerate() {
            if idx != largest_idx {
                doomed.extend(cluster);
            }
        }
        let removed = self.remove_ways_with_nodes(&doomed)?;
        timer.note(format!(
            "Removed {} ways disconnected from the main road network",
            prettyprint_usize(removed)
        ));
        timer.stop("remove disconnected roads");
        Ok(removed)
    }

    fn remove_ways_with_nodes(&mut self, doomed: &BTreeSet<WayID>) -> Result<usize> {
        let mut orphans: BTreeSet<NodeID> = BTreeSet::new();
        for id in doomed {
            for n in &self.ways[id].nodes {
                if self.ways_at_node(*n).iter().all(|w| doomed.contains(w)) {
                    orphans.insert(*n);
                }
            }
        }
        let mut edit = self.edit();
        for id in doomed {
            edit.remove_way(*id);
        }
        for n in orphans {
            edit.remove_node(n);
        }
        edit.commit()?;
        Ok(doomed.len())
    }

    /// Roads and buildings whose geometry overlaps something it shouldn't. Two areas overlap if
    /// their outlines cross. A road centerline overlaps if it, or either of its kerbs, crosses a
    /// road or building segment that it doesn't share a node with.
    pub fn find_overlaps(&self) -> BTreeSet<WayID> {
        let mut result = BTreeSet::new();
        for (id, way) in &self.ways {
            let overlapping = if way.kind.is_area() {
                self.area_overlaps(*id)
            } else if way.kind.is_centerline() {
                self.road_overlaps(*id, Distance::ZERO)
                    || way
                        .kind
                        .width()
                        .map(|w| self.road_overlaps(*id, w))
                        .unwrap_or(false)
            } else {
                false
            };
            if overlapping {
                warn!("{} is overlapping", id);
                result.insert(*id);
            }
        }
        result
    }

    fn area_overlaps(&self, id: WayID) -> bool {
        let lines = match self.way_lines(id) {
            Ok(lines) => lines,
            Err(_) => return false,
        };
        let bounds = match self.way_bounds(id) {
            Ok(b) => b,
            Err(_) => return false,
        };
        for other in self.ways_touching(&bounds) {
            if other == id || !self.ways[&other].kind.is_area() {
                continue;
            }
            let other_lines = match self.way_lines(other) {
                Ok(lines) => lines,
                Err(_) => continue,
            };
            for (_, _, l1) in &lines {
                if line_crosses_way(l1, &other_lines) {
                    return true;
                }
            }
        }
        false
    }

    fn road_overlaps(&self, id: WayID, width: Distance) -> bool {
        let lines = match self.way_lines(id) {
            Ok(lines) => lines,
            Err(_) => return false,
        };
        let mut bounds = match self.way_bounds(id) {
            Ok(b) => b,
            Err(_) => return false,
        };
        let half = width.inner_meters() / 2.0;
        bounds.min_x -= half;
        bounds.min_y -= half;
        bounds.max_x += half;
        bounds.max_y += half;
        let others: Vec<WayID> = self
            .ways_touching(&bounds)
            .into_iter()
            .filter(|w| *w != id && self.ways[w].kind.is_relevant())
            .collect();

        for (a1, b1, line) in &lines {
            let probes: Vec<Line> = if width == Distance::ZERO {
                vec![*line]
            } else {
                vec![line.shift_left(width / 2.0), line.shift_left(-width / 2.0)]
            };
            for other in &others {
                let other_lines = match self.way_lines(*other) {
                    Ok(lines) => lines,
                    Err(_) => continue,
                };
                for (a2, b2, l2) in &other_lines {
                    if a1 == a2 || a1 == b2 || b1 == a2 || b1 == b2 {
                        continue;
                    }
                    if probes.iter().any(|p| p.intersects(l2)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Deletes a connector way created for an entrance. Autogenerated endpoints are also removed
    /// from the ways they were inserted into, unless another entrance still uses them.
    pub fn remove_entrance(&mut self, id: WayID) -> Result<()> {
        let way = self.get_way(id)?.clone();
        if !way.is_entrance() {
            bail!("{} isn't an entrance", id);
        }
        let doomed: Vec<NodeID> = way
            .nodes
            .iter()
            .filter(|n| {
                self.nodes[*n].tags.is("rcr:autogenerated", "entrance")
                    && !self
                        .ways_at_node(**n)
                        .iter()
                        .any(|w| *w != id && self.ways[w].is_entrance())
            })
            .cloned()
            .collect();

        let mut edit = self.edit();
        edit.remove_way(id);
        for n in doomed {
            edit.remove_node(n);
        }
        edit.commit()?;
        Ok(())
    }
}

/// True if the segment crosses some segment of the way, ignoring segments that either end of
/// the line touches.
pub fn line_crosses_way(line: &Line, way_lines: &[(NodeID, NodeID, Line)]) -> bool {
    way_lines.iter().any(|(_, _, l2)| {
        !l2.contains_pt(line.pt1()) && !l2.contains_pt(line.pt2()) && line.intersects(l2)
    })
}

#[cfg(test)]
mod tests {
    use geom::Pt2D;
    use maputil::Tags;

    use super::*;
    use crate::MapBuilder;

    #[test]
    fn duplicate_nodes() {
        let mut b = MapBuilder::new();
        let n1 = b.node(0.0, 0.0);
        let n2 = b.node(5.0, 0.0);
        let n3 = b.node(10.0, 0.0);
        let mut edit = b.map.edit();
        let road = edit.add_way(
            vec![n1, n2, n2, n3],
            vec![("rcr:type", "road")].into_iter().collect(),
        );
        edit.commit().unwrap();

        assert!(b.map.remove_duplicate_nodes(road).unwrap());
        assert_eq!(b.map.get_way(road).unwrap().nodes, vec![n1, n2, n3]);
        assert!(!b.map.remove_duplicate_nodes(road).unwrap());
    }

    #[test]
    fn disconnected_clusters() {
        let mut b = MapBuilder::new();
        let main1 = b.road(&[(0.0, 0.0), (50.0, 0.0)], "6000");
        let main2 = b.road(&[(50.0, 0.0), (50.0, 50.0)], "6000");
        let main3 = b.road(&[(50.0, 50.0), (0.0, 50.0)], "6000");
        let stray = b.road(&[(300.0, 0.0), (350.0, 0.0)], "6000");
        let stray_bldg = b.way(
            &[(350.0, 0.0), (360.0, 0.0), (360.0, 10.0), (350.0, 0.0)],
            vec![("rcr:type", "building")],
        );
        let stray_node = b.node(300.0, 0.0);

        let removed = b.map.remove_disconnected_roads(&mut Timer::throwaway()).unwrap();
        assert_eq!(removed, 2);
        for id in [main1, main2, main3] {
            assert!(b.map.get_way(id).is_ok());
        }
        assert!(b.map.get_way(stray).is_err());
        assert!(b.map.get_way(stray_bldg).is_err());
        assert!(b.map.get_node(stray_node).is_err());
    }

    #[test]
    fn overlaps() {
        let mut b = MapBuilder::new();
        let bldg1 = b.building(0.0, 0.0, 10.0, 10.0);
        let bldg2 = b.building(5.0, 5.0, 15.0, 15.0);
        let fine = b.building(30.0, 0.0, 40.0, 10.0);
        // 12m wide road 5m away from `fine`: its kerb clips the building
        let road = b.road(&[(45.0, -20.0), (45.0, 20.0)], "12000");
        let overlaps = b.map.find_overlaps();
        assert!(overlaps.contains(&bldg1));
        assert!(overlaps.contains(&bldg2));
        assert!(overlaps.contains(&road));
        assert!(!overlaps.contains(&fine));
    }

    #[test]
    fn entrance_removal() {
        let mut b = MapBuilder::new();
        let road = b.road(&[(0.0, 0.0), (20.0, 0.0)], "6000");
        let bldg = b.building(5.0, 5.0, 15.0, 15.0);
        let (r1, r2) = (b.node(0.0, 0.0), b.node(20.0, 0.0));
        let (c1, c2) = (b.node(5.0, 5.0), b.node(15.0, 5.0));

        let mut edit = b.map.edit();
        let mut auto_tags = Tags::empty();
        auto_tags.insert("rcr:autogenerated", "entrance");
        let on_road = edit.add_node(Pt2D::new(10.0, 0.0), auto_tags.clone());
        let on_wall = edit.add_node(Pt2D::new(10.0, 5.0), auto_tags);
        edit.split_segment(road, (r1, r2), on_road);
        edit.split_segment(bldg, (c1, c2), on_wall);
        let entrance = edit.add_way(
            vec![on_wall, on_road],
            vec![("rcr:type", "road"), ("rcr:entrance", "yes"), ("rcr:width", "3000")]
                .into_iter()
                .collect(),
        );
        edit.commit().unwrap();
        assert_eq!(b.map.get_way(road).unwrap().nodes.len(), 3);

        assert!(b.map.remove_entrance(road).is_err());
        b.map.remove_entrance(entrance).unwrap();
        assert!(b.map.get_way(entrance).is_err());
        assert_eq!(b.map.get_way(road).unwrap().nodes, vec![r1, r2]);
        assert_eq!(b.map.get_way(bldg).unwrap().nodes.len(), 5);
        assert!(b.map.get_node(on_road).is_err());
    }

    #[test]
    fn shared_entrance_node_survives() {
        let mut b = MapBuilder::new();
        let road = b.road(&[(0.0, 0.0), (20.0, 0.0)], "6000");
        let north = b.building(5.0, 5.0, 15.0, 15.0);
        let south = b.building(5.0, -15.0, 15.0, -5.0);
        let (r1, r2) = (b.node(0.0, 0.0), b.node(20.0, 0.0));
        let north_door = b.node(5.0, 5.0);
        let south_door = b.node(5.0, -5.0);

        let connector = || -> Tags {
            vec![("rcr:type", "road"), ("rcr:entrance", "yes"), ("rcr:width", "3000")]
                .into_iter()
                .collect()
        };
        let mut edit = b.map.edit();
        let mut auto_tags = Tags::empty();
        auto_tags.insert("rcr:autogenerated", "entrance");
        let on_road = edit.add_node(Pt2D::new(5.0, 0.0), auto_tags);
        edit.split_segment(road, (r1, r2), on_road);
        let first = edit.add_way(vec![north_door, on_road], connector());
        let second = edit.add_way(vec![south_door, on_road], connector());
        edit.commit().unwrap();

        // The other connector still ends on the road node
        b.map.remove_entrance(first).unwrap();
        assert_eq!(b.map.get_way(road).unwrap().nodes, vec![r1, on_road, r2]);
        assert!(b.map.get_node(on_road).is_ok());
        // Corners of the buildings were never autogenerated
        assert_eq!(b.map.get_way(north).unwrap().nodes.len(), 5);

        b.map.remove_entrance(second).unwrap();
        assert_eq!(b.map.get_way(road).unwrap().nodes, vec![r1, r2]);
        assert!(b.map.get_node(on_road).is_err());
        assert_eq!(b.map.get_way(south).unwrap().nodes.len(), 5);
    }
}
