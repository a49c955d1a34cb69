//! Places short road connectors ("entrances") between buildings and whatever is nearby, so
//! buildings that don't touch a road become reachable.
//!
//! For a building, candidate connectors start at its marked entrance nodes and at the middle of
//! every long enough wall. Each is extended to every nearby road and building: straight across
//! to each segment, and for roads, to each vertex. The candidates are ranked, then checked in
//! order until one doesn't cross anything; that one is written back into the map.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use anyhow::Result;

use geom::Line;
use maputil::{prettyprint_usize, Timer};
use tagged_map::{TaggedMap, WayID};

use crate::EntranceOptions;

pub use self::candidates::{EntranceCandidate, EntranceEndpoint};
pub use self::ranking::RankingStage;

mod candidates;
mod materialize;
mod ranking;
mod validation;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntranceMode {
    /// Only connect to roads
    RoadsOnly,
    /// Connect to roads or other buildings
    Any,
}

/// An entrance accepted earlier in this run.
#[derive(Clone, Debug)]
struct PlannedEntrance {
    building: WayID,
    target: WayID,
    /// Where the connector was built, after snapping its ends
    line: Line,
}

/// Searches for and creates entrances. One generator is meant for one pass over a map: it
/// remembers the entrances it created and caches which buildings share walls, so create a new
/// one after editing the map some other way.
pub struct EntranceGenerator {
    opts: EntranceOptions,
    stages: Vec<RankingStage>,
    main_group: BTreeSet<WayID>,
    planned: Vec<PlannedEntrance>,
    attached: BTreeMap<WayID, BTreeSet<WayID>>,
}

impl EntranceGenerator {
    pub fn new(map: &TaggedMap, opts: EntranceOptions) -> EntranceGenerator {
        EntranceGenerator {
            opts,
            stages: RankingStage::all(),
            main_group: map.largest_connected_group(),
            planned: Vec::new(),
            attached: BTreeMap::new(),
        }
    }

    /// Overrides the order candidates are ranked in.
    pub fn with_stages(mut self, stages: Vec<RankingStage>) -> EntranceGenerator {
        self.stages = stages;
        self
    }

    pub fn options(&self) -> &EntranceOptions {
        &self.opts
    }

    /// Every entrance this building could get, best first, before checking for crossings.
    pub fn ranked_candidates(
        &mut self,
        map: &TaggedMap,
        building: WayID,
    ) -> Result<Vec<EntranceCandidate>> {
        if !map.get_way(building)?.kind.is_building() {
            bail!("{} isn't a building", building);
        }
        let mut candidates = self.find_candidates(map, building)?;
        ranking::rank(&mut candidates, &self.stages, &self.opts);
        Ok(candidates)
    }

    /// The best entrance for the building that doesn't cross anything, without changing the
    /// map.
    pub fn find_entrance(
        &mut self,
        map: &TaggedMap,
        building: WayID,
        mode: EntranceMode,
    ) -> Result<Option<EntranceCandidate>> {
        for candidate in self.ranked_candidates(map, building)? {
            if self.is_valid(map, &candidate, mode) {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Finds the best entrance for the building and adds it to the map. Returns the new
    /// connector way, or None if nothing suitable was found.
    pub fn place_entrance(
        &mut self,
        map: &mut TaggedMap,
        building: WayID,
        mode: EntranceMode,
    ) -> Result<Option<WayID>> {
        let candidate = match self.find_entrance(map, building, mode)? {
            Some(c) => c,
            None => {
                info!("No valid entrance for {}", building);
                return Ok(None);
            }
        };
        let (way, line) = match self.materialize(map, &candidate, mode)? {
            Some(result) => result,
            None => return Ok(None),
        };
        self.planned.push(PlannedEntrance {
            building,
            target: candidate.target.way,
            line,
        });
        Ok(Some(way))
    }

    /// Places an entrance for every building that can't reach a road in the main network
    /// directly. Buildings already connected some other way only get roads as targets.
    pub fn generate_all(&mut self, map: &mut TaggedMap, timer: &mut Timer) -> Result<Vec<WayID>> {
        timer.start("generate entrances");
        let buildings: Vec<WayID> = map.buildings_without_road_access().into_iter().collect();
        timer.start_iter("place entrances", buildings.len());
        let mut created = Vec::new();
        let mut failed = 0;
        for building in buildings {
            timer.next();
            let mode = if self.main_group.contains(&building) {
                EntranceMode::RoadsOnly
            } else {
                EntranceMode::Any
            };
            match self.place_entrance(map, building, mode)? {
                Some(way) => created.push(way),
                None => failed += 1,
            }
        }
        timer.note(format!(
            "Placed {} entrances; {} buildings have no valid entrance",
            prettyprint_usize(created.len()),
            prettyprint_usize(failed)
        ));
        timer.stop("generate entrances");
        Ok(created)
    }

    /// Creates a connector between two existing nodes on the outlines of two different
    /// buildings. Returns None if the nodes aren't on two distinct buildings.
    pub fn connect_building_nodes(
        &mut self,
        map: &mut TaggedMap,
        n1: tagged_map::NodeID,
        n2: tagged_map::NodeID,
    ) -> Result<Option<WayID>> {
        let buildings_at = |n| -> Result<Vec<WayID>> {
            let mut result = Vec::new();
            for w in map.ways_at_node(n) {
                if map.get_way(*w)?.kind.is_building() {
                    result.push(*w);
                }
            }
            Ok(result)
        };
        let b1 = buildings_at(n1)?;
        let b2 = buildings_at(n2)?;
        let pair = b1
            .iter()
            .flat_map(|a| b2.iter().map(move |b| (*a, *b)))
            .find(|(a, b)| a != b);
        let (building, target) = match pair {
            Some(pair) => pair,
            None => return Ok(None),
        };
        let line = match Line::maybe_new(map.pt(n1)?, map.pt(n2)?) {
            Some(l) => l,
            None => return Ok(None),
        };

        let mut edit = map.edit();
        let way = edit.add_way(vec![n1, n2], materialize::connector_tags(&self.opts));
        edit.commit()?;
        self.planned.push(PlannedEntrance {
            building,
            target,
            line,
        });
        Ok(Some(way))
    }

    /// Buildings sharing walls with this one, directly or indirectly, including itself.
    fn attached_buildings(&mut self, map: &TaggedMap, building: WayID) -> BTreeSet<WayID> {
        self.attached
            .entry(building)
            .or_insert_with(|| map.attached_buildings(building))
            .clone()
    }

    /// True if the way can reach the main network, through the map itself or through
    /// entrances planned so far.
    fn is_connected(&self, map: &TaggedMap, start: WayID) -> bool {
        let mut visited = BTreeSet::new();
        visited.insert(start);
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(current) = queue.pop_front() {
            if self.main_group.contains(&current) {
                return true;
            }
            let mut next: Vec<WayID> = map.neighbours(current).into_iter().collect();
            for p in &self.planned {
                if p.building == current {
                    next.push(p.target);
                }
                if p.target == current {
                    next.push(p.building);
                }
            }
            for w in next {
                if visited.insert(w) {
                    queue.push_back(w);
                }
            }
        }
        false
    }
}
