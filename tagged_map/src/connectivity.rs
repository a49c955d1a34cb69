use std::collections::{BTreeSet, VecDeque};

use petgraph::graphmap::UnGraphMap;

use crate::{TaggedMap, WayID, WayKind};

impl TaggedMap {
    /// Roads and buildings directly linked to this way. A road centerline links to every
    /// relevant way it shares a node with. Two areas only link when they share a whole edge.
    pub fn neighbours(&self, id: WayID) -> BTreeSet<WayID> {
        let mut result = BTreeSet::new();
        let way = match self.ways.get(&id) {
            Some(w) => w,
            None => return result,
        };
        for n in &way.nodes {
            for other_id in self.ways_at_node(*n) {
                if *other_id == id {
                    continue;
                }
                let other = &self.ways[other_id];
                if !other.kind.is_relevant() {
                    continue;
                }
                if other.kind.is_centerline()
                    || way.kind.is_centerline()
                    || ways_share_edge(&way.nodes, &other.nodes)
                {
                    result.insert(*other_id);
                }
            }
        }
        result
    }

    /// Everything reachable from this way through `neighbours`, including itself.
    pub fn connected_ways(&self, start: WayID) -> BTreeSet<WayID> {
        let mut result = BTreeSet::new();
        result.insert(start);
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(current) = queue.pop_front() {
            for next in self.neighbours(current) {
                if result.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        result
    }

    /// Every connected group of roads and buildings, largest first. Ties are broken by the
    /// smallest way ID in each group.
    pub fn connected_groups(&self) -> Vec<BTreeSet<WayID>> {
        let mut graph: UnGraphMap<WayID, ()> = UnGraphMap::new();
        for (id, way) in &self.ways {
            if !way.kind.is_relevant() {
                continue;
            }
            graph.add_node(*id);
            for other in self.neighbours(*id) {
                graph.add_edge(*id, other, ());
            }
        }
        let mut groups: Vec<BTreeSet<WayID>> = petgraph::algo::kosaraju_scc(&graph)
            .into_iter()
            .map(|component| component.into_iter().collect())
            .collect();
        groups.sort_by_key(|g| (std::cmp::Reverse(g.len()), g.iter().next().cloned()));
        groups
    }

    /// The main network. Empty if there are no roads or buildings at all.
    pub fn largest_connected_group(&self) -> BTreeSet<WayID> {
        self.connected_groups().into_iter().next().unwrap_or_default()
    }

    /// Roads and buildings outside the main network.
    pub fn unconnected_ways(&self) -> BTreeSet<WayID> {
        let main = self.largest_connected_group();
        self.ways
            .iter()
            .filter(|(id, way)| way.kind.is_relevant() && !main.contains(id))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Buildings that don't directly touch a road belonging to the main network.
    pub fn buildings_without_road_access(&self) -> BTreeSet<WayID> {
        let main = self.largest_connected_group();
        self.ways
            .iter()
            .filter(|(_, way)| way.kind.is_building())
            .filter(|(id, _)| {
                !self
                    .neighbours(**id)
                    .into_iter()
                    .any(|n| self.ways[&n].kind.is_road() && main.contains(&n))
            })
            .map(|(id, _)| *id)
            .collect()
    }

    /// Buildings reachable from this one by shared walls alone, including itself.
    pub fn attached_buildings(&self, start: WayID) -> BTreeSet<WayID> {
        let mut result = BTreeSet::new();
        result.insert(start);
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(current) = queue.pop_front() {
            for next in self.neighbours(current) {
                if matches!(self.ways[&next].kind, WayKind::Building { .. }) && result.insert(next)
                {
                    queue.push_back(next);
                }
            }
        }
        result
    }
}

fn ways_share_edge(nodes1: &[crate::NodeID], nodes2: &[crate::NodeID]) -> bool {
    for p1 in nodes1.windows(2) {
        for p2 in nodes2.windows(2) {
            if (p1[0] == p2[0] && p1[1] == p2[1]) || (p1[0] == p2[1] && p1[1] == p2[0]) {
                return true;
            }
        }
    }
    false
}
