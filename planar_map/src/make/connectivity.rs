use std::collections::{BTreeMap, BTreeSet, VecDeque};

use anyhow::Result;
use petgraph::graphmap::UnGraphMap;

use maputil::{prettyprint_usize, Timer};

use crate::{EdgeID, MapError, PlanarMap, ShapeID};

impl PlanarMap {
    /// An edge is passable if it separates exactly two shapes and one of them is a road.
    pub(crate) fn compute_passability(&mut self) {
        let ids: Vec<EdgeID> = self.edges.keys().cloned().collect();
        for id in ids {
            let shapes: Vec<ShapeID> = self.edge_shapes.get(id).iter().cloned().collect();
            let passable = shapes.len() == 2
                && shapes.iter().any(|s| self.shapes[s].kind.is_road());
            if passable {
                self.open_edge(id, shapes[0], shapes[1]);
            } else {
                if let Some(edge) = self.edges.get_mut(&id) {
                    edge.passable = false;
                }
                for s in shapes {
                    self.set_neighbour(s, id, None);
                }
            }
        }
    }

    fn open_edge(&mut self, id: EdgeID, s1: ShapeID, s2: ShapeID) {
        if let Some(edge) = self.edges.get_mut(&id) {
            edge.passable = true;
        }
        self.set_neighbour(s1, id, Some(s2));
        self.set_neighbour(s2, id, Some(s1));
    }

    fn set_neighbour(&mut self, shape: ShapeID, edge: EdgeID, neighbour: Option<ShapeID>) {
        if let Some(shape) = self.shapes.get_mut(&shape) {
            for de in &mut shape.edges {
                if de.edge == edge {
                    de.neighbour = neighbour;
                }
            }
        }
    }

    /// Every shape reachable from `start` by crossing passable edges, including itself.
    pub fn connected_shapes(&self, start: ShapeID) -> BTreeSet<ShapeID> {
        let mut result = BTreeSet::new();
        result.insert(start);
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(current) = queue.pop_front() {
            for de in &self.shapes[&current].edges {
                if let Some(next) = de.neighbour {
                    if result.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        result
    }

    /// Every group of shapes connected by passable edges, largest first. Ties are broken by the
    /// smallest shape ID in each group.
    pub fn connected_groups(&self) -> Vec<BTreeSet<ShapeID>> {
        let mut graph: UnGraphMap<ShapeID, ()> = UnGraphMap::new();
        for shape in self.shapes.values() {
            graph.add_node(shape.id);
            for de in &shape.edges {
                if let Some(other) = de.neighbour {
                    graph.add_edge(shape.id, other, ());
                }
            }
        }
        let mut groups: Vec<BTreeSet<ShapeID>> = petgraph::algo::kosaraju_scc(&graph)
            .into_iter()
            .map(|component| component.into_iter().collect())
            .collect();
        groups.sort_by_key(|g| (std::cmp::Reverse(g.len()), g.iter().next().cloned()));
        groups
    }

    pub(crate) fn find_main_group(&mut self) {
        self.main_group = self.connected_groups().into_iter().next().unwrap_or_default();
    }

    /// Opens up walls so that every building outside the main group can reach it, taking the
    /// path through the fewest shapes. Buildings that don't share an edge with anything leading
    /// to the main group are left alone with a warning.
    pub(crate) fn repair(&mut self, timer: &mut Timer) -> Result<()> {
        let stranded: Vec<ShapeID> = self
            .shapes
            .values()
            .filter(|s| s.kind.is_building() && !self.main_group.contains(&s.id))
            .map(|s| s.id)
            .collect();
        if stranded.is_empty() {
            return Ok(());
        }
        // Without any edges there's nothing to open up
        if self.edges.is_empty() {
            return Err(MapError::UnreachableShape(stranded[0]).into());
        }

        timer.start_iter("connect stranded buildings", stranded.len());
        let mut repaired = 0;
        for building in stranded {
            timer.next();
            if self.main_group.contains(&building) {
                continue;
            }
            match self.path_to_main_group(building) {
                Some(path) => {
                    self.open_path(&path);
                    repaired += 1;
                }
                None => {
                    timer.warn(format!(
                        "{} doesn't share an edge with anything leading to the main group",
                        building
                    ));
                }
            }
        }
        timer.note(format!(
            "Opened paths from {} stranded buildings to the main group",
            prettyprint_usize(repaired)
        ));
        Ok(())
    }

    /// The shapes walked through from `start` to the nearest shape in the main group, ignoring
    /// whether edges are passable.
    fn path_to_main_group(&self, start: ShapeID) -> Option<Vec<ShapeID>> {
        let mut parents: BTreeMap<ShapeID, ShapeID> = BTreeMap::new();
        let mut visited = BTreeSet::new();
        visited.insert(start);
        let mut queue = VecDeque::new();
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            for de in &self.shapes[&current].edges {
                for next in self.edge_shapes.get(de.edge) {
                    if !visited.insert(*next) {
                        continue;
                    }
                    parents.insert(*next, current);
                    if self.main_group.contains(next) {
                        let mut path = vec![*next];
                        let mut at = *next;
                        while let Some(parent) = parents.get(&at) {
                            path.push(*parent);
                            at = *parent;
                        }
                        path.reverse();
                        return Some(path);
                    }
                    queue.push_back(*next);
                }
            }
        }
        None
    }

    fn open_path(&mut self, path: &[ShapeID]) {
        for shape in path {
            if !self.main_group.contains(shape) {
                let group = self.connected_shapes(*shape);
                self.main_group.extend(group);
            }
        }
        for pair in path.windows(2) {
            let shared = self.shapes[&pair[0]]
                .edges
                .iter()
                .map(|de| de.edge)
                .find(|e| self.edge_shapes.get(*e).contains(&pair[1]));
            if let Some(edge) = shared {
                debug!("Opening {} between {} and {}", edge, pair[0], pair[1]);
                self.open_edge(edge, pair[0], pair[1]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Shape, ShapeKind};

    #[test]
    fn nothing_to_repair_with() {
        let mut map = PlanarMap::blank();
        for id in [ShapeID(0), ShapeID(1)] {
            map.shapes.insert(
                id,
                Shape {
                    id,
                    kind: ShapeKind::Building { floors: 1, code: 0 },
                    source: None,
                    edges: Vec::new(),
                },
            );
        }
        map.find_main_group();
        assert_eq!(map.main_group().len(), 1);
        let err = map.repair(&mut Timer::throwaway()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<MapError>(),
            Some(&MapError::UnreachableShape(ShapeID(1)))
        );
    }
}
