use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;

use geom::Pt2D;
use maputil::Tags;

use crate::{NodeID, RawNode, RawWay, TaggedMap, WayID, WayKind};

/// A transaction of structural changes to a `TaggedMap`. Commands are buffered and only applied
/// by `commit`; if any of them fails, the map is left exactly as it was.
pub struct MapEdit<'a> {
    map: &'a mut TaggedMap,
    commands: Vec<EditCmd>,
    next_node: i64,
    next_way: i64,
}

#[derive(Clone, Debug)]
enum EditCmd {
    AddNode {
        id: NodeID,
        node: RawNode,
    },
    /// Inserts `node` between two consecutive nodes of the way.
    SplitSegment {
        way: WayID,
        segment: (NodeID, NodeID),
        node: NodeID,
    },
    AddWay {
        id: WayID,
        nodes: Vec<NodeID>,
        tags: Tags,
    },
    RemoveWay(WayID),
    /// Removes the node from every way using it, then deletes it.
    RemoveNode(NodeID),
}

/// What a committed edit changed.
#[derive(Debug, Default, PartialEq)]
pub struct EditEffects {
    pub added_nodes: BTreeSet<NodeID>,
    pub removed_nodes: BTreeSet<NodeID>,
    pub added_ways: BTreeSet<WayID>,
    pub removed_ways: BTreeSet<WayID>,
    pub changed_ways: BTreeSet<WayID>,
}

impl<'a> MapEdit<'a> {
    pub(crate) fn new(map: &'a mut TaggedMap) -> MapEdit<'a> {
        let next_node = map.next_node_id().0;
        let next_way = map.next_way_id().0;
        MapEdit {
            map,
            commands: Vec::new(),
            next_node,
            next_way,
        }
    }

    /// The map as it was before this edit.
    pub fn map(&self) -> &TaggedMap {
        self.map
    }

    pub fn add_node(&mut self, pt: Pt2D, tags: Tags) -> NodeID {
        let id = NodeID(self.next_node);
        self.next_node += 1;
        self.commands.push(EditCmd::AddNode {
            id,
            node: RawNode { pt, tags },
        });
        id
    }

    /// Like `add_node`, but keeps the caller's ID. Used when loading input.
    pub(crate) fn add_node_with_id(&mut self, id: NodeID, pt: Pt2D, tags: Tags) {
        self.next_node = self.next_node.max(id.0 + 1);
        self.commands.push(EditCmd::AddNode {
            id,
            node: RawNode { pt, tags },
        });
    }

    pub fn split_segment(&mut self, way: WayID, segment: (NodeID, NodeID), node: NodeID) {
        self.commands.push(EditCmd::SplitSegment { way, segment, node });
    }

    pub fn add_way(&mut self, nodes: Vec<NodeID>, tags: Tags) -> WayID {
        let id = WayID(self.next_way);
        self.next_way += 1;
        self.commands.push(EditCmd::AddWay { id, nodes, tags });
        id
    }

    pub(crate) fn add_way_with_id(&mut self, id: WayID, nodes: Vec<NodeID>, tags: Tags) {
        self.next_way = self.next_way.max(id.0 + 1);
        self.commands.push(EditCmd::AddWay { id, nodes, tags });
    }

    pub fn remove_way(&mut self, id: WayID) {
        self.commands.push(EditCmd::RemoveWay(id));
    }

    pub fn remove_node(&mut self, id: NodeID) {
        self.commands.push(EditCmd::RemoveNode(id));
    }

    /// Replaces a way's node list. Tags and kind are kept.
    pub fn set_way_nodes(&mut self, id: WayID, nodes: Vec<NodeID>) -> Result<()> {
        let tags = self.map.get_way(id)?.tags.clone();
        self.commands.push(EditCmd::RemoveWay(id));
        self.commands.push(EditCmd::AddWay { id, nodes, tags });
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Applies every buffered command, or none of them.
    pub fn commit(self) -> Result<EditEffects> {
        let mut staged = Staged {
            map: &*self.map,
            nodes: BTreeMap::new(),
            ways: BTreeMap::new(),
            effects: EditEffects::default(),
        };
        for cmd in self.commands {
            staged.apply(cmd)?;
        }
        staged.validate()?;

        let Staged {
            nodes,
            ways,
            mut effects,
            ..
        } = staged;

        // Nothing can fail past this point
        for id in ways.keys() {
            self.map.unindex_way(*id);
        }
        for (id, node) in nodes {
            match node {
                Some(node) => {
                    self.map.nodes.insert(id, node);
                }
                None => {
                    self.map.nodes.remove(&id);
                }
            }
        }
        for (id, way) in ways {
            match way {
                Some(way) => {
                    self.map.ways.insert(id, way);
                    self.map.index_way(id);
                }
                None => {
                    self.map.ways.remove(&id);
                }
            }
        }
        effects.changed_ways = effects
            .changed_ways
            .difference(&effects.added_ways)
            .cloned()
            .collect();
        Ok(effects)
    }
}

/// Pending state. None means deleted; missing means unchanged.
struct Staged<'a> {
    map: &'a TaggedMap,
    nodes: BTreeMap<NodeID, Option<RawNode>>,
    ways: BTreeMap<WayID, Option<RawWay>>,
    effects: EditEffects,
}

impl<'a> Staged<'a> {
    fn node_exists(&self, id: NodeID) -> bool {
        match self.nodes.get(&id) {
            Some(maybe) => maybe.is_some(),
            None => self.map.nodes.contains_key(&id),
        }
    }

    fn get_way(&self, id: WayID) -> Option<RawWay> {
        match self.ways.get(&id) {
            Some(maybe) => maybe.clone(),
            None => self.map.ways.get(&id).cloned(),
        }
    }

    fn apply(&mut self, cmd: EditCmd) -> Result<()> {
        match cmd {
            EditCmd::AddNode { id, node } => {
                if self.node_exists(id) {
                    bail!("{} already exists", id);
                }
                self.nodes.insert(id, Some(node));
                self.effects.added_nodes.insert(id);
            }
            EditCmd::SplitSegment { way, segment, node } => {
                let mut w = self
                    .get_way(way)
                    .ok_or_else(|| anyhow!("Can't split {}, it doesn't exist", way))?;
                if !self.node_exists(node) {
                    bail!("Can't insert missing {} into {}", node, way);
                }
                if w.nodes.contains(&node) {
                    // Already there
                    return Ok(());
                }
                let (a, b) = segment;
                let idx = w
                    .nodes
                    .windows(2)
                    .position(|pair| (pair[0] == a && pair[1] == b) || (pair[0] == b && pair[1] == a))
                    .ok_or_else(|| {
                        anyhow!("{} has no segment between {} and {}", way, a, b)
                    })?;
                w.nodes.insert(idx + 1, node);
                self.ways.insert(way, Some(w));
                self.effects.changed_ways.insert(way);
            }
            EditCmd::AddWay { id, nodes, tags } => {
                if self.get_way(id).is_some() {
                    bail!("{} already exists", id);
                }
                if nodes.len() < 2 {
                    bail!("{} needs at least 2 nodes, has {}", id, nodes.len());
                }
                let closed = nodes.len() > 2 && nodes.first() == nodes.last();
                let kind = WayKind::classify(&tags, closed);
                self.ways.insert(id, Some(RawWay { nodes, tags, kind }));
                if self.effects.removed_ways.remove(&id) {
                    // Replacing a way's nodes
                    self.effects.changed_ways.insert(id);
                } else {
                    self.effects.added_ways.insert(id);
                }
            }
            EditCmd::RemoveWay(id) => {
                if self.get_way(id).is_none() {
                    bail!("Can't remove {}, it doesn't exist", id);
                }
                self.ways.insert(id, None);
                if !self.effects.added_ways.remove(&id) {
                    self.effects.removed_ways.insert(id);
                }
                self.effects.changed_ways.remove(&id);
            }
            EditCmd::RemoveNode(id) => {
                if !self.node_exists(id) {
                    bail!("Can't remove {}, it doesn't exist", id);
                }
                let mut users: BTreeSet<WayID> = self.map.ways_at_node(id).clone();
                for (way_id, way) in &self.ways {
                    match way {
                        Some(w) if w.nodes.contains(&id) => {
                            users.insert(*way_id);
                        }
                        _ => {}
                    }
                }
                for way_id in users {
                    if let Some(mut w) = self.get_way(way_id) {
                        let was_closed = w.is_closed();
                        w.nodes.retain(|n| *n != id);
                        if was_closed && w.nodes.first() != w.nodes.last() {
                            // The removed node was the start and end
                            if let Some(first) = w.nodes.first().cloned() {
                                w.nodes.push(first);
                            }
                        }
                        self.ways.insert(way_id, Some(w));
                        self.effects.changed_ways.insert(way_id);
                    }
                }
                self.nodes.insert(id, None);
                if !self.effects.added_nodes.remove(&id) {
                    self.effects.removed_nodes.insert(id);
                }
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for (id, way) in &self.ways {
            let way = match way {
                Some(w) => w,
                None => continue,
            };
            if way.nodes.len() < 2 {
                bail!("{} would be left with {} nodes", id, way.nodes.len());
            }
            for n in &way.nodes {
                if !self.node_exists(*n) {
                    bail!("{} would reference missing {}", id, n);
                }
            }
        }
        Ok(())
    }
}
