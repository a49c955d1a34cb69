use std::collections::{BTreeMap, HashMap};

use geom::{trim_f64, HashablePt2D, Pt2D};
use maputil::{prettyprint_usize, Timer};

use crate::{EdgeID, GraphNodeID, PlanarMap, ShapeID};

impl PlanarMap {
    /// Shapes are built independently, so two shapes touching along a wall each have their own
    /// copy of the edge, sometimes with their own copies of its nodes. Merge them, so every
    /// pair of nodes is connected by at most one edge.
    pub(crate) fn merge_duplicates(&mut self, timer: &mut Timer) {
        let merged_nodes = self.merge_coincident_nodes();
        let dropped = self.remove_degenerate_edges();
        let merged_edges = self.merge_parallel_edges();
        timer.note(format!(
            "Merged {} coincident nodes and {} duplicate edges, dropped {} zero-length edges",
            prettyprint_usize(merged_nodes),
            prettyprint_usize(merged_edges),
            prettyprint_usize(dropped)
        ));
    }

    fn merge_coincident_nodes(&mut self) -> usize {
        let mut canonical: HashMap<HashablePt2D, GraphNodeID> = HashMap::new();
        let mut replace: BTreeMap<GraphNodeID, GraphNodeID> = BTreeMap::new();
        for node in self.nodes.values() {
            let key = Pt2D::new(trim_f64(node.pt.x()), trim_f64(node.pt.y())).to_hashable();
            match canonical.get(&key) {
                Some(keep) => {
                    replace.insert(node.id, *keep);
                }
                None => {
                    canonical.insert(key, node.id);
                }
            }
        }
        if replace.is_empty() {
            return 0;
        }

        for edge in self.edges.values_mut() {
            if let Some(n) = replace.get(&edge.src) {
                edge.src = *n;
            }
            if let Some(n) = replace.get(&edge.dst) {
                edge.dst = *n;
            }
        }
        for (old, keep) in &replace {
            if let Some(node) = self.nodes.remove(old) {
                // Keep track of where the merged node came from
                if let Some(kept) = self.nodes.get_mut(keep) {
                    if kept.source.is_none() {
                        kept.source = node.source;
                    }
                }
            }
        }
        replace.len()
    }

    fn remove_degenerate_edges(&mut self) -> usize {
        let doomed: Vec<EdgeID> = self
            .edges
            .values()
            .filter(|e| e.src == e.dst)
            .map(|e| e.id)
            .collect();
        for id in &doomed {
            let users: Vec<ShapeID> = self.edge_shapes.get(*id).iter().cloned().collect();
            for shape_id in users {
                if let Some(shape) = self.shapes.get_mut(&shape_id) {
                    shape.edges.retain(|de| de.edge != *id);
                }
                self.edge_shapes.remove(*id, shape_id);
            }
            self.edges.remove(id);
        }
        doomed.len()
    }

    fn merge_parallel_edges(&mut self) -> usize {
        let mut by_pair: BTreeMap<(GraphNodeID, GraphNodeID), EdgeID> = BTreeMap::new();
        let mut replace: Vec<(EdgeID, EdgeID)> = Vec::new();
        for edge in self.edges.values() {
            let key = (edge.src.min(edge.dst), edge.src.max(edge.dst));
            match by_pair.get(&key) {
                Some(keep) => replace.push((edge.id, *keep)),
                None => {
                    by_pair.insert(key, edge.id);
                }
            }
        }

        for (dup, keep) in &replace {
            let same_direction = self.edges[dup].src == self.edges[keep].src;
            let users: Vec<ShapeID> = self.edge_shapes.get(*dup).iter().cloned().collect();
            for shape_id in users {
                if let Some(shape) = self.shapes.get_mut(&shape_id) {
                    for de in &mut shape.edges {
                        if de.edge == *dup {
                            de.edge = *keep;
                            if !same_direction {
                                de.forward = !de.forward;
                            }
                        }
                    }
                }
                self.edge_shapes.remove(*dup, shape_id);
                self.edge_shapes.insert(*keep, shape_id);
            }
            self.edges.remove(dup);
        }
        replace.len()
    }
}
