use std::collections::HashMap;
use std::hash::Hash;

use rstar::{RTree, RTreeObject, AABB};

use crate::Bounds;

/// Indexes objects by their bounding box, answering "what touches this box?" without scanning
/// everything.
pub struct SpatialIndex<K: Clone + Eq + Hash> {
    boxes: HashMap<K, Bounds>,
    tree: RTree<Entry<K>>,
}

#[derive(Clone, PartialEq)]
struct Entry<K> {
    key: K,
    envelope: AABB<[f64; 2]>,
}

impl<K> RTreeObject for Entry<K> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl<K> SpatialIndex<K>
where
    K: Clone + Eq + Hash + Ord,
{
    pub fn new() -> SpatialIndex<K> {
        SpatialIndex {
            boxes: HashMap::new(),
            tree: RTree::new(),
        }
    }

    /// Adds or replaces the key's bounding box.
    pub fn insert(&mut self, key: K, bounds: Bounds) {
        self.remove(&key);
        self.tree.insert(Entry {
            key: key.clone(),
            envelope: bounds.as_aabb(),
        });
        self.boxes.insert(key, bounds);
    }

    pub fn remove(&mut self, key: &K) {
        if let Some(bounds) = self.boxes.remove(key) {
            self.tree.remove(&Entry {
                key: key.clone(),
                envelope: bounds.as_aabb(),
            });
        }
    }

    /// Every key whose bounding box touches the query, in sorted order.
    pub fn query(&self, bounds: &Bounds) -> Vec<K> {
        let mut keys: Vec<K> = self
            .tree
            .locate_in_envelope_intersecting(&bounds.as_aabb())
            .map(|entry| entry.key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

impl<K> Default for SpatialIndex<K>
where
    K: Clone + Eq + Hash + Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    use super::*;
    use crate::{Distance, Pt2D};

    #[test]
    fn matches_brute_force() {
        let mut rng = XorShiftRng::seed_from_u64(42);
        let mut index = SpatialIndex::new();
        let mut all = Vec::new();
        for id in 0..200_usize {
            let pt = Pt2D::new(rng.gen_range(0.0..500.0), rng.gen_range(0.0..500.0));
            let b = Bounds::around(pt, Distance::meters(rng.gen_range(1.0..20.0)));
            index.insert(id, b.clone());
            all.push(b);
        }
        // Removing and re-adding keeps one entry per key
        index.remove(&7);
        index.insert(7, all[7].clone());
        assert_eq!(index.len(), 200);

        for _ in 0..20 {
            let query = Bounds::around(
                Pt2D::new(rng.gen_range(0.0..500.0), rng.gen_range(0.0..500.0)),
                Distance::meters(50.0),
            );
            let expected: Vec<usize> = all
                .iter()
                .enumerate()
                .filter(|(_, b)| b.intersects(&query))
                .map(|(id, _)| id)
                .collect();
            assert_eq!(index.query(&query), expected);
        }
    }
}
