use std::collections::{BTreeMap, BTreeSet};

/// A one-to-many mapping. Keys with no values are never stored.
#[derive(PartialEq, Clone, Debug)]
pub struct MultiMap<K, V>
where
    K: Ord + PartialEq + Clone,
    V: Ord + PartialEq + Clone,
{
    map: BTreeMap<K, BTreeSet<V>>,
    empty: BTreeSet<V>,
}

impl<K, V> MultiMap<K, V>
where
    K: Ord + PartialEq + Clone,
    V: Ord + PartialEq + Clone,
{
    pub fn new() -> MultiMap<K, V> {
        MultiMap {
            map: BTreeMap::new(),
            empty: BTreeSet::new(),
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.map.entry(key).or_insert_with(BTreeSet::new).insert(value);
    }

    pub fn remove(&mut self, key: K, value: V) {
        if let Some(values) = self.map.get_mut(&key) {
            values.remove(&value);
            if values.is_empty() {
                self.map.remove(&key);
            }
        }
    }

    pub fn get(&self, key: K) -> &BTreeSet<V> {
        self.map.get(&key).unwrap_or(&self.empty)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K, V> Default for MultiMap<K, V>
where
    K: Ord + PartialEq + Clone,
    V: Ord + PartialEq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multimap_drops_empty_keys() {
        let mut mm: MultiMap<usize, &str> = MultiMap::new();
        mm.insert(1, "a");
        mm.insert(1, "b");
        mm.insert(2, "c");
        assert_eq!(mm.get(1).len(), 2);
        mm.remove(2, "c");
        assert!(mm.get(2).is_empty());
        assert_eq!(mm.len(), 1);
    }
}
