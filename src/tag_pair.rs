//! Dense ids for pairs of consecutive tags.

use std::collections::BTreeMap;

/// Ordered map `(tag0, tag1) -> id`, ids handed out sequentially.
///
/// The capacity is tracked separately, in powers of two, and only sizes the
/// table of contexts the ids select.
#[derive(Debug, Clone)]
pub struct TagPairIndex {
    map: BTreeMap<(usize, usize), usize>,
    capacity: usize,
}

impl Default for TagPairIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl TagPairIndex {
    /// Empty index with room for one pair.
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
            capacity: 1,
        }
    }

    /// Pairs added.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// `true` before the first pair.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Current capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Id of `(tag0, tag1)`.
    pub fn query(&self, tag0: usize, tag1: usize) -> Option<usize> {
        self.map.get(&(tag0, tag1)).copied()
    }

    /// Room for another pair without enlarging.
    pub fn can_add(&self) -> bool {
        self.map.len() != self.capacity
    }

    /// Doubles the capacity.
    pub fn enlarge(&mut self) {
        self.capacity <<= 1;
    }

    /// Registers a new pair and returns its id.
    ///
    /// # Panics
    ///
    /// If the pair is already present or the index is full.
    pub fn add(&mut self, tag0: usize, tag1: usize) -> usize {
        assert!(self.can_add(), "tag-pair index is full");
        let id = self.map.len();
        let previous = self.map.insert((tag0, tag1), id);
        assert!(previous.is_none(), "tag pair added twice");
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_dense_and_stable() {
        let mut idx = TagPairIndex::new();
        assert!(idx.is_empty());
        assert_eq!(idx.add(5, 1), 0);
        assert!(!idx.can_add());
        idx.enlarge();
        assert_eq!(idx.add(0, 9), 1);
        idx.enlarge();
        assert_eq!(idx.add(5, 0), 2);
        assert_eq!(idx.capacity(), 4);
        assert_eq!(idx.query(5, 1), Some(0));
        assert_eq!(idx.query(0, 9), Some(1));
        assert_eq!(idx.query(5, 0), Some(2));
        assert_eq!(idx.query(1, 5), None);
        assert_eq!(idx.len(), 3);
    }

    #[test]
    #[should_panic(expected = "full")]
    fn add_when_full_panics() {
        let mut idx = TagPairIndex::new();
        idx.add(0, 0);
        idx.add(0, 1);
    }
}
