//! Growing dictionary of previously seen byte strings.
//!
//! Entries are kept ordered by cost (distance from the cursor to their last
//! occurrence), so their positions move on every [`Dictionary::update_costs`].
//! Everything outside this module refers to entries by their [`Entry::tag`],
//! which is assigned at insertion and never changes.

use std::collections::HashMap;

/// log2 of [`MAX_MATCH_LEN`].
pub const MATCH_LOG_SIZE: u32 = 4;

/// Longest string a dictionary entry can hold.
pub const MAX_MATCH_LEN: usize = 1 << MATCH_LOG_SIZE;

/// One dictionary string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    bytes: [u8; MAX_MATCH_LEN],
    len: u8,
    last_seen: usize,
    cost: usize,
    tag: usize,
}

impl Entry {
    /// The string.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Its length.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// `true` for a zero-length string; [`Dictionary::insert`] admits none.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Cursor position of the most recent occurrence.
    pub fn last_seen(&self) -> usize {
        self.last_seen
    }

    /// Sort key computed by the last [`Dictionary::update_costs`].
    pub fn cost(&self) -> usize {
        self.cost
    }

    /// Stable identity.
    pub fn tag(&self) -> usize {
        self.tag
    }
}

/// Cost-ordered string table with tag addressing.
#[derive(Debug, Default, Clone)]
pub struct Dictionary {
    entries: Vec<Entry>,
    /// tag -> current position in `entries`
    positions: Vec<usize>,
    /// string -> tag
    lookup: HashMap<Box<[u8]>, usize>,
}

impl Dictionary {
    /// Empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` before the first insertion.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Allocated slots.
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    /// Entries in cost order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// `true` if exactly `bytes` is already an entry.
    pub fn contains(&self, bytes: &[u8]) -> bool {
        self.lookup.contains_key(bytes)
    }

    /// Tag of the longest entry that is a prefix of `input`.
    pub fn find_match(&self, input: &[u8]) -> Option<usize> {
        let longest = input.len().min(MAX_MATCH_LEN);
        (1..=longest)
            .rev()
            .find_map(|len| self.lookup.get(&input[..len]).copied())
    }

    /// Adds `bytes`, last seen at `position`, and returns its tag.
    ///
    /// # Panics
    ///
    /// If `bytes` is empty, longer than [`MAX_MATCH_LEN`] or already present.
    pub fn insert(&mut self, bytes: &[u8], position: usize) -> usize {
        assert!(
            !bytes.is_empty() && bytes.len() <= MAX_MATCH_LEN,
            "entry length out of range"
        );
        assert!(!self.contains(bytes), "duplicate dictionary entry");

        if self.entries.len() == self.entries.capacity() {
            self.entries.reserve_exact(self.entries.len().max(1));
        }

        let tag = self.entries.len();
        let mut buf = [0u8; MAX_MATCH_LEN];
        buf[..bytes.len()].copy_from_slice(bytes);
        self.entries.push(Entry {
            bytes: buf,
            len: bytes.len() as u8,
            last_seen: position,
            cost: 0,
            tag,
        });
        self.positions.push(tag);
        self.lookup.insert(bytes.into(), tag);
        tag
    }

    /// Entry with `tag`.
    ///
    /// # Panics
    ///
    /// If no entry carries `tag`.
    pub fn get(&self, tag: usize) -> &Entry {
        &self.entries[self.positions[tag]]
    }

    /// Current position of the entry with `tag`.
    pub fn position_of(&self, tag: usize) -> usize {
        self.positions[tag]
    }

    /// Tag of the entry currently at `position`.
    pub fn tag_at(&self, position: usize) -> Option<usize> {
        self.entries.get(position).map(Entry::tag)
    }

    /// Records an occurrence of `tag` at `position`.
    pub fn touch(&mut self, tag: usize, position: usize) {
        let at = self.positions[tag];
        self.entries[at].last_seen = position;
    }

    /// Recomputes every cost relative to `cursor` and re-sorts by it.
    pub fn update_costs(&mut self, cursor: usize) {
        for e in &mut self.entries {
            assert!(cursor >= e.last_seen, "entry seen ahead of the cursor");
            e.cost = cursor - e.last_seen;
        }
        self.entries.sort_by_key(Entry::cost);
        for (at, e) in self.entries.iter().enumerate() {
            self.positions[e.tag] = at;
        }
        debug_assert!(self.entries.windows(2).all(|w| w[0].cost <= w[1].cost));
    }
}
