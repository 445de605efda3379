//! Per-context tag rankings.
//!
//! A context lists the tags that followed it, most used first. A tag is coded
//! by its rank in that list, so the ordering is part of the format.

use crate::backend::Model;

/// A tag and how often it occurred in the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    /// Dictionary tag.
    pub tag: usize,
    /// Occurrences, starting at 1.
    pub freq: usize,
}

/// Ranked tags plus the statistics their ranks are coded with.
#[derive(Debug, Clone)]
pub struct Context<M> {
    items: Vec<Item>,
    model: M,
}

impl<M: Model> Context<M> {
    /// Empty context whose ranks are coded with `model`.
    pub fn new(model: M) -> Self {
        Self {
            items: Vec::new(),
            model,
        }
    }

    /// Number of distinct tags seen.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `true` if no tag was seen yet.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items, most frequent first.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Rank statistics.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Rank of `tag`, if present.
    pub fn rank_of(&self, tag: usize) -> Option<usize> {
        self.items.iter().position(|it| it.tag == tag)
    }

    /// Tag at `rank`.
    pub fn tag_at(&self, rank: usize) -> Option<usize> {
        self.items.get(rank).map(|it| it.tag)
    }

    /// A single-item context needs no bits to name its tag.
    pub fn needs_rank(&self) -> bool {
        self.items.len() > 1
    }

    /// Bits to code `rank` here.
    pub fn cost(&self, rank: usize) -> f64 {
        if self.needs_rank() {
            self.model.cost(rank)
        } else {
            0.0
        }
    }

    /// Records an occurrence of `tag`: feeds its rank to the statistics,
    /// bumps or adds the item, then restores the frequency order.
    pub fn observe(&mut self, tag: usize) {
        match self.rank_of(tag) {
            Some(rank) => {
                if self.needs_rank() {
                    self.model.update(rank);
                }
                self.items[rank].freq += 1;
            }
            None => {
                self.items.push(Item { tag, freq: 1 });
                self.model.enlarge();
            }
        }
        self.items.sort_by(|l, r| r.freq.cmp(&l.freq));
        debug_assert!(self.items.windows(2).all(|w| w[0].freq >= w[1].freq));
    }
}
