//! Weighted tag bag.

use std::collections::HashMap;

use crate::types::TagId;

/// Tag weights for one entity. A tag is "applied" while its weight is above
/// zero. Weights floor at zero and zero-weight entries are dropped, so the
/// map only ever holds applied tags.
#[derive(Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagMultiset {
    weights: HashMap<TagId, u32>,
}

impl TagMultiset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the weight of every tag in the slice by one.
    pub fn add_tags(&mut self, tags: &[TagId]) {
        for &tag in tags {
            *self.weights.entry(tag).or_insert(0) += 1;
        }
    }

    /// Decrements the weight of every tag in the slice by one. Removing a
    /// tag that is not applied is a no-op; weights never go negative.
    pub fn remove_tags(&mut self, tags: &[TagId]) {
        for &tag in tags {
            if let Some(weight) = self.weights.get_mut(&tag) {
                *weight -= 1;
                if *weight == 0 {
                    self.weights.remove(&tag);
                }
            }
        }
    }

    pub fn weight(&self, tag: TagId) -> u32 {
        self.weights.get(&tag).copied().unwrap_or(0)
    }

    pub fn has(&self, tag: TagId) -> bool {
        self.weight(tag) > 0
    }

    /// Iterates tags with weight above zero.
    pub fn applied_tags(&self) -> impl Iterator<Item = TagId> + '_ {
        self.weights.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
