//! Slot bank: a fixed number of display positions for one kind.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use cs_core::{ContentItem, PresentationSeed};
use serde::Serialize;

/// One placement of an item into a slot.
///
/// A placement is never edited; re-populating a slot replaces the whole
/// record, and `key` changes so the presentation layer replays the entry
/// animation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub key: u64,
    pub item: ContentItem,
    /// Came from the arrival queue rather than a rerun.
    pub is_new: bool,
    pub seed: PresentationSeed,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SlotBank {
    slots: Vec<Option<Placement>>,
    next_slot: usize,
}

impl SlotBank {
    /// A bank always has at least one slot.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
            next_slot: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[Option<Placement>] {
        &self.slots
    }

    pub fn next_slot(&self) -> usize {
        self.next_slot
    }

    /// Grows with empty slots or truncates from the tail.
    pub fn resize(&mut self, capacity: usize) {
        let capacity = capacity.max(1);
        self.slots.resize(capacity, None);
        self.next_slot %= capacity;
    }

    /// Clears every slot whose occupant is not in `approved`.
    /// Returns the cleared slot indices.
    pub fn reconcile(&mut self, approved: &HashSet<&str>) -> Vec<usize> {
        let mut cleared = Vec::new();
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            let keep = slot
                .as_ref()
                .map_or(true, |p| approved.contains(p.item.id.as_str()));
            if !keep {
                *slot = None;
                cleared.push(idx);
            }
        }
        cleared
    }

    /// Puts `placement` into the next slot in round-robin order and returns
    /// the index used.
    pub fn place(&mut self, placement: Placement) -> usize {
        let len = self.slots.len();
        let idx = self.next_slot % len;
        self.slots[idx] = Some(placement);
        self.next_slot = (idx + 1) % len;
        idx
    }

    pub fn displayed_ids(&self) -> HashSet<&str> {
        self.slots
            .iter()
            .flatten()
            .map(|p| p.item.id.as_str())
            .collect()
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}
