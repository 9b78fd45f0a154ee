//! Arrival queue: approved items not yet shown, in submission order.

use std::collections::{HashSet, VecDeque};

use cs_core::ContentItem;

#[derive(Debug, Default, Clone)]
pub struct ArrivalQueue {
    pending: VecDeque<ContentItem>,
    /// Every id ever enqueued. Never cleared, so a retracted and re-approved
    /// item is not treated as a new arrival.
    seen: HashSet<String>,
}

impl ArrivalQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends every item whose id has not been seen before, in `arrival`
    /// order regardless of the batch's delivery order. Returns how many
    /// were appended.
    pub fn enqueue_new(&mut self, items: &[ContentItem]) -> usize {
        let mut fresh: Vec<&ContentItem> = items
            .iter()
            .filter(|item| !self.seen.contains(&item.id))
            .collect();
        fresh.sort_by(|a, b| a.arrival.cmp(&b.arrival).then_with(|| a.id.cmp(&b.id)));

        let mut added = 0;
        for item in fresh {
            if self.seen.insert(item.id.clone()) {
                self.pending.push_back(item.clone());
                added += 1;
            }
        }
        added
    }

    pub fn dequeue_next(&mut self) -> Option<ContentItem> {
        self.pending.pop_front()
    }

    /// Drops pending items that are no longer approved. Their ids stay seen.
    pub fn retain_approved(&mut self, approved: &HashSet<&str>) -> usize {
        let before = self.pending.len();
        self.pending.retain(|item| approved.contains(item.id.as_str()));
        before - self.pending.len()
    }

    pub fn has_seen(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
