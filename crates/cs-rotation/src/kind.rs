//! Rotation state for one content kind.
//!
//! Everything here is synchronous and non-yielding: a feed update or a tick
//! runs to completion against the state before anything else can touch it.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cs_core::{ContentItem, ContentKind, KindSettings, PresentationSeed, RandomSource};
use tracing::debug;

use crate::bank::{Placement, SlotBank};
use crate::cursor::HistoryCursor;
use crate::queue::ArrivalQueue;

/// Result of a single tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing approved; the bank is left alone.
    Empty,
    /// The whole pool is already on screen and nothing new is waiting.
    Settled,
    Placed {
        slot: usize,
        item_id: String,
        is_new: bool,
    },
}

impl TickOutcome {
    pub fn is_placed(&self) -> bool {
        matches!(self, TickOutcome::Placed { .. })
    }
}

/// Effect of one feed delivery on a kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedDelta {
    pub enqueued: usize,
    /// Slots emptied because their occupant was retracted.
    pub cleared_slots: Vec<usize>,
    /// Queued items dropped because they were retracted before being shown.
    pub dropped_pending: usize,
}

#[derive(Debug, Clone)]
pub struct KindRotation {
    kind: ContentKind,
    tick_period: Duration,
    /// Current approved pool, sorted by arrival.
    approved: Vec<ContentItem>,
    queue: ArrivalQueue,
    cursor: HistoryCursor,
    bank: SlotBank,
}

impl KindRotation {
    pub fn new(kind: ContentKind, settings: KindSettings) -> Self {
        Self {
            kind,
            tick_period: settings.tick_period,
            approved: Vec::new(),
            queue: ArrivalQueue::new(),
            cursor: HistoryCursor::new(),
            bank: SlotBank::new(settings.capacity),
        }
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    pub fn capacity(&self) -> usize {
        self.bank.capacity()
    }

    pub fn slots(&self) -> &[Option<Placement>] {
        self.bank.slots()
    }

    pub fn approved(&self) -> &[ContentItem] {
        &self.approved
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn next_slot(&self) -> usize {
        self.bank.next_slot()
    }

    pub fn cursor_position(&self) -> usize {
        self.cursor.position()
    }

    /// Applies a complete approved set for this kind.
    ///
    /// Retracted items leave the bank and the queue immediately; unseen
    /// items join the queue in arrival order.
    pub fn on_feed_update(&mut self, mut items: Vec<ContentItem>) -> FeedDelta {
        // First delivery of an id wins, whatever its timestamp.
        let mut ids = HashSet::with_capacity(items.len());
        items.retain(|i| ids.insert(i.id.clone()));
        items.sort_by(|a, b| a.arrival.cmp(&b.arrival).then_with(|| a.id.cmp(&b.id)));

        let (cleared_slots, dropped_pending) = {
            let approved: HashSet<&str> = items.iter().map(|i| i.id.as_str()).collect();
            (self.bank.reconcile(&approved), self.queue.retain_approved(&approved))
        };
        let enqueued = self.queue.enqueue_new(&items);
        self.approved = items;

        FeedDelta { enqueued, cleared_slots, dropped_pending }
    }

    /// Changes the slot count. Indices are clamped right away.
    pub fn resize(&mut self, capacity: usize) {
        self.bank.resize(capacity);
    }

    /// Takes effect from the next tick on.
    pub fn set_tick_period(&mut self, period: Duration) {
        self.tick_period = period;
    }

    pub fn apply_settings(&mut self, settings: KindSettings) {
        self.resize(settings.capacity);
        self.set_tick_period(settings.tick_period);
    }

    /// Runs one rotation decision: a queued arrival if any, otherwise a
    /// rerun from the history cursor, into the next slot.
    pub fn tick(&mut self, key: u64, now: DateTime<Utc>, rng: &mut dyn RandomSource) -> TickOutcome {
        let capacity = self.bank.capacity();
        let total = self.approved.len();

        if self.queue.is_empty() && total <= capacity {
            let displayed = self.bank.displayed_ids();
            if self.approved.iter().all(|i| displayed.contains(i.id.as_str())) {
                return if total == 0 { TickOutcome::Empty } else { TickOutcome::Settled };
            }
        }

        let (item, is_new) = match self.queue.dequeue_next() {
            Some(item) => (item, true),
            None => {
                let displayed = self.bank.displayed_ids();
                match self.cursor.next_rerun(&self.approved, &displayed, capacity) {
                    Some(item) => (item.clone(), false),
                    None => return TickOutcome::Empty,
                }
            }
        };

        let item_id = item.id.clone();
        let seed = PresentationSeed::draw(self.kind, rng);
        let slot = self.bank.place(Placement { key, item, is_new, seed, placed_at: now });
        debug!(kind = %self.kind, slot, item = %item_id, is_new, "placed");

        TickOutcome::Placed { slot, item_id, is_new }
    }
}
