//! # Stage
//!
//! Both kinds' rotation state for one event, plus the random source and the
//! placement key counter they share. This is the synchronous engine; the
//! [`crate::scheduler::StageScheduler`] drives it from timers and feeds.

use chrono::{DateTime, Utc};
use cs_core::{ContentItem, ContentKind, KindSettings, RandomSource, StageSettings, SubmissionRecord};
use serde::Serialize;
use tracing::{info, warn};

use crate::bank::Placement;
use crate::kind::{FeedDelta, KindRotation, TickOutcome};

/// What the presentation layer renders: the ordered slots of each kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageSnapshot {
    pub image: Vec<Option<Placement>>,
    pub text: Vec<Option<Placement>>,
}

impl StageSnapshot {
    pub fn slots(&self, kind: ContentKind) -> &[Option<Placement>] {
        match kind {
            ContentKind::ImageLike => &self.image,
            ContentKind::Text => &self.text,
        }
    }
}

/// Per-kind effect of one feed delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageDelta {
    pub image: FeedDelta,
    pub text: FeedDelta,
    /// Records dropped for an unknown type or a non-approved status.
    pub ignored: usize,
}

impl StageDelta {
    pub fn changed_slots(&self) -> bool {
        !self.image.cleared_slots.is_empty() || !self.text.cleared_slots.is_empty()
    }
}

pub struct Stage {
    image: KindRotation,
    text: KindRotation,
    rng: Box<dyn RandomSource>,
    next_key: u64,
}

impl Stage {
    pub fn new(settings: StageSettings, rng: Box<dyn RandomSource>) -> Self {
        Self {
            image: KindRotation::new(ContentKind::ImageLike, settings.image),
            text: KindRotation::new(ContentKind::Text, settings.text),
            rng,
            next_key: 1,
        }
    }

    pub fn rotation(&self, kind: ContentKind) -> &KindRotation {
        match kind {
            ContentKind::ImageLike => &self.image,
            ContentKind::Text => &self.text,
        }
    }

    fn rotation_mut(&mut self, kind: ContentKind) -> &mut KindRotation {
        match kind {
            ContentKind::ImageLike => &mut self.image,
            ContentKind::Text => &mut self.text,
        }
    }

    /// Handles a complete approved set as delivered by the feed.
    pub fn on_feed_update(&mut self, records: &[SubmissionRecord]) -> StageDelta {
        let mut ignored = 0;
        let mut items = Vec::with_capacity(records.len());
        for record in records {
            match ContentItem::try_from(record.clone()) {
                Ok(item) => items.push(item),
                Err(e) => {
                    ignored += 1;
                    warn!(submission = %record.id, error = %e, "ignoring feed record");
                }
            }
        }
        let mut delta = self.on_items(items);
        delta.ignored = ignored;
        delta
    }

    /// Handles an already-typed approved set, splitting it by kind.
    pub fn on_items(&mut self, items: Vec<ContentItem>) -> StageDelta {
        let (images, texts): (Vec<_>, Vec<_>) =
            items.into_iter().partition(|i| i.kind() == ContentKind::ImageLike);
        StageDelta {
            image: self.image.on_feed_update(images),
            text: self.text.on_feed_update(texts),
            ignored: 0,
        }
    }

    /// One timer tick for `kind`.
    pub fn on_tick(&mut self, kind: ContentKind, now: DateTime<Utc>) -> TickOutcome {
        let key = self.next_key;
        let rotation = match kind {
            ContentKind::ImageLike => &mut self.image,
            ContentKind::Text => &mut self.text,
        };
        let outcome = rotation.tick(key, now, self.rng.as_mut());
        if outcome.is_placed() {
            self.next_key += 1;
        }
        outcome
    }

    /// Resizes and retimes one kind.
    pub fn on_config_change(&mut self, kind: ContentKind, settings: KindSettings) {
        let rotation = self.rotation_mut(kind);
        if rotation.capacity() != settings.capacity || rotation.tick_period() != settings.tick_period {
            info!(
                %kind,
                capacity = settings.capacity,
                period_ms = settings.tick_period.as_millis() as u64,
                "stage settings changed"
            );
        }
        rotation.apply_settings(settings);
    }

    pub fn apply_settings(&mut self, settings: StageSettings) {
        for kind in ContentKind::ALL {
            self.on_config_change(kind, settings.for_kind(kind));
        }
    }

    pub fn snapshot(&self) -> StageSnapshot {
        StageSnapshot {
            image: self.image.slots().to_vec(),
            text: self.text.slots().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_core::{ApprovalState, ScriptedRandom};
    use std::time::Duration;

    fn record(id: &str, media_type: &str, secs: i64) -> SubmissionRecord {
        SubmissionRecord {
            id: id.into(),
            event_id: "ev".into(),
            media_type: media_type.into(),
            image: Some(format!("https://cdn.example/{id}")),
            text: Some(format!("msg {id}")),
            sender: Some("guest".into()),
            status: ApprovalState::Approved,
            timestamp: Utc::now() + chrono::Duration::seconds(secs),
        }
    }

    fn stage() -> Stage {
        Stage::new(StageSettings::default(), Box::new(ScriptedRandom::default()))
    }

    #[test]
    fn feed_is_split_by_kind_and_unknown_types_ignored() {
        let mut stage = stage();
        let delta = stage.on_feed_update(&[
            record("p", "image", 0),
            record("v", "video", 1),
            record("t", "text", 2),
            record("s", "sticker", 3),
        ]);
        assert_eq!(delta.image.enqueued, 2);
        assert_eq!(delta.text.enqueued, 1);
        assert_eq!(delta.ignored, 1);
        assert_eq!(stage.rotation(ContentKind::ImageLike).approved().len(), 2);
    }

    #[test]
    fn kinds_rotate_independently_with_fresh_keys() {
        let mut stage = stage();
        stage.on_feed_update(&[record("p", "image", 0), record("t", "text", 1)]);

        assert!(stage.on_tick(ContentKind::Text, Utc::now()).is_placed());
        assert!(stage.on_tick(ContentKind::ImageLike, Utc::now()).is_placed());
        // both pools are fully shown now
        assert_eq!(stage.on_tick(ContentKind::Text, Utc::now()), TickOutcome::Settled);

        let snap = stage.snapshot();
        assert_eq!(snap.text[0].as_ref().map(|p| p.key), Some(1));
        assert_eq!(snap.image[0].as_ref().map(|p| p.key), Some(2));
    }

    #[test]
    fn config_change_resizes_one_kind() {
        let mut stage = stage();
        stage.on_config_change(
            ContentKind::Text,
            KindSettings { capacity: 2, tick_period: Duration::from_secs(3) },
        );
        let snap = stage.snapshot();
        assert_eq!(snap.text.len(), 2);
        assert_eq!(snap.image.len(), 3);
        assert_eq!(stage.rotation(ContentKind::Text).tick_period(), Duration::from_secs(3));
    }
}
