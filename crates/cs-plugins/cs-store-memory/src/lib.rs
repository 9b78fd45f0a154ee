//! # cs-store-memory
//! crowdstage/crates/cs-plugins/cs-store-memory/src/lib.rs
//! In-process document store implementing the feed, directory and
//! moderation ports.
//!
//! Every mutation republishes the complete approved set of the affected
//! event on its `watch` channel. Receivers that lag behind only ever see the
//! latest set, which is the coalescing the stage expects from a live feed.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use cs_core::error::AppError;
use cs_core::models::{ApprovalState, EventRecord, MediaType, SubmissionDraft, SubmissionRecord};
use cs_core::settings::RawStageSettings;
use cs_core::traits::{EventDirectory, ModerationStore, SubmissionFeed};
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    events: HashMap<String, watch::Sender<EventRecord>>,
    /// Created on first subscription.
    feeds: HashMap<String, watch::Sender<Vec<SubmissionRecord>>>,
    submissions: HashMap<String, SubmissionRecord>,
}

impl Inner {
    /// Approved submissions of one event in arrival order.
    fn approved(&self, event_id: &str) -> Vec<SubmissionRecord> {
        let mut set: Vec<_> = self
            .submissions
            .values()
            .filter(|s| s.event_id == event_id && s.status == ApprovalState::Approved)
            .cloned()
            .collect();
        set.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        set
    }

    fn republish(&self, event_id: &str) {
        if let Some(feed) = self.feeds.get(event_id) {
            let set = self.approved(event_id);
            debug!(event = %event_id, approved = set.len(), "feed republished");
            feed.send_replace(set);
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates or replaces an event document.
    pub fn put_event(&self, event: EventRecord) {
        let mut inner = self.inner();
        match inner.events.get(&event.id) {
            Some(tx) => {
                tx.send_replace(event);
            }
            None => {
                info!(event = %event.id, name = %event.name, "event created");
                let id = event.id.clone();
                let (tx, _) = watch::channel(event);
                inner.events.insert(id, tx);
            }
        }
    }

    pub fn event(&self, event_id: &str) -> Option<EventRecord> {
        self.inner().events.get(event_id).map(|tx| tx.borrow().clone())
    }

    /// Turns an event's stage off or back on.
    pub fn set_disabled(&self, event_id: &str, disabled: bool) -> anyhow::Result<()> {
        let inner = self.inner();
        let tx = inner
            .events
            .get(event_id)
            .ok_or_else(|| AppError::NotFound("Event".into(), event_id.into()))?;
        tx.send_modify(|e| e.disabled = disabled);
        Ok(())
    }

    /// All submissions of an event, pending ones included, oldest first.
    pub fn submissions(&self, event_id: &str) -> Vec<SubmissionRecord> {
        let inner = self.inner();
        let mut all: Vec<_> = inner
            .submissions
            .values()
            .filter(|s| s.event_id == event_id)
            .cloned()
            .collect();
        all.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        all
    }
}

fn validate_draft(draft: &SubmissionDraft) -> Result<MediaType, AppError> {
    let media = MediaType::parse(&draft.media_type).ok_or_else(|| {
        AppError::ValidationError(format!("unsupported submission type '{}'", draft.media_type))
    })?;
    let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    match media {
        MediaType::Text if !present(&draft.text) => {
            Err(AppError::ValidationError("text submissions need a message".into()))
        }
        MediaType::Image | MediaType::Video if !present(&draft.image) => {
            Err(AppError::ValidationError(format!("{} submissions need a media url", draft.media_type)))
        }
        _ => Ok(media),
    }
}

#[async_trait]
impl SubmissionFeed for MemoryStore {
    async fn subscribe_approved(
        &self,
        event_id: &str,
    ) -> anyhow::Result<watch::Receiver<Vec<SubmissionRecord>>> {
        let mut inner = self.inner();
        if let Some(feed) = inner.feeds.get(event_id) {
            return Ok(feed.subscribe());
        }
        let (tx, rx) = watch::channel(inner.approved(event_id));
        inner.feeds.insert(event_id.to_string(), tx);
        Ok(rx)
    }
}

#[async_trait]
impl EventDirectory for MemoryStore {
    async fn watch_event(
        &self,
        event_id: &str,
    ) -> anyhow::Result<Option<watch::Receiver<EventRecord>>> {
        Ok(self.inner().events.get(event_id).map(watch::Sender::subscribe))
    }

    async fn update_settings(
        &self,
        event_id: &str,
        settings: RawStageSettings,
    ) -> anyhow::Result<()> {
        let inner = self.inner();
        let tx = inner
            .events
            .get(event_id)
            .ok_or_else(|| AppError::NotFound("Event".into(), event_id.into()))?;
        tx.send_modify(|e| e.settings = settings);
        info!(event = %event_id, "stage settings stored");
        Ok(())
    }
}

#[async_trait]
impl ModerationStore for MemoryStore {
    async fn submit(
        &self,
        event_id: &str,
        draft: SubmissionDraft,
    ) -> anyhow::Result<SubmissionRecord> {
        validate_draft(&draft)?;
        let mut inner = self.inner();
        if !inner.events.contains_key(event_id) {
            return Err(AppError::NotFound("Event".into(), event_id.into()).into());
        }

        let record = SubmissionRecord {
            id: Uuid::now_v7().to_string(),
            event_id: event_id.to_string(),
            media_type: draft.media_type,
            image: draft.image,
            text: draft.text,
            sender: draft.sender,
            status: ApprovalState::Pending,
            timestamp: Utc::now(),
        };
        inner.submissions.insert(record.id.clone(), record.clone());
        debug!(event = %event_id, submission = %record.id, "submission stored");
        Ok(record)
    }

    async fn set_status(
        &self,
        event_id: &str,
        submission_id: &str,
        status: ApprovalState,
    ) -> anyhow::Result<Option<SubmissionRecord>> {
        let mut inner = self.inner();
        let Some(record) = inner
            .submissions
            .get_mut(submission_id)
            .filter(|r| r.event_id == event_id)
        else {
            return Ok(None);
        };
        let changed = record.status != status;
        record.status = status;
        let record = record.clone();
        if changed {
            inner.republish(&record.event_id);
        }
        Ok(Some(record))
    }

    async fn delete(&self, event_id: &str, submission_id: &str) -> anyhow::Result<bool> {
        let mut inner = self.inner();
        let owned = inner
            .submissions
            .get(submission_id)
            .is_some_and(|r| r.event_id == event_id);
        if !owned {
            return Ok(false);
        }
        match inner.submissions.remove(submission_id) {
            Some(record) => {
                if record.status == ApprovalState::Approved {
                    inner.republish(&record.event_id);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.put_event(EventRecord {
            id: "gala".into(),
            name: "Spring Gala".into(),
            disabled: false,
            settings: RawStageSettings::default(),
            background_image: None,
        });
        store
    }

    fn text(body: &str) -> SubmissionDraft {
        SubmissionDraft {
            media_type: "text".into(),
            image: None,
            text: Some(body.into()),
            sender: Some("guest".into()),
        }
    }

    #[tokio::test]
    async fn approval_and_retraction_republish_the_full_set() {
        let store = store();
        let mut feed = store.subscribe_approved("gala").await.unwrap();
        assert!(feed.borrow_and_update().is_empty());

        let first = store.submit("gala", text("hi")).await.unwrap();
        let second = store.submit("gala", text("hello")).await.unwrap();
        assert_eq!(first.status, ApprovalState::Pending);
        assert!(!feed.has_changed().unwrap());

        store.set_status("gala", &first.id, ApprovalState::Approved).await.unwrap();
        store.set_status("gala", &second.id, ApprovalState::Approved).await.unwrap();
        let ids: Vec<_> = feed.borrow_and_update().iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![first.id.clone(), second.id.clone()]);

        store.set_status("gala", &first.id, ApprovalState::Pending).await.unwrap();
        assert_eq!(feed.borrow_and_update().len(), 1);

        assert!(store.delete("gala", &second.id).await.unwrap());
        assert!(feed.borrow_and_update().is_empty());
        assert!(!store.delete("gala", &second.id).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_a_pending_submission_does_not_touch_the_feed() {
        let store = store();
        let mut feed = store.subscribe_approved("gala").await.unwrap();
        let pending = store.submit("gala", text("hi")).await.unwrap();
        store.delete("gala", &pending.id).await.unwrap();
        assert!(!feed.has_changed().unwrap());
    }

    #[tokio::test]
    async fn moderation_is_scoped_to_the_owning_event() {
        let store = store();
        store.put_event(EventRecord {
            id: "expo".into(),
            name: "Expo".into(),
            disabled: false,
            settings: RawStageSettings::default(),
            background_image: None,
        });
        let mut feed = store.subscribe_approved("gala").await.unwrap();
        let record = store.submit("gala", text("hi")).await.unwrap();

        assert!(store
            .set_status("expo", &record.id, ApprovalState::Approved)
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete("expo", &record.id).await.unwrap());
        assert_eq!(store.submissions("gala")[0].status, ApprovalState::Pending);
        assert!(!feed.has_changed().unwrap());
    }

    #[tokio::test]
    async fn submissions_are_validated() {
        let store = store();
        let err = store.submit("nope", text("hi")).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::NotFound(..))));

        let mut draft = text("hi");
        draft.media_type = "sticker".into();
        let err = store.submit("gala", draft).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::ValidationError(_))));

        let photo = SubmissionDraft {
            media_type: "image".into(),
            image: None,
            text: Some("caption only".into()),
            sender: None,
        };
        assert!(store.submit("gala", photo).await.is_err());
    }

    #[tokio::test]
    async fn settings_and_disable_flow_to_watchers() {
        let store = store();
        let mut event = store.watch_event("gala").await.unwrap().unwrap();
        assert!(store.watch_event("missing").await.unwrap().is_none());

        let raw: RawStageSettings =
            serde_json::from_value(serde_json::json!({ "imgCount": 2 })).unwrap();
        store.update_settings("gala", raw.clone()).await.unwrap();
        assert_eq!(event.borrow_and_update().settings, raw);

        store.set_disabled("gala", true).unwrap();
        assert!(event.borrow_and_update().disabled);
        assert!(store.update_settings("missing", raw).await.is_err());
    }
}
