//! # Core Traits (Ports)
//!
//! The document store sits behind these traits. Any plugin must implement
//! them to feed a stage.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::models::{ApprovalState, EventRecord, SubmissionDraft, SubmissionRecord};
use crate::settings::RawStageSettings;

/// Live, de-duplicated view of approved submissions.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait SubmissionFeed: Send + Sync {
    /// Subscribes to the approved submissions of one event.
    ///
    /// The receiver always holds the complete current set, never a delta.
    /// Rapid changes may be coalesced into one delivery. Dropping the
    /// receiver unsubscribes.
    async fn subscribe_approved(
        &self,
        event_id: &str,
    ) -> anyhow::Result<watch::Receiver<Vec<SubmissionRecord>>>;
}

/// Event documents and their moderator-editable settings.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait EventDirectory: Send + Sync {
    /// Watches one event document. `None` when the event does not exist.
    async fn watch_event(
        &self,
        event_id: &str,
    ) -> anyhow::Result<Option<watch::Receiver<EventRecord>>>;

    /// Stores new stage settings on the event document.
    async fn update_settings(&self, event_id: &str, settings: RawStageSettings)
        -> anyhow::Result<()>;
}

/// Attendee submissions and moderator decisions.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait ModerationStore: Send + Sync {
    /// Stores a new pending submission.
    async fn submit(&self, event_id: &str, draft: SubmissionDraft)
        -> anyhow::Result<SubmissionRecord>;

    /// Moves a submission of `event_id` between pending and approved.
    /// `None` when no such submission exists for that event.
    async fn set_status(
        &self,
        event_id: &str,
        submission_id: &str,
        status: ApprovalState,
    ) -> anyhow::Result<Option<SubmissionRecord>>;

    /// Deletes a submission of `event_id`. Returns false if that event has
    /// no such submission.
    async fn delete(&self, event_id: &str, submission_id: &str) -> anyhow::Result<bool>;
}
