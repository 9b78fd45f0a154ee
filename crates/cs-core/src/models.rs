//! # Domain Models
//!
//! Submissions as the document store holds them, the typed items the stage
//! rotates, and the per-placement presentation metadata.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::settings::RawStageSettings;

/// Which slot bank an item rotates through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentKind {
    /// Photos and videos.
    ImageLike,
    Text,
}

impl ContentKind {
    pub const ALL: [ContentKind; 2] = [ContentKind::ImageLike, ContentKind::Text];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::ImageLike => "image-like",
            ContentKind::Text => "text",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete media type carried in a submission's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Text,
}

impl MediaType {
    /// Parses the wire value. Anything else is an unknown kind.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "image" => Some(MediaType::Image),
            "video" => Some(MediaType::Video),
            "text" => Some(MediaType::Text),
            _ => None,
        }
    }

    pub fn kind(self) -> ContentKind {
        match self {
            MediaType::Image | MediaType::Video => ContentKind::ImageLike,
            MediaType::Text => ContentKind::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalState {
    Pending,
    Approved,
}

/// A submission document exactly as the store delivers it.
///
/// `media_type` stays a plain string so that documents written by newer
/// clients with unknown types still deserialize; they are dropped when
/// converted into a [`ContentItem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub id: String,
    pub event_id: String,
    #[serde(rename = "type")]
    pub media_type: String,
    /// Media URL for images and videos.
    #[serde(default)]
    pub image: Option<String>,
    /// Message body for text, caption for images and videos.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
    pub status: ApprovalState,
    /// Submission time; defines arrival order.
    pub timestamp: DateTime<Utc>,
}

/// Attendee input before the store assigns identity and time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionDraft {
    #[serde(rename = "type")]
    pub media_type: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
}

/// What a content item shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Payload {
    /// URL or blob reference of a photo or video.
    Media(String),
    Message(String),
}

/// An approved submission the stage can place into a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub media: MediaType,
    pub payload: Payload,
    pub caption: Option<String>,
    pub sender: Option<String>,
    /// Monotonic ordering key (submission time).
    pub arrival: DateTime<Utc>,
}

impl ContentItem {
    pub fn text(id: impl Into<String>, message: impl Into<String>, arrival: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            media: MediaType::Text,
            payload: Payload::Message(message.into()),
            caption: None,
            sender: None,
            arrival,
        }
    }

    pub fn image(id: impl Into<String>, url: impl Into<String>, arrival: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            media: MediaType::Image,
            payload: Payload::Media(url.into()),
            caption: None,
            sender: None,
            arrival,
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn kind(&self) -> ContentKind {
        self.media.kind()
    }
}

impl TryFrom<SubmissionRecord> for ContentItem {
    type Error = AppError;

    /// Only approved records of a known type become content items.
    fn try_from(record: SubmissionRecord) -> Result<Self, Self::Error> {
        if record.status != ApprovalState::Approved {
            return Err(AppError::ValidationError(format!(
                "submission {} is not approved",
                record.id
            )));
        }
        let media = MediaType::parse(&record.media_type).ok_or_else(|| {
            AppError::ValidationError(format!(
                "submission {} has unknown type '{}'",
                record.id, record.media_type
            ))
        })?;

        let (payload, caption) = match media {
            MediaType::Text => (Payload::Message(record.text.unwrap_or_default()), None),
            MediaType::Image | MediaType::Video => {
                (Payload::Media(record.image.unwrap_or_default()), record.text)
            }
        };

        Ok(Self {
            id: record.id,
            media,
            payload,
            caption,
            sender: record.sender,
            arrival: record.timestamp,
        })
    }
}

/// An event ("customer") whose stage is being driven.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub settings: RawStageSettings,
    #[serde(default)]
    pub background_image: Option<String>,
}

/// Entry animation played when a slot is (re)populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryAnimation {
    FadeIn,
    PopIn,
    SlideInRight,
}

impl EntryAnimation {
    pub const ALL: [EntryAnimation; 3] = [
        EntryAnimation::FadeIn,
        EntryAnimation::PopIn,
        EntryAnimation::SlideInRight,
    ];
}

/// Random presentation values drawn fresh for every placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationSeed {
    pub animation: EntryAnimation,
    /// Card tilt in degrees. Always zero for text.
    pub tilt_degrees: f64,
}
