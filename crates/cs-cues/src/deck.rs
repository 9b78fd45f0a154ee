//! # Stage Deck
//!
//! Moderators steer the stage screen with cues: a background photo or video,
//! a music track, volumes, overlay visibility and full-screen announcements.
//! [`StageDeck`] folds those cues into the state the screen renders.
//!
//! Wire format is `{ "action": "SET_VIDEO_VOLUME", "payload": 0.4 }`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How long an announcement stays on screen.
pub const ANNOUNCEMENT_SECS: i64 = 10;

pub const DEFAULT_VIDEO_VOLUME: f64 = 1.0;
pub const DEFAULT_AUDIO_VOLUME: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCueKind {
    Image,
    Video,
}

/// Background media behind the slot overlays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaCue {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: MediaCueKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageCue {
    /// `null` clears the background.
    SetMedia(Option<MediaCue>),
    /// Switching tracks also starts playback. `null` clears the track.
    SetAudio(Option<String>),
    PlayVideo,
    PauseVideo,
    SetVideoVolume(f64),
    PlayAudio,
    PauseAudio,
    SetAudioVolume(f64),
    ToggleOverlays(bool),
    Announcement(String),
}

/// Reports sent from the stage back to moderators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageNotice {
    VideoEnded,
    AudioEnded,
}

#[derive(Debug, Clone, PartialEq)]
struct Announcement {
    text: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageDeck {
    media: Option<MediaCue>,
    audio: Option<String>,
    video_playing: bool,
    audio_playing: bool,
    video_volume: f64,
    audio_volume: f64,
    overlays: bool,
    announcement: Option<Announcement>,
}

impl Default for StageDeck {
    fn default() -> Self {
        Self {
            media: None,
            audio: None,
            video_playing: true,
            audio_playing: false,
            video_volume: DEFAULT_VIDEO_VOLUME,
            audio_volume: DEFAULT_AUDIO_VOLUME,
            overlays: true,
            announcement: None,
        }
    }
}

/// What the screen renders for the deck at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckView {
    pub media: Option<MediaCue>,
    pub audio: Option<String>,
    pub video_playing: bool,
    pub audio_playing: bool,
    pub video_volume: f64,
    pub audio_volume: f64,
    /// False while an announcement covers the stage.
    pub overlays_visible: bool,
    pub announcement: Option<String>,
}

fn volume(raw: f64) -> Option<f64> {
    raw.is_finite().then(|| raw.clamp(0.0, 1.0))
}

impl StageDeck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one cue. Returns false when the cue was ignored
    /// (empty announcement, non-finite volume).
    pub fn apply(&mut self, cue: StageCue, now: DateTime<Utc>) -> bool {
        debug!(?cue, "stage cue");
        match cue {
            StageCue::SetMedia(media) => self.media = media,
            StageCue::SetAudio(track) => {
                self.audio = track;
                self.audio_playing = true;
            }
            StageCue::PlayVideo => self.video_playing = true,
            StageCue::PauseVideo => self.video_playing = false,
            StageCue::PlayAudio => self.audio_playing = true,
            StageCue::PauseAudio => self.audio_playing = false,
            StageCue::SetVideoVolume(v) => match volume(v) {
                Some(v) => self.video_volume = v,
                None => {
                    warn!(value = v, "ignoring video volume");
                    return false;
                }
            },
            StageCue::SetAudioVolume(v) => match volume(v) {
                Some(v) => self.audio_volume = v,
                None => {
                    warn!(value = v, "ignoring audio volume");
                    return false;
                }
            },
            StageCue::ToggleOverlays(visible) => self.overlays = visible,
            StageCue::Announcement(text) => {
                if text.trim().is_empty() {
                    return false;
                }
                // Each announcement carries its own expiry, so a newer one
                // is never cut short by an older one's timer.
                self.announcement = Some(Announcement {
                    text,
                    expires_at: now + Duration::seconds(ANNOUNCEMENT_SECS),
                });
            }
        }
        true
    }

    /// The announcement on screen at `now`, if any.
    pub fn announcement(&self, now: DateTime<Utc>) -> Option<&str> {
        self.announcement
            .as_ref()
            .filter(|a| now < a.expires_at)
            .map(|a| a.text.as_str())
    }

    pub fn overlays_visible(&self, now: DateTime<Utc>) -> bool {
        self.overlays && self.announcement(now).is_none()
    }

    pub fn view(&self, now: DateTime<Utc>) -> DeckView {
        DeckView {
            media: self.media.clone(),
            audio: self.audio.clone(),
            video_playing: self.video_playing,
            audio_playing: self.audio_playing,
            video_volume: self.video_volume,
            audio_volume: self.audio_volume,
            overlays_visible: self.overlays_visible(now),
            announcement: self.announcement(now).map(str::to_owned),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cue(value: serde_json::Value) -> StageCue {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn defaults_match_a_fresh_screen() {
        let view = StageDeck::new().view(Utc::now());
        assert!(view.video_playing);
        assert!(!view.audio_playing);
        assert_eq!(view.video_volume, 1.0);
        assert_eq!(view.audio_volume, 0.5);
        assert!(view.overlays_visible);
        assert!(view.media.is_none());
    }

    #[test]
    fn wire_format_parses() {
        assert_eq!(cue(json!({ "action": "PLAY_VIDEO" })), StageCue::PlayVideo);
        assert_eq!(cue(json!({ "action": "SET_MEDIA", "payload": null })), StageCue::SetMedia(None));
        assert_eq!(
            cue(json!({ "action": "SET_MEDIA", "payload": { "url": "u", "type": "video" } })),
            StageCue::SetMedia(Some(MediaCue { url: "u".into(), kind: MediaCueKind::Video }))
        );
        assert_eq!(
            cue(json!({ "action": "TOGGLE_OVERLAYS", "payload": false })),
            StageCue::ToggleOverlays(false)
        );
        assert!(serde_json::from_value::<StageCue>(json!({ "action": "SELF_DESTRUCT" })).is_err());
        assert_eq!(
            serde_json::to_value(StageNotice::VideoEnded).unwrap(),
            json!({ "action": "VIDEO_ENDED" })
        );
    }

    #[test]
    fn set_audio_starts_playback_and_volumes_clamp() {
        let now = Utc::now();
        let mut deck = StageDeck::new();
        assert!(deck.apply(StageCue::SetAudio(Some("track.mp3".into())), now));
        assert!(deck.apply(StageCue::SetVideoVolume(1.7), now));
        assert!(deck.apply(StageCue::SetAudioVolume(-0.2), now));
        assert!(!deck.apply(StageCue::SetAudioVolume(f64::NAN), now));

        let view = deck.view(now);
        assert!(view.audio_playing);
        assert_eq!(view.audio.as_deref(), Some("track.mp3"));
        assert_eq!(view.video_volume, 1.0);
        assert_eq!(view.audio_volume, 0.0);
    }

    #[test]
    fn announcement_hides_overlays_for_ten_seconds() {
        let now = Utc::now();
        let mut deck = StageDeck::new();
        assert!(!deck.apply(StageCue::Announcement("  ".into()), now));
        assert!(deck.apply(StageCue::Announcement("Dinner is served".into()), now));

        assert_eq!(deck.announcement(now + Duration::seconds(9)), Some("Dinner is served"));
        assert!(!deck.overlays_visible(now + Duration::seconds(9)));
        assert!(deck.announcement(now + Duration::seconds(10)).is_none());
        assert!(deck.overlays_visible(now + Duration::seconds(10)));
    }

    #[test]
    fn later_announcement_gets_its_own_full_window() {
        let now = Utc::now();
        let mut deck = StageDeck::new();
        deck.apply(StageCue::Announcement("first".into()), now);
        deck.apply(StageCue::Announcement("second".into()), now + Duration::seconds(8));
        assert_eq!(deck.announcement(now + Duration::seconds(12)), Some("second"));
    }
}
