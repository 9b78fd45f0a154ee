//! # cs-cues
//! crowdstage/crates/cs-cues/src/lib.rs
//! Side-channel state of the stage screen: moderator cues for background
//! media, audio, overlays and announcements, plus short-lived emoji bursts.

pub mod deck;
pub mod emoji;

pub use deck::{DeckView, MediaCue, MediaCueKind, StageCue, StageDeck, StageNotice};
pub use emoji::{EmojiBurst, EmojiBursts, EmojiReaction};
