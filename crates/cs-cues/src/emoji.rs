//! # Emoji Bursts
//!
//! Attendee reactions float up the stage for a few seconds. Only fresh
//! reactions are shown, so a stage that (re)connects does not replay the
//! backlog.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use cs_core::RandomSource;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Reactions older than this when they reach the stage are dropped.
pub const FRESHNESS_SECS: i64 = 5;
pub const BURST_LIFETIME_SECS: i64 = 3;
pub const MAX_LIVE_BURSTS: usize = 25;
pub const FALLBACK_EMOJI: &str = "👍";

/// A reaction document as attendees write it. `emoji` is not trusted to be
/// a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmojiReaction {
    pub id: String,
    #[serde(default)]
    pub emoji: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmojiBurst {
    pub id: String,
    pub emoji: String,
    /// Horizontal position, percent of stage width.
    pub left_percent: f64,
    pub shown_at: DateTime<Utc>,
}

impl EmojiBurst {
    fn expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.shown_at + Duration::seconds(BURST_LIFETIME_SECS)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmojiBursts {
    live: VecDeque<EmojiBurst>,
}

impl EmojiBursts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows a reaction. Returns `None` for stale reactions and for ids that
    /// are already on screen.
    pub fn push(
        &mut self,
        reaction: EmojiReaction,
        now: DateTime<Utc>,
        rng: &mut dyn RandomSource,
    ) -> Option<&EmojiBurst> {
        if reaction.timestamp <= now - Duration::seconds(FRESHNESS_SECS) {
            debug!(reaction = %reaction.id, "stale reaction dropped");
            return None;
        }
        self.prune(now);
        if self.live.iter().any(|b| b.id == reaction.id) {
            return None;
        }

        let emoji = match reaction.emoji {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            _ => FALLBACK_EMOJI.to_string(),
        };
        if self.live.len() == MAX_LIVE_BURSTS {
            self.live.pop_front();
        }
        self.live.push_back(EmojiBurst {
            id: reaction.id,
            emoji,
            left_percent: rng.between(10.0, 90.0),
            shown_at: now,
        });
        self.live.back()
    }

    /// Drops expired bursts.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        self.live.retain(|b| !b.expired(now));
    }

    pub fn live(&self, now: DateTime<Utc>) -> Vec<EmojiBurst> {
        self.live.iter().filter(|b| !b.expired(now)).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
