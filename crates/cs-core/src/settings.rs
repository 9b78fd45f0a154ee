//! # Stage Settings
//!
//! Per-event, moderator-editable slot counts and rotation periods.
//!
//! The stage reads settings leniently ([`StageSettings::resolve`]): anything
//! missing or malformed falls back to the defaults and no upper bound is
//! imposed. Bounds are only enforced when a moderator submits new values
//! ([`StageSettings::accept`]).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::ContentKind;

pub const DEFAULT_IMAGE_CAPACITY: usize = 3;
pub const DEFAULT_TEXT_CAPACITY: usize = 5;
pub const DEFAULT_PERIOD_SECS: u64 = 5;

pub const MAX_IMAGE_CAPACITY: usize = 3;
pub const MAX_TEXT_CAPACITY: usize = 6;
pub const MIN_PERIOD_SECS: f64 = 1.0;

/// Largest slot count [`StageSettings::resolve`] takes at face value. Anything
/// above is treated as a malformed document.
pub const MAX_RESOLVED_CAPACITY: usize = u16::MAX as usize;

/// Settings as stored on the event document.
///
/// Values are kept as raw JSON so a malformed field (a string, a negative
/// number) degrades to its default instead of failing the whole document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStageSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_timer: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_timer: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_count: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_count: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindSettings {
    pub capacity: usize,
    pub tick_period: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSettings {
    pub image: KindSettings,
    pub text: KindSettings,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            image: KindSettings {
                capacity: DEFAULT_IMAGE_CAPACITY,
                tick_period: Duration::from_secs(DEFAULT_PERIOD_SECS),
            },
            text: KindSettings {
                capacity: DEFAULT_TEXT_CAPACITY,
                tick_period: Duration::from_secs(DEFAULT_PERIOD_SECS),
            },
        }
    }
}

/// Reads a JSON number or numeric string.
fn number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

fn lenient_capacity(value: Option<&Value>, default: usize) -> usize {
    match number(value) {
        Some(n) if (1.0..=MAX_RESOLVED_CAPACITY as f64).contains(&n) => n.trunc() as usize,
        _ => default,
    }
}

fn lenient_period(value: Option<&Value>) -> Duration {
    number(value)
        .filter(|n| *n > 0.0)
        .and_then(|n| Duration::try_from_secs_f64(n).ok())
        .unwrap_or(Duration::from_secs(DEFAULT_PERIOD_SECS))
}

fn strict_capacity(name: &str, value: Option<&Value>, max: usize) -> Result<Option<usize>> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let n = number(Some(raw))
        .filter(|n| n.fract() == 0.0)
        .ok_or_else(|| AppError::ValidationError(format!("{name} must be a whole number")))?;
    if n < 1.0 || n > max as f64 {
        return Err(AppError::ValidationError(format!(
            "{name} must be between 1 and {max}, got {n}"
        )));
    }
    Ok(Some(n as usize))
}

fn strict_period(name: &str, value: Option<&Value>) -> Result<Option<Duration>> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let n = number(Some(raw))
        .ok_or_else(|| AppError::ValidationError(format!("{name} must be a number of seconds")))?;
    if n < MIN_PERIOD_SECS {
        return Err(AppError::ValidationError(format!(
            "{name} must be at least {MIN_PERIOD_SECS} second(s), got {n}"
        )));
    }
    Duration::try_from_secs_f64(n)
        .map(Some)
        .map_err(|_| AppError::ValidationError(format!("{name} is out of range")))
}

impl StageSettings {
    pub fn for_kind(&self, kind: ContentKind) -> KindSettings {
        match kind {
            ContentKind::ImageLike => self.image,
            ContentKind::Text => self.text,
        }
    }

    /// Lenient read used by the running stage. Never fails.
    pub fn resolve(raw: &RawStageSettings) -> Self {
        Self {
            image: KindSettings {
                capacity: lenient_capacity(raw.img_count.as_ref(), DEFAULT_IMAGE_CAPACITY),
                tick_period: lenient_period(raw.img_timer.as_ref()),
            },
            text: KindSettings {
                capacity: lenient_capacity(raw.text_count.as_ref(), DEFAULT_TEXT_CAPACITY),
                tick_period: lenient_period(raw.text_timer.as_ref()),
            },
        }
    }

    /// Strict read used when a moderator submits settings.
    ///
    /// Absent fields keep their defaults; present fields must be in range.
    pub fn accept(raw: &RawStageSettings) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            image: KindSettings {
                capacity: strict_capacity("imgCount", raw.img_count.as_ref(), MAX_IMAGE_CAPACITY)?
                    .unwrap_or(defaults.image.capacity),
                tick_period: strict_period("imgTimer", raw.img_timer.as_ref())?
                    .unwrap_or(defaults.image.tick_period),
            },
            text: KindSettings {
                capacity: strict_capacity("textCount", raw.text_count.as_ref(), MAX_TEXT_CAPACITY)?
                    .unwrap_or(defaults.text.capacity),
                tick_period: strict_period("textTimer", raw.text_timer.as_ref())?
                    .unwrap_or(defaults.text.tick_period),
            },
        })
    }

    /// Wire shape for storing on the event document.
    pub fn to_raw(&self) -> RawStageSettings {
        RawStageSettings {
            img_timer: Some(Value::from(self.image.tick_period.as_secs_f64())),
            text_timer: Some(Value::from(self.text.tick_period.as_secs_f64())),
            img_count: Some(Value::from(self.image.capacity as u64)),
            text_count: Some(Value::from(self.text.capacity as u64)),
        }
    }
}
