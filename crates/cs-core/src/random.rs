//! # Random Sources
//!
//! Presentation metadata is random. The source is injected so tests can
//! script exact values.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{ContentKind, EntryAnimation, PresentationSeed};

/// Maximum card tilt, in degrees, either side of upright.
pub const MAX_TILT_DEGREES: f64 = 3.0;

pub trait RandomSource: Send {
    /// Uniform index in `0..len`. `len` is never zero.
    fn index(&mut self, len: usize) -> usize;

    /// Uniform value in `[low, high)`.
    fn between(&mut self, low: f64, high: f64) -> f64;
}

/// `StdRng`-backed source for production use.
pub struct StdRandom(StdRng);

impl StdRandom {
    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }

    /// Reproducible sequence, handy for rehearsals.
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl RandomSource for StdRandom {
    fn index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.0.gen_range(0..len)
    }

    fn between(&mut self, low: f64, high: f64) -> f64 {
        if low >= high {
            return low;
        }
        self.0.gen_range(low..high)
    }
}

/// Replays fixed values in order, then repeats from the start.
///
/// Indices are reduced modulo the requested length; floats are used as-is.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    indices: VecDeque<usize>,
    values: VecDeque<f64>,
}

impl ScriptedRandom {
    pub fn new(
        indices: impl IntoIterator<Item = usize>,
        values: impl IntoIterator<Item = f64>,
    ) -> Self {
        Self {
            indices: indices.into_iter().collect(),
            values: values.into_iter().collect(),
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn index(&mut self, len: usize) -> usize {
        match self.indices.pop_front() {
            Some(i) => {
                self.indices.push_back(i);
                if len == 0 { 0 } else { i % len }
            }
            None => 0,
        }
    }

    fn between(&mut self, low: f64, _high: f64) -> f64 {
        match self.values.pop_front() {
            Some(v) => {
                self.values.push_back(v);
                v
            }
            None => low,
        }
    }
}

impl PresentationSeed {
    /// Draws a fresh seed. Image-like cards get a random tilt; text stays upright.
    pub fn draw(kind: ContentKind, rng: &mut dyn RandomSource) -> Self {
        let animation = EntryAnimation::ALL[rng.index(EntryAnimation::ALL.len())];
        let tilt_degrees = match kind {
            ContentKind::ImageLike => rng.between(-MAX_TILT_DEGREES, MAX_TILT_DEGREES),
            ContentKind::Text => 0.0,
        };
        Self { animation, tilt_degrees }
    }
}
