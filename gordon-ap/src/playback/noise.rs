//! Pink noise generator (Voss–McCartney)
//!
//! Sixteen rows of independent uniform random values are summed. Row `z` is
//! redrawn whenever the running index has exactly `z` trailing zero bits, so
//! row 0 changes every other frame, row 1 every fourth, and so on. The
//! result has roughly 1/f power density without keeping any history.

use crate::audio::types::AudioFrame;
use crate::error::{Error, Result};
use crate::playback::source::{Source, INFINITE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Number of random rows summed per output frame
pub const ROWS: usize = 16;

/// Infinite, non-seekable pink noise source.
///
/// Output is identical on both channels and bounded to [-1.0, 1.0].
pub struct PinkNoise {
    rows: [f64; ROWS],
    sum: f64,
    index: u64,
    position: usize,
    rng: StdRng,
}

impl PinkNoise {
    /// Generator seeded from OS entropy.
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Deterministic generator for reproducible output.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        let mut noise = Self {
            rows: [0.0; ROWS],
            sum: 0.0,
            index: 0,
            position: 0,
            rng,
        };
        noise.draw_rows();
        noise
    }

    /// Redraw every row and restart the index.
    ///
    /// The frame counter reported by `position()` keeps running.
    pub fn reset(&mut self) {
        self.draw_rows();
        self.index = 0;
    }

    fn draw_rows(&mut self) {
        for row in self.rows.iter_mut() {
            *row = self.rng.gen_range(-1.0..1.0);
        }
        self.sum = self.rows.iter().sum();
    }

    fn next_sample(&mut self) -> f32 {
        self.index = self.index.wrapping_add(1);
        let z = self.index.trailing_zeros() as usize;
        if z < ROWS {
            let value: f64 = self.rng.gen_range(-1.0..1.0);
            self.sum += value - self.rows[z];
            self.rows[z] = value;
        }
        (self.sum / ROWS as f64).clamp(-1.0, 1.0) as f32
    }
}

impl Default for PinkNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl Source for PinkNoise {
    fn fill(&mut self, out: &mut [AudioFrame]) -> (usize, bool) {
        for frame in out.iter_mut() {
            *frame = AudioFrame::from_mono(self.next_sample());
        }
        self.position = self.position.saturating_add(out.len());
        (out.len(), true)
    }

    fn seek(&mut self, _pos: usize) -> Result<()> {
        Err(Error::Unsupported("pink noise cannot seek".to_string()))
    }

    fn len(&self) -> usize {
        INFINITE
    }

    fn position(&self) -> usize {
        self.position
    }
}
