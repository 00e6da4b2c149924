//! Transport stages wrapped around the active graph
//!
//! - [`Ctrl`]: pause gate
//! - [`Resample`]: playback speed by linear interpolation
//! - [`Volume`]: linear gain from a 0-100 percent setting
//!
//! Each stage is generic over the source it wraps so the transport can reach
//! through the chain to the region looper without downcasting.

use crate::audio::types::AudioFrame;
use crate::error::{Error, Result};
use crate::playback::source::Source;

/// Pause gate.
///
/// While paused, `fill` emits silence for the whole buffer, reports "more"
/// and leaves the wrapped source untouched.
pub struct Ctrl<S> {
    inner: S,
    paused: bool,
}

impl<S: Source> Ctrl<S> {
    /// Unpaused gate around `inner`.
    pub fn new(inner: S) -> Self {
        Self { inner, paused: false }
    }

    /// Whether the gate is closed
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Open or close the gate.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Borrow the wrapped source.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Mutably borrow the wrapped source.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S: Source> Source for Ctrl<S> {
    fn fill(&mut self, out: &mut [AudioFrame]) -> (usize, bool) {
        if self.paused {
            out.fill(AudioFrame::zero());
            return (out.len(), true);
        }
        self.inner.fill(out)
    }

    fn seek(&mut self, pos: usize) -> Result<()> {
        self.inner.seek(pos)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn position(&self) -> usize {
        self.inner.position()
    }
}

/// Frames pulled from the wrapped source per refill
const RESAMPLE_CHUNK: usize = 64;

/// Slowest accepted speed multiplier
pub const MIN_SPEED: f64 = 0.01;

/// Fastest accepted speed multiplier
pub const MAX_SPEED: f64 = 100.0;

/// Speed stage.
///
/// `ratio` is input frames consumed per output frame: 2.0 plays twice as
/// fast (pitch up an octave), 0.5 half as fast. A ratio of exactly 1.0 passes
/// frames through unchanged.
pub struct Resample<S> {
    inner: S,
    ratio: f64,
    chunk: [AudioFrame; RESAMPLE_CHUNK],
    chunk_len: usize,
    chunk_pos: usize,
    cur: Option<AudioFrame>,
    next: Option<AudioFrame>,
    frac: f64,
    primed: bool,
}

impl<S: Source> Resample<S> {
    /// Speed stage at 1.0x.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            ratio: 1.0,
            chunk: [AudioFrame::zero(); RESAMPLE_CHUNK],
            chunk_len: 0,
            chunk_pos: 0,
            cur: None,
            next: None,
            frac: 0.0,
            primed: false,
        }
    }

    /// Current speed multiplier
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Change the speed multiplier.
    ///
    /// # Errors
    /// `InvalidInput` unless `ratio` lies in [`MIN_SPEED`, `MAX_SPEED`].
    pub fn set_ratio(&mut self, ratio: f64) -> Result<()> {
        if !(MIN_SPEED..=MAX_SPEED).contains(&ratio) {
            return Err(Error::InvalidInput(format!(
                "speed must be between {} and {}, got {}",
                MIN_SPEED, MAX_SPEED, ratio
            )));
        }
        self.ratio = ratio;
        Ok(())
    }

    /// Borrow the wrapped source.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Mutably borrow the wrapped source.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Drop buffered lookahead; the next fill re-primes from the inner cursor.
    fn reset(&mut self) {
        self.chunk_len = 0;
        self.chunk_pos = 0;
        self.cur = None;
        self.next = None;
        self.frac = 0.0;
        self.primed = false;
    }

    fn pull_one(&mut self) -> Option<AudioFrame> {
        if self.chunk_pos == self.chunk_len {
            let (count, _more) = self.inner.fill(&mut self.chunk);
            self.chunk_len = count;
            self.chunk_pos = 0;
            if count == 0 {
                return None;
            }
        }
        let frame = self.chunk[self.chunk_pos];
        self.chunk_pos += 1;
        Some(frame)
    }

    /// Frames pulled from the inner source but not yet played
    fn lookahead(&self) -> usize {
        (self.chunk_len - self.chunk_pos) + usize::from(self.next.is_some())
    }
}

impl<S: Source> Source for Resample<S> {
    fn fill(&mut self, out: &mut [AudioFrame]) -> (usize, bool) {
        if !self.primed {
            self.cur = self.pull_one();
            self.next = self.pull_one();
            self.frac = 0.0;
            self.primed = true;
        }

        for (written, slot) in out.iter_mut().enumerate() {
            while self.frac >= 1.0 {
                self.cur = self.next.take();
                if self.cur.is_none() {
                    break;
                }
                self.next = self.pull_one();
                self.frac -= 1.0;
            }

            let Some(cur) = self.cur else {
                return (written, false);
            };
            *slot = match self.next {
                Some(next) => cur.lerp(&next, self.frac as f32),
                None => cur,
            };
            self.frac += self.ratio;
        }

        (out.len(), true)
    }

    fn seek(&mut self, pos: usize) -> Result<()> {
        self.inner.seek(pos)?;
        self.reset();
        Ok(())
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    /// Input frame the next output frame starts from.
    ///
    /// The inner cursor runs ahead by the buffered lookahead, and may have
    /// wrapped inside it, so the answer comes from the inner source's recent
    /// history rather than plain subtraction.
    fn position(&self) -> usize {
        if self.cur.is_none() {
            return self.inner.position_before(self.lookahead());
        }
        // `cur` was produced `lookahead + 1` frames ago; the read head sits
        // `floor(frac)` frames past it.
        let behind = self.lookahead() + 1;
        let ahead = self.frac.floor() as usize;
        if ahead <= behind {
            self.inner.position_before(behind - ahead)
        } else {
            (self.inner.position() + (ahead - behind)).min(self.inner.len())
        }
    }
}

/// Gain stage driven by a 0-100 volume percentage.
///
/// Gain is linear: 0% is silence, 100% is unity.
pub struct Volume<S> {
    inner: S,
    percent: u8,
    gain: f32,
}

impl<S: Source> Volume<S> {
    /// Gain stage at `percent` (clamped to 100).
    pub fn new(inner: S, percent: u8) -> Self {
        let mut volume = Self {
            inner,
            percent: 100,
            gain: 1.0,
        };
        volume.set_percent(percent);
        volume
    }

    /// Current volume percentage
    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// Current linear gain factor
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Set the volume; values above 100 are clamped.
    pub fn set_percent(&mut self, percent: u8) {
        self.percent = percent.min(100);
        self.gain = self.percent as f32 / 100.0;
    }

    /// Borrow the wrapped source.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Mutably borrow the wrapped source.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S: Source> Source for Volume<S> {
    fn fill(&mut self, out: &mut [AudioFrame]) -> (usize, bool) {
        let (count, more) = self.inner.fill(out);
        if self.gain != 1.0 {
            for frame in out[..count].iter_mut() {
                frame.apply_volume(self.gain);
            }
        }
        (count, more)
    }

    fn seek(&mut self, pos: usize) -> Result<()> {
        self.inner.seek(pos)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn position(&self) -> usize {
        self.inner.position()
    }
}
