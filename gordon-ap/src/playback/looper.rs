//! Bounded region looper
//!
//! Restricts playback of a seekable source to `[start, end)` and repeats it
//! `remaining` times (negative repeats forever). Reaching `end`, or the inner
//! source running dry, is one iteration boundary.
//!
//! Region changes apply at the next boundary evaluation: if the cursor is
//! already past a newly set `end`, playback continues to the end of the inner
//! source before jumping back to `start`.

use crate::audio::types::AudioFrame;
use crate::error::{Error, Result};
use crate::playback::source::Source;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Repeat count that never runs out
pub const LOOP_FOREVER: i64 = -1;

/// Frames of output for which [`Source::position_before`] stays exact
pub const POSITION_HISTORY: usize = 256;

/// Output count at which the cursor last jumped, and where it landed
#[derive(Debug, Clone, Copy)]
struct Jump {
    produced: u64,
    landed: usize,
}

/// Region looper over one seekable source.
pub struct RegionLooper<S = Box<dyn Source>> {
    inner: S,
    start: usize,
    end: usize,
    remaining: i64,
    exhausted: bool,
    /// Frames produced since construction
    produced: u64,
    /// Recent jumps, oldest first; never empty
    jumps: VecDeque<Jump>,
}

impl<S: Source> RegionLooper<S> {
    /// Loop `[start, end)` of `inner` `remaining` times.
    ///
    /// The inner source is positioned at `start`.
    ///
    /// # Errors
    /// - `InvalidRange` if `start > end`
    /// - `OutOfRange` if `end` is past the inner source's length
    pub fn new(inner: S, start: usize, end: usize, remaining: i64) -> Result<Self> {
        Self::check_region(inner.len(), start, end)?;
        let mut looper = Self {
            inner,
            start,
            end,
            remaining,
            exhausted: remaining == 0,
            produced: 0,
            jumps: VecDeque::with_capacity(POSITION_HISTORY + 2),
        };
        looper.inner.seek(start)?;
        looper.record_jump(start);
        Ok(looper)
    }

    /// Single pass over the whole inner source.
    pub fn whole(inner: S) -> Result<Self> {
        let len = inner.len();
        Self::new(inner, 0, len, 1)
    }

    fn check_region(len: usize, start: usize, end: usize) -> Result<()> {
        if start > end {
            return Err(Error::InvalidRange(format!(
                "loop start {} is after end {}",
                start, end
            )));
        }
        if end > len {
            return Err(Error::OutOfRange(format!(
                "loop end {} beyond length {}",
                end, len
            )));
        }
        Ok(())
    }

    /// Replace the loop region and repeat count.
    ///
    /// Takes effect at the next boundary check; the cursor is not moved.
    pub fn set_region(&mut self, start: usize, end: usize, remaining: i64) -> Result<()> {
        Self::check_region(self.inner.len(), start, end)?;
        self.start = start;
        self.end = end;
        self.remaining = remaining;
        self.exhausted = remaining == 0;
        debug!("Loop region set: [{}, {}) x{}", start, end, remaining);
        Ok(())
    }

    /// Region start in frames
    pub fn start(&self) -> usize {
        self.start
    }

    /// Region end in frames
    pub fn end(&self) -> usize {
        self.end
    }

    /// Iterations left (negative = infinite)
    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    /// True once the repeat count has run out
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Borrow the wrapped source.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Mutably borrow the wrapped source.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Remember that the cursor moved to `landed` at the current output count.
    ///
    /// Jumps older than [`POSITION_HISTORY`] frames are dropped, except the
    /// one that still covers the start of that window. The queue never
    /// outgrows its initial capacity.
    fn record_jump(&mut self, landed: usize) {
        let horizon = self.produced.saturating_sub(POSITION_HISTORY as u64);
        while self.jumps.len() > 1 && self.jumps[1].produced <= horizon {
            self.jumps.pop_front();
        }
        let jump = Jump {
            produced: self.produced,
            landed,
        };
        match self.jumps.back_mut() {
            Some(last) if last.produced == self.produced => *last = jump,
            _ => self.jumps.push_back(jump),
        }
    }

    /// Handle one iteration boundary. Returns false when looping stops.
    fn on_boundary(&mut self) -> bool {
        if self.remaining > 0 {
            self.remaining -= 1;
            if self.remaining == 0 {
                return false;
            }
        }
        match self.inner.seek(self.start) {
            Ok(()) => {
                self.record_jump(self.start);
                true
            }
            Err(e) => {
                warn!("Loop restart failed, stopping: {}", e);
                false
            }
        }
    }
}

impl<S: Source> Source for RegionLooper<S> {
    fn fill(&mut self, out: &mut [AudioFrame]) -> (usize, bool) {
        if self.exhausted || self.start == self.end {
            self.exhausted = true;
            return (0, false);
        }

        let mut filled = 0;
        let mut idle_boundaries = 0;

        while filled < out.len() {
            let pos = self.inner.position();

            let (count, boundary) = if pos == self.end {
                (0, true)
            } else {
                let want = out.len() - filled;
                let limit = if pos < self.end {
                    want.min(self.end - pos)
                } else {
                    want
                };
                let (count, more) = self.inner.fill(&mut out[filled..filled + limit]);
                (count, !more || (pos < self.end && pos + count >= self.end))
            };
            filled += count;
            self.produced += count as u64;

            if !boundary {
                if count == 0 {
                    break;
                }
                continue;
            }

            // Two boundaries in a row without producing anything would spin
            if count == 0 {
                idle_boundaries += 1;
                if idle_boundaries >= 2 {
                    self.exhausted = true;
                    return (filled, false);
                }
            } else {
                idle_boundaries = 0;
            }

            if !self.on_boundary() {
                self.exhausted = true;
                return (filled, false);
            }
        }

        (filled, true)
    }

    fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.inner.len() {
            return Err(Error::OutOfRange(format!(
                "seek to frame {} beyond length {}",
                pos,
                self.inner.len()
            )));
        }
        self.inner.seek(pos)?;
        self.record_jump(pos);
        if self.exhausted {
            self.exhausted = false;
            if self.remaining == 0 {
                self.remaining = 1;
            }
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn position(&self) -> usize {
        self.inner.position()
    }

    fn position_before(&self, frames: usize) -> usize {
        let target = self.produced.saturating_sub(frames as u64);
        match self.jumps.iter().rev().find(|j| j.produced <= target) {
            Some(jump) => jump.landed + (target - jump.produced) as usize,
            None => self
                .jumps
                .front()
                .map_or_else(|| self.inner.position(), |j| j.landed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::buffer_source::BufferSource;

    fn ramp(n: usize) -> Box<dyn Source> {
        Box::new(BufferSource::new(
            (0..n).map(|i| AudioFrame::from_mono(i as f32)).collect(),
        ))
    }

    /// Pull until exhaustion, returning the left channel of everything produced
    fn drain(looper: &mut RegionLooper, chunk: usize, cap: usize) -> Vec<f32> {
        let mut out = Vec::new();
        let mut buf = vec![AudioFrame::zero(); chunk];
        loop {
            let (n, more) = looper.fill(&mut buf);
            out.extend(buf[..n].iter().map(|f| f.left));
            if !more || out.len() >= cap {
                return out;
            }
        }
    }

    #[test]
    fn test_single_pass_exact_count() {
        for (start, end) in [(0, 100), (10, 50), (37, 38), (99, 100)] {
            for chunk in [1, 7, 64, 256] {
                let mut looper = RegionLooper::new(ramp(100), start, end, 1).unwrap();
                let out = drain(&mut looper, chunk, 10_000);
                assert_eq!(out.len(), end - start, "[{}, {}) chunk {}", start, end, chunk);
                assert_eq!(out[0], start as f32);
                assert!(looper.is_exhausted());
            }
        }
    }

    #[test]
    fn test_repeat_count() {
        let mut looper = RegionLooper::new(ramp(20), 5, 10, 3).unwrap();
        let out = drain(&mut looper, 4, 1000);
        let expected: Vec<f32> = (0..3).flat_map(|_| (5..10).map(|i| i as f32)).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_infinite_matches_raw_restart() {
        let mut looper = RegionLooper::new(ramp(50), 0, 50, LOOP_FOREVER).unwrap();
        let out = drain(&mut looper, 33, 50 * 6);

        let first: Vec<f32> = (0..50).map(|i| i as f32).collect();
        for iteration in out.chunks(50).take(5) {
            assert_eq!(iteration, first.as_slice());
        }
        assert!(!looper.is_exhausted());
    }

    #[test]
    fn test_zero_width_region_exhausts() {
        for remaining in [LOOP_FOREVER, 1, 5] {
            let mut looper = RegionLooper::new(ramp(10), 4, 4, remaining).unwrap();
            let mut buf = [AudioFrame::zero(); 8];
            assert_eq!(looper.fill(&mut buf), (0, false));
            assert_eq!(looper.fill(&mut buf), (0, false));
        }
    }

    #[test]
    fn test_zero_remaining_is_exhausted() {
        let mut looper = RegionLooper::new(ramp(10), 0, 10, 0).unwrap();
        let mut buf = [AudioFrame::zero(); 4];
        assert_eq!(looper.fill(&mut buf), (0, false));
    }

    #[test]
    fn test_fill_after_exhaustion_until_seek() {
        let mut looper = RegionLooper::whole(ramp(6)).unwrap();
        let mut buf = [AudioFrame::zero(); 4];
        assert_eq!(looper.fill(&mut buf), (4, true));
        assert_eq!(looper.fill(&mut buf), (2, false));
        assert_eq!(looper.fill(&mut buf), (0, false));

        looper.seek(3).unwrap();
        assert_eq!(looper.fill(&mut buf), (3, false));
        assert_eq!(buf[0].left, 3.0);
    }

    #[test]
    fn test_invalid_regions() {
        assert!(matches!(
            RegionLooper::new(ramp(10), 6, 5, 1),
            Err(Error::InvalidRange(_))
        ));
        assert!(matches!(
            RegionLooper::new(ramp(10), 0, 11, 1),
            Err(Error::OutOfRange(_))
        ));

        let mut looper = RegionLooper::whole(ramp(10)).unwrap();
        assert!(matches!(looper.set_region(3, 2, 1), Err(Error::InvalidRange(_))));
        assert_eq!((looper.start(), looper.end()), (0, 10));
    }

    #[test]
    fn test_seek_outside_region_allowed() {
        let mut looper = RegionLooper::new(ramp(100), 10, 20, LOOP_FOREVER).unwrap();
        looper.seek(80).unwrap();
        assert_eq!(looper.position(), 80);
        assert_eq!(looper.len(), 100);
        assert!(matches!(looper.seek(101), Err(Error::OutOfRange(_))));

        // Past the region: plays to the end of the source, then jumps to start
        let out = drain(&mut looper, 25, 25);
        let expected: Vec<f32> = (80..100).chain(10..15).map(|i| i as f32).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_set_region_applies_at_next_boundary() {
        let mut looper = RegionLooper::new(ramp(100), 0, 100, LOOP_FOREVER).unwrap();
        let mut buf = [AudioFrame::zero(); 30];
        looper.fill(&mut buf);

        // Cursor at 30 is inside the new region: the new end is the next boundary
        looper.set_region(20, 40, LOOP_FOREVER).unwrap();
        let out = drain(&mut looper, 15, 30);
        let expected: Vec<f32> = (30..40).chain(20..40).map(|i| i as f32).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_position_before_follows_wraps() {
        let mut looper = RegionLooper::new(ramp(100), 20, 60, LOOP_FOREVER).unwrap();
        let mut buf = vec![AudioFrame::zero(); 50];
        assert_eq!(looper.fill(&mut buf), (50, true));
        assert_eq!(buf[39].left, 59.0);
        assert_eq!(buf[40].left, 20.0);

        assert_eq!(looper.position(), 30);
        assert_eq!(looper.position_before(0), 30);
        assert_eq!(looper.position_before(10), 20);
        assert_eq!(looper.position_before(11), 59);
        assert_eq!(looper.position_before(50), 20);

        looper.seek(45).unwrap();
        let mut buf = vec![AudioFrame::zero(); 20];
        looper.fill(&mut buf);
        assert_eq!(looper.position(), 25);
        assert_eq!(looper.position_before(5), 20);
        assert_eq!(looper.position_before(6), 59);
        assert_eq!(looper.position_before(20), 45);
    }

    #[test]
    fn test_position_history_stays_bounded() {
        let mut looper = RegionLooper::new(ramp(10), 3, 4, LOOP_FOREVER).unwrap();
        let out = drain(&mut looper, 64, 10_000);
        assert!(out.iter().all(|&v| v == 3.0));
        assert!(looper.jumps.len() <= POSITION_HISTORY + 2, "{}", looper.jumps.len());
        assert_eq!(looper.position_before(POSITION_HISTORY), 3);
    }
}
