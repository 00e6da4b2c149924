//! Pull-based sample source contract
//!
//! Every node of the playback graph (decoded buffers, the silence-prefixed
//! track wrapper, the mixer, the region looper, the pink noise generator and
//! the transport stages) implements [`Source`]. Composition happens through
//! `Box<dyn Source>`, so a stage never needs to know what it wraps.

use crate::audio::types::AudioFrame;
use crate::error::Result;

/// Length reported by unbounded generators
pub const INFINITE: usize = usize::MAX;

/// A seekable producer of stereo frames.
///
/// # Contract
/// - `fill` writes up to `out.len()` frames starting at the current position,
///   advances the position by the count written and returns `(count, more)`.
///   `more == false` means the source has nothing left after this call.
/// - Once a call returns `more == false`, later calls return `(0, false)`
///   until `seek` moves the cursor back before the end.
/// - `seek` is absolute and fails with `OutOfRange` past `len()`.
pub trait Source: Send {
    /// Fill `out` from the current position.
    fn fill(&mut self, out: &mut [AudioFrame]) -> (usize, bool);

    /// Move the read cursor to `pos` (in frames).
    fn seek(&mut self, pos: usize) -> Result<()>;

    /// Total length in frames, or [`INFINITE`].
    fn len(&self) -> usize;

    /// Current read cursor in frames.
    fn position(&self) -> usize;

    /// True for zero-length sources.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position the cursor had `frames` frames of output ago.
    ///
    /// Sources that jump (the region looper) override this to account for
    /// wraps. Only the recent past is answerable; older queries return the
    /// oldest known position.
    fn position_before(&self, frames: usize) -> usize {
        self.position().saturating_sub(frames)
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn fill(&mut self, out: &mut [AudioFrame]) -> (usize, bool) {
        (**self).fill(out)
    }

    fn seek(&mut self, pos: usize) -> Result<()> {
        (**self).seek(pos)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn position(&self) -> usize {
        (**self).position()
    }

    fn position_before(&self, frames: usize) -> usize {
        (**self).position_before(frames)
    }
}
