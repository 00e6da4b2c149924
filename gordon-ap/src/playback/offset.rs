//! Leading-silence prefix for delayed tracks
//!
//! A track added with a start offset plays `offset` frames of silence and
//! then delegates to the wrapped source. The composite is itself a seekable
//! [`Source`] whose length is `offset + inner.len()`.

use crate::audio::types::AudioFrame;
use crate::error::{Error, Result};
use crate::playback::source::Source;

/// Silence prefix followed by an inner source.
pub struct OffsetSource {
    inner: Box<dyn Source>,
    offset: usize,
    position: usize,
}

impl OffsetSource {
    /// Delay `inner` by `offset` frames of silence.
    pub fn new(inner: Box<dyn Source>, offset: usize) -> Self {
        Self {
            inner,
            offset,
            position: 0,
        }
    }

    /// Length of the silence prefix in frames.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Length of the wrapped source alone.
    pub fn inner_len(&self) -> usize {
        self.inner.len()
    }
}

impl Source for OffsetSource {
    fn fill(&mut self, out: &mut [AudioFrame]) -> (usize, bool) {
        let mut written = 0;

        if self.position < self.offset {
            let silent = (self.offset - self.position).min(out.len());
            out[..silent].fill(AudioFrame::zero());
            self.position += silent;
            written = silent;
        }

        if written == out.len() {
            return (written, self.position < self.len());
        }

        let (count, more) = self.inner.fill(&mut out[written..]);
        self.position = self.position.saturating_add(count);
        (written + count, more)
    }

    fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.len() {
            return Err(Error::OutOfRange(format!(
                "seek to frame {} beyond length {}",
                pos,
                self.len()
            )));
        }
        self.inner.seek(pos.saturating_sub(self.offset))?;
        self.position = pos;
        Ok(())
    }

    fn len(&self) -> usize {
        self.offset.saturating_add(self.inner.len())
    }

    fn position(&self) -> usize {
        self.position
    }
}
