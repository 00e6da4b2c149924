//! In-memory seekable source holding fully decoded frames

use crate::audio::types::AudioFrame;
use crate::error::{Error, Result};
use crate::playback::source::Source;
use std::sync::Arc;

/// Decoded audio kept in memory with a read cursor.
///
/// The frame data is shared behind an `Arc` so cloning a source (for export
/// previews or tests) does not copy the samples.
#[derive(Debug, Clone)]
pub struct BufferSource {
    frames: Arc<[AudioFrame]>,
    position: usize,
}

impl BufferSource {
    /// Wrap decoded frames, cursor at 0.
    pub fn new(frames: Vec<AudioFrame>) -> Self {
        Self {
            frames: frames.into(),
            position: 0,
        }
    }

    /// Borrow the underlying frames.
    pub fn frames(&self) -> &[AudioFrame] {
        &self.frames
    }
}

impl Source for BufferSource {
    fn fill(&mut self, out: &mut [AudioFrame]) -> (usize, bool) {
        let remaining = self.frames.len().saturating_sub(self.position);
        let count = remaining.min(out.len());
        out[..count].copy_from_slice(&self.frames[self.position..self.position + count]);
        self.position += count;
        (count, self.position < self.frames.len())
    }

    fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.frames.len() {
            return Err(Error::OutOfRange(format!(
                "seek to frame {} beyond length {}",
                pos,
                self.frames.len()
            )));
        }
        self.position = pos;
        Ok(())
    }

    fn len(&self) -> usize {
        self.frames.len()
    }

    fn position(&self) -> usize {
        self.position
    }
}
