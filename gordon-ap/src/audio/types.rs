//! Core audio data types
//!
//! Every stage of the playback graph moves stereo `AudioFrame`s. Amplitudes
//! are nominally in [-1.0, 1.0] but are never clamped inside the graph; the
//! output device clamps when converting to the device format.

/// Frames reserved up front for per-callback scratch buffers
pub const CALLBACK_FRAMES: usize = 4096;

/// AudioFrame represents a single stereo sample (one frame of audio).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioFrame {
    /// Left channel sample
    pub left: f32,

    /// Right channel sample
    pub right: f32,
}

impl AudioFrame {
    /// Create a silent frame (0.0, 0.0)
    pub const fn zero() -> Self {
        AudioFrame { left: 0.0, right: 0.0 }
    }

    /// Create a frame from mono sample (duplicate to both channels)
    pub fn from_mono(sample: f32) -> Self {
        AudioFrame { left: sample, right: sample }
    }

    /// Create a frame from left and right samples
    pub fn from_stereo(left: f32, right: f32) -> Self {
        AudioFrame { left, right }
    }

    /// Apply volume scaling to both channels
    pub fn apply_volume(&mut self, volume: f32) {
        self.left *= volume;
        self.right *= volume;
    }

    /// Add another frame to this frame (for mixing)
    pub fn add(&mut self, other: &AudioFrame) {
        self.left += other.left;
        self.right += other.right;
    }

    /// Linear interpolation towards `other` by `t` in [0, 1)
    pub fn lerp(&self, other: &AudioFrame, t: f32) -> AudioFrame {
        AudioFrame {
            left: self.left + (other.left - self.left) * t,
            right: self.right + (other.right - self.right) * t,
        }
    }

    /// Clamp samples to valid range [-1.0, 1.0] to prevent clipping
    pub fn clamp(&mut self) {
        self.left = self.left.clamp(-1.0, 1.0);
        self.right = self.right.clamp(-1.0, 1.0);
    }

    /// True when both channels are exactly zero
    pub fn is_silent(&self) -> bool {
        self.left == 0.0 && self.right == 0.0
    }
}

/// Convert interleaved samples with `channels` channels to stereo frames.
///
/// Mono is duplicated to both sides; for more than two channels the first
/// two are kept.
pub fn frames_from_interleaved(samples: &[f32], channels: u16) -> Vec<AudioFrame> {
    match channels {
        0 => Vec::new(),
        1 => samples.iter().map(|&s| AudioFrame::from_mono(s)).collect(),
        n => samples
            .chunks_exact(n as usize)
            .map(|c| AudioFrame::from_stereo(c[0], c[1]))
            .collect(),
    }
}
