//! Sample rate and time conversion utilities
//!
//! All positions in the player are counted in stereo frames since the start
//! of a source. `SampleRate` converts between those counts and wall-clock
//! durations.

use std::fmt;
use std::time::Duration;

/// Default session sample rate (44.1 kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Frames per second of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleRate(pub u32);

impl SampleRate {
    /// Create a new sample rate
    pub fn new(hz: u32) -> Self {
        SampleRate(hz)
    }

    /// Sample rate in Hz
    pub fn hz(self) -> u32 {
        self.0
    }

    /// Number of frames covering `duration`, rounded to the nearest frame
    pub fn frames_for(self, duration: Duration) -> usize {
        self.frames_for_secs(duration.as_secs_f64())
    }

    /// Number of frames covering `secs` seconds, rounded to the nearest frame.
    ///
    /// Negative inputs yield 0.
    pub fn frames_for_secs(self, secs: f64) -> usize {
        if secs <= 0.0 || !secs.is_finite() {
            return 0;
        }
        (secs * self.0 as f64).round() as usize
    }

    /// Signed frame delta for a signed number of seconds (relative seeks)
    pub fn frame_delta(self, secs: f64) -> i64 {
        if !secs.is_finite() {
            return 0;
        }
        (secs * self.0 as f64).round() as i64
    }

    /// Wall-clock duration of `frames` frames
    pub fn duration_of(self, frames: usize) -> Duration {
        Duration::from_secs_f64(self.secs_of(frames))
    }

    /// Seconds spanned by `frames` frames
    pub fn secs_of(self, frames: usize) -> f64 {
        if self.0 == 0 {
            return 0.0;
        }
        frames as f64 / self.0 as f64
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        SampleRate(DEFAULT_SAMPLE_RATE)
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.0)
    }
}

/// Format seconds as `M:SS.mmm` for status lines.
///
/// # Examples
///
/// ```
/// use gordon_common::time::format_position;
///
/// assert_eq!(format_position(0.0), "0:00.000");
/// assert_eq!(format_position(75.5), "1:15.500");
/// ```
pub fn format_position(secs: f64) -> String {
    let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
    let total_ms = (secs * 1000.0).round() as u64;
    let minutes = total_ms / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{}:{:02}.{:03}", minutes, seconds, millis)
}
