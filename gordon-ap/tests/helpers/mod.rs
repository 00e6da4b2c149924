//! Shared fixtures for integration tests
//!
//! In-memory sources carry their frame index as the sample value so tests can
//! tell exactly which timeline frame came out. WAV fixtures are written with
//! hound into a temp directory.

#![allow(dead_code)]

use gordon_ap::audio::AudioFrame;
use gordon_ap::playback::{BufferSource, Deck, Source};
use gordon_ap::Session;
use gordon_common::PlayerConfig;
use hound::{WavSpec, WavWriter};
use std::path::{Path, PathBuf};

/// Sample rate used by all fixtures
pub const TEST_RATE: u32 = 8_000;

/// Source whose frame `i` has value `i` on both channels.
pub fn ramp(len: usize) -> BufferSource {
    BufferSource::new((0..len).map(|i| AudioFrame::from_mono(i as f32)).collect())
}

/// Source of `len` frames all equal to `value`.
pub fn constant(len: usize, value: f32) -> BufferSource {
    BufferSource::new(vec![AudioFrame::from_mono(value); len])
}

/// Pull everything `source` produces, in chunks of `chunk` frames.
///
/// Stops when the source reports no more data or after `limit` frames.
pub fn drain(source: &mut dyn Source, chunk: usize, limit: usize) -> Vec<AudioFrame> {
    let mut out = Vec::new();
    let mut buf = vec![AudioFrame::zero(); chunk];
    while out.len() < limit {
        let (count, more) = source.fill(&mut buf);
        out.extend_from_slice(&buf[..count]);
        if !more {
            break;
        }
    }
    out.truncate(limit);
    out
}

/// Left channel values of `frames`
pub fn lefts(frames: &[AudioFrame]) -> Vec<f32> {
    frames.iter().map(|f| f.left).collect()
}

/// Write a stereo 16-bit WAV of `frames` frames, every sample `value`.
pub fn write_constant_wav(dir: &Path, name: &str, frames: usize, rate: u32, value: i16) -> PathBuf {
    let path = dir.join(name);
    let spec = WavSpec {
        channels: 2,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec).unwrap();
    for _ in 0..frames * 2 {
        writer.write_sample(value).unwrap();
    }
    writer.finalize().unwrap();
    path
}

/// Write a mono 16-bit WAV whose sample `i` is `i % 30_000`.
pub fn write_ramp_wav(dir: &Path, name: &str, frames: usize, rate: u32) -> PathBuf {
    let path = dir.join(name);
    let spec = WavSpec {
        channels: 1,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec).unwrap();
    for i in 0..frames {
        writer.write_sample((i % 30_000) as i16).unwrap();
    }
    writer.finalize().unwrap();
    path
}

/// Config at [`TEST_RATE`] exporting into `export_dir`
pub fn test_config(export_dir: &Path) -> PlayerConfig {
    PlayerConfig {
        sample_rate: TEST_RATE,
        export_dir: export_dir.to_path_buf(),
        ..PlayerConfig::default()
    }
}

/// Session with its own deck, not attached to any device
pub fn test_session(export_dir: &Path) -> Session {
    Session::new(test_config(export_dir), Deck::shared())
}

/// Render `frames` frames through the session's deck, as the device would.
pub fn render(session: &Session, frames: usize) -> Vec<AudioFrame> {
    let mut out = vec![AudioFrame::zero(); frames];
    session.audio_lock().lock().render(&mut out);
    out
}
