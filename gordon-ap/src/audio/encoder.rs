//! WAV encoder for region export, using hound
//!
//! Writes 16-bit PCM stereo at the session sample rate. Samples are clamped
//! to [-1.0, 1.0] before conversion.

use crate::audio::types::AudioFrame;
use crate::error::{Error, Result};
use gordon_common::SampleRate;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::{Seek, Write};
use std::path::Path;
use tracing::info;

/// 16-bit stereo WAV writer.
pub struct WavEncoder;

impl WavEncoder {
    fn spec(sample_rate: SampleRate) -> WavSpec {
        WavSpec {
            channels: 2,
            sample_rate: sample_rate.hz(),
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }

    /// Write `frames` to a new WAV file at `path`.
    ///
    /// # Errors
    /// `Encode` if the file cannot be created or written.
    pub fn write(path: &Path, frames: &[AudioFrame], sample_rate: SampleRate) -> Result<()> {
        let mut writer = WavWriter::create(path, Self::spec(sample_rate)).map_err(|e| {
            Error::Encode(format!("Failed to create {}: {}", path.display(), e))
        })?;

        write_frames(&mut writer, frames)?;

        writer
            .finalize()
            .map_err(|e| Error::Encode(format!("Failed to finalize {}: {}", path.display(), e)))?;

        info!(
            "Exported {} frames ({:.3}s) to {}",
            frames.len(),
            sample_rate.secs_of(frames.len()),
            path.display()
        );
        Ok(())
    }

    /// Encode `frames` to WAV bytes in memory.
    pub fn to_bytes(frames: &[AudioFrame], sample_rate: SampleRate) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        {
            let cursor = std::io::Cursor::new(&mut buffer);
            let mut writer = WavWriter::new(cursor, Self::spec(sample_rate))
                .map_err(|e| Error::Encode(e.to_string()))?;
            write_frames(&mut writer, frames)?;
            writer
                .finalize()
                .map_err(|e| Error::Encode(e.to_string()))?;
        }
        Ok(buffer)
    }
}

fn write_frames<W: Write + Seek>(writer: &mut WavWriter<W>, frames: &[AudioFrame]) -> Result<()> {
    for frame in frames {
        for sample in [frame.left, frame.right] {
            writer
                .write_sample(float_to_i16(sample))
                .map_err(|e| Error::Encode(e.to_string()))?;
        }
    }
    Ok(())
}

fn float_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}
