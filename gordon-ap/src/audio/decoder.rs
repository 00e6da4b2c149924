//! Audio decoder using symphonia
//!
//! Decodes MP3, FLAC, WAV and Ogg Vorbis files to PCM and hands the result to
//! the playback graph as an in-memory seekable source at the session rate.
//!
//! Files are decoded whole, up front. Seeking then works on exact frame
//! positions instead of relying on compressed-stream seek accuracy.

use crate::audio::resampler::Resampler;
use crate::audio::types::frames_from_interleaved;
use crate::error::{Error, Result};
use crate::playback::buffer_source::BufferSource;
use gordon_common::SampleRate;
use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Container extensions the player accepts
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "ogg"];

/// Raw decoder output before rate normalization
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Interleaved f32 samples
    pub samples: Vec<f32>,

    /// Native sample rate of the file
    pub sample_rate: u32,

    /// Channel count in the file (1=mono, 2=stereo, ...)
    pub channels: u16,
}

impl DecodedAudio {
    /// Number of frames in the decoded audio
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }
}

/// Simple whole-file audio decoder.
pub struct SimpleDecoder;

impl SimpleDecoder {
    /// Validate the extension of `path` and return it lowercased.
    ///
    /// # Errors
    /// `UnsupportedFormat` when the extension is missing or not one of
    /// [`SUPPORTED_EXTENSIONS`].
    pub fn check_extension(path: &Path) -> Result<String> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .ok_or_else(|| {
                Error::UnsupportedFormat(format!("{} has no file extension", path.display()))
            })?;

        if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            Ok(ext)
        } else {
            Err(Error::UnsupportedFormat(format!(
                "'.{}' (supported: {})",
                ext,
                SUPPORTED_EXTENSIONS.join(", ")
            )))
        }
    }

    /// Decode an entire audio file to interleaved PCM.
    pub fn decode_file(path: &Path) -> Result<DecodedAudio> {
        let extension = Self::check_extension(path)?;
        debug!("Decoding entire file: {}", path.display());

        let file = std::fs::File::open(path)
            .map_err(|e| Error::Decode(format!("Failed to open file {}: {}", path.display(), e)))?;

        Self::decode_stream(Box::new(file), &extension)
    }

    /// Decode an in-memory byte stream with a known container extension.
    pub fn decode_bytes(bytes: Vec<u8>, extension: &str) -> Result<DecodedAudio> {
        let extension = extension.to_ascii_lowercase();
        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(Error::UnsupportedFormat(format!("'.{}'", extension)));
        }
        Self::decode_stream(Box::new(Cursor::new(bytes)), &extension)
    }

    /// Decode a file and wrap it as a seekable source at `target_rate`.
    ///
    /// Mono is duplicated to both channels; extra channels beyond the first
    /// two are dropped.
    pub fn load_source(path: &Path, target_rate: SampleRate) -> Result<(BufferSource, DecodedInfo)> {
        let decoded = Self::decode_file(path)?;
        let info = DecodedInfo {
            sample_rate: decoded.sample_rate,
            channels: decoded.channels,
            frames: decoded.frame_count(),
        };

        let resampled = Resampler::resample(
            &decoded.samples,
            decoded.sample_rate,
            target_rate.hz(),
            decoded.channels,
        )?;
        let frames = frames_from_interleaved(&resampled, decoded.channels);

        debug!(
            "Loaded {}: {} native frames at {} Hz -> {} frames at {}",
            path.display(),
            info.frames,
            info.sample_rate,
            frames.len(),
            target_rate
        );

        Ok((BufferSource::new(frames), info))
    }

    fn decode_stream(source: Box<dyn MediaSource>, extension: &str) -> Result<DecodedAudio> {
        let mss = MediaSourceStream::new(source, Default::default());

        let mut hint = Hint::new();
        hint.with_extension(extension);

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::Decode(format!("Failed to probe format: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| Error::Decode("Sample rate not found".to_string()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to create decoder: {}", e)))?;

        let mut samples = Vec::new();
        let mut channels = codec_params.channels.map(|c| c.count() as u16);
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!("Reached end of stream");
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    warn!("Decoder reset required mid-stream, stopping");
                    break;
                }
                Err(e) => {
                    warn!("Error reading packet: {}", e);
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    channels.get_or_insert(spec.channels.count() as u16);

                    // SampleBuffer capacity is counted in samples, packets in frames
                    let needed = decoded.capacity() * spec.channels.count();
                    if sample_buf.as_ref().map_or(true, |b| b.capacity() < needed) {
                        sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                    }
                    if let Some(buf) = sample_buf.as_mut() {
                        buf.copy_interleaved_ref(decoded);
                        samples.extend_from_slice(buf.samples());
                    }
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    // Corrupt packet: skip it and keep going
                    warn!("Decode error: {}", e);
                    continue;
                }
                Err(e) => {
                    return Err(Error::Decode(format!("Decoder failure: {}", e)));
                }
            }
        }

        let channels =
            channels.ok_or_else(|| Error::Decode("Channel count not found".to_string()))?;

        debug!(
            "Decoded {} samples ({} frames, {} ch, {} Hz)",
            samples.len(),
            samples.len() / channels.max(1) as usize,
            channels,
            sample_rate
        );

        Ok(DecodedAudio {
            samples,
            sample_rate,
            channels,
        })
    }
}

/// Native stream description reported alongside a loaded source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInfo {
    /// Native sample rate
    pub sample_rate: u32,

    /// Native channel count
    pub channels: u16,

    /// Native frame count (before rate normalization)
    pub frames: usize,
}
