//! Audio output using cpal
//!
//! Opens the output device at the session sample rate and plays the deck.
//! The stream callback takes the audio lock once per device buffer, renders
//! the deck into stereo frames and converts them to the device format.

use crate::audio::types::{AudioFrame, CALLBACK_FRAMES};
use crate::error::{Error, Result};
use crate::playback::deck::AudioLock;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use gordon_common::SampleRate;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Audio output manager using cpal.
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
    /// Set by the stream error callback
    error_flag: Arc<AtomicBool>,
    error_count: Arc<AtomicU32>,
}

impl AudioOutput {
    /// List available audio output devices.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open an output device.
    ///
    /// # Arguments
    /// - `device_name`: Device to use (None = default device). If the named
    ///   device is missing, falls back to the default device.
    /// - `sample_rate`: Session sample rate
    /// - `buffer_frames`: Requested frames per callback
    ///
    /// # Errors
    /// `AudioOutput` when no usable device or configuration exists.
    pub fn open(device_name: Option<&str>, sample_rate: SampleRate, buffer_frames: u32) -> Result<Self> {
        let host = cpal::default_host();

        let device = match device_name {
            Some(name) => {
                let mut devices = host
                    .output_devices()
                    .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;

                match devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                    Some(dev) => {
                        info!("Found requested audio device: {}", name);
                        dev
                    }
                    None => {
                        warn!("Requested device '{}' not found, falling back to default device", name);
                        host.default_output_device().ok_or_else(|| {
                            Error::AudioOutput(format!(
                                "Device '{}' not found and no default device available",
                                name
                            ))
                        })?
                    }
                }
            }
            None => host
                .default_output_device()
                .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?,
        };

        info!(
            "Using audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let (mut config, sample_format) = Self::get_best_config(&device, sample_rate)?;
        config.buffer_size = cpal::BufferSize::Fixed(buffer_frames);

        debug!(
            "Audio config: sample_rate={}, channels={}, format={:?}, buffer_size={:?}",
            config.sample_rate.0, config.channels, sample_format, config.buffer_size
        );

        Ok(Self {
            device,
            config,
            sample_format,
            stream: None,
            error_flag: Arc::new(AtomicBool::new(false)),
            error_count: Arc::new(AtomicU32::new(0)),
        })
    }

    /// Pick a configuration that runs at the session rate.
    ///
    /// Prefers stereo f32, then any stereo format we can convert to, then the
    /// device default (with a warning if its rate differs).
    fn get_best_config(device: &Device, sample_rate: SampleRate) -> Result<(StreamConfig, SampleFormat)> {
        let hz = sample_rate.hz();
        let supported: Vec<_> = device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?
            .filter(|c| c.min_sample_rate().0 <= hz && c.max_sample_rate().0 >= hz)
            .filter(|c| {
                matches!(
                    c.sample_format(),
                    SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16
                )
            })
            .collect();

        let preferred = supported
            .iter()
            .find(|c| c.channels() == 2 && c.sample_format() == SampleFormat::F32)
            .or_else(|| supported.iter().find(|c| c.channels() == 2))
            .or_else(|| supported.first());

        if let Some(range) = preferred {
            let range = range.clone().with_sample_rate(cpal::SampleRate(hz));
            return Ok((range.config(), range.sample_format()));
        }

        let default = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;
        if default.sample_rate().0 != hz {
            warn!(
                "Device does not support {}; playing at {} Hz will change speed and pitch",
                sample_rate,
                default.sample_rate().0
            );
        }
        Ok((default.config(), default.sample_format()))
    }

    /// Start playing the deck behind `lock`.
    pub fn start(&mut self, lock: AudioLock) -> Result<()> {
        info!("Starting audio stream");

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(lock)?,
            SampleFormat::I16 => self.build_stream::<i16>(lock)?,
            SampleFormat::U16 => self.build_stream::<u16>(lock)?,
            sample_format => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    sample_format
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

        self.stream = Some(stream);
        info!("Audio stream started successfully");
        Ok(())
    }

    fn build_stream<T>(&self, lock: AudioLock) -> Result<Stream>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        let channels = self.config.channels as usize;
        let error_flag = Arc::clone(&self.error_flag);
        let error_count = Arc::clone(&self.error_count);
        let initial = match self.config.buffer_size {
            cpal::BufferSize::Fixed(n) => (n as usize).max(CALLBACK_FRAMES),
            cpal::BufferSize::Default => CALLBACK_FRAMES,
        };
        let mut frames = vec![AudioFrame::zero(); initial];

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let count = data.len() / channels.max(1);
                    let frames = callback_frames(&mut frames, count);

                    lock.lock().render(frames);

                    write_output(data, channels, frames);
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    error_flag.store(true, Ordering::SeqCst);
                    error_count.fetch_add(1, Ordering::SeqCst);
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }

    /// Stop playback and drop the stream.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            info!("Stopping audio stream");
            stream
                .pause()
                .map_err(|e| Error::AudioOutput(format!("Failed to pause stream: {}", e)))?;
        }
        Ok(())
    }

    /// Device name
    pub fn device_name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "Unknown".to_string())
    }

    /// Sample rate the stream runs at
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Device channel count
    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Whether the stream error callback has fired
    pub fn has_error(&self) -> bool {
        self.error_flag.load(Ordering::SeqCst)
    }

    /// Stream errors seen so far
    pub fn error_count(&self) -> u32 {
        self.error_count.load(Ordering::SeqCst)
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Scratch frames for one callback of `count` frames.
///
/// Only grows, so steady-state callbacks never touch the allocator.
fn callback_frames(frames: &mut Vec<AudioFrame>, count: usize) -> &mut [AudioFrame] {
    if frames.len() < count {
        frames.resize(count, AudioFrame::zero());
    }
    &mut frames[..count]
}

/// Clamp stereo frames and write them in the device layout.
///
/// Mono devices get the average of both channels; channels beyond the
/// second are silent.
fn write_output<T>(data: &mut [T], channels: usize, frames: &[AudioFrame])
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = channels.max(1);
    for (slot, frame) in data.chunks_mut(channels).zip(frames.iter()) {
        let mut frame = *frame;
        frame.clamp();
        if channels == 1 {
            slot[0] = T::from_sample((frame.left + frame.right) * 0.5);
            continue;
        }
        slot[0] = T::from_sample(frame.left);
        slot[1] = T::from_sample(frame.right);
        for sample in slot.iter_mut().skip(2) {
            *sample = T::from_sample(0.0f32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_devices_does_not_panic() {
        // Requires audio hardware; either outcome is acceptable
        let _ = AudioOutput::list_devices();
    }

    #[test]
    fn test_callback_frames_reuse_storage() {
        let mut frames = vec![AudioFrame::zero(); 512];
        let base = frames.as_ptr();

        assert_eq!(callback_frames(&mut frames, 256).len(), 256);
        assert_eq!(callback_frames(&mut frames, 512).len(), 512);
        assert_eq!(callback_frames(&mut frames, 100).len(), 100);
        assert_eq!(frames.len(), 512);
        assert_eq!(frames.as_ptr(), base);

        // A larger request grows once and is then reused
        assert_eq!(callback_frames(&mut frames, 2048).len(), 2048);
        let grown = frames.as_ptr();
        assert_eq!(callback_frames(&mut frames, 300).len(), 300);
        assert_eq!(frames.len(), 2048);
        assert_eq!(frames.as_ptr(), grown);
    }

    #[test]
    fn test_write_output_stereo_clamps() {
        let frames = [AudioFrame::from_stereo(1.5, -0.5), AudioFrame::from_stereo(0.25, -2.0)];
        let mut data = [0.0f32; 4];
        write_output(&mut data, 2, &frames);
        assert_eq!(data, [1.0, -0.5, 0.25, -1.0]);
    }

    #[test]
    fn test_write_output_mono_and_surround() {
        let frames = [AudioFrame::from_stereo(0.5, 0.25)];

        let mut mono = [0.0f32; 1];
        write_output(&mut mono, 1, &frames);
        assert_eq!(mono, [0.375]);

        let mut quad = [9.0f32; 4];
        write_output(&mut quad, 4, &frames);
        assert_eq!(quad, [0.5, 0.25, 0.0, 0.0]);
    }

    #[test]
    fn test_write_output_i16() {
        let frames = [AudioFrame::from_stereo(0.0, -1.0)];
        let mut data = [1i16; 2];
        write_output(&mut data, 2, &frames);
        assert_eq!(data[0], 0);
        assert!(data[1] <= -32767);
    }
}
