//! Player session
//!
//! One `Session` owns everything a command handler may touch: the audio lock
//! shared with the output device, the configuration and the per-load state
//! (marker table and loaded file list). Loading files replaces the transport
//! and the per-load state wholesale; nothing survives a reload.
//!
//! Decoding and encoding run on the blocking pool with the audio lock
//! released. Each lock acquisition covers one consistent read or update.

use crate::audio::decoder::SimpleDecoder;
use crate::audio::encoder::WavEncoder;
use crate::audio::types::AudioFrame;
use crate::error::{Error, Result};
use crate::playback::buffer_source::BufferSource;
use crate::playback::deck::AudioLock;
use crate::playback::markers::{Marker, MarkerTable};
use crate::playback::mixer::{Mixer, TrackId, TrackInfo};
use crate::playback::source::Source;
use crate::playback::transport::{Graph, Transport, TransportStatus};
use gordon_common::{PlayerConfig, SampleRate};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// State created by a load and dropped by the next one
struct Loaded {
    markers: MarkerTable,
    files: Vec<PathBuf>,
}

/// Command-handler context.
pub struct Session {
    lock: AudioLock,
    config: PlayerConfig,
    sample_rate: SampleRate,
    loaded: Option<Loaded>,
}

impl Session {
    /// Session with nothing loaded.
    pub fn new(config: PlayerConfig, lock: AudioLock) -> Self {
        let sample_rate = SampleRate::new(config.sample_rate);
        Self {
            lock,
            config,
            sample_rate,
            loaded: None,
        }
    }

    /// Player configuration
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Session sample rate
    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    /// The lock shared with the output device
    pub fn audio_lock(&self) -> &AudioLock {
        &self.lock
    }

    /// Files loaded in the current session, in load order
    pub fn files(&self) -> &[PathBuf] {
        self.loaded.as_ref().map(|l| l.files.as_slice()).unwrap_or(&[])
    }

    fn loaded_mut(&mut self) -> Result<&mut Loaded> {
        self.loaded.as_mut().ok_or(Error::NoSession)
    }

    fn loaded(&self) -> Result<&Loaded> {
        self.loaded.as_ref().ok_or(Error::NoSession)
    }

    /// Run `f` on the active transport with the audio lock held once.
    fn with_transport<R>(&self, f: impl FnOnce(&mut Transport) -> Result<R>) -> Result<R> {
        let mut deck = self.lock.lock();
        let transport = deck.transport_mut().ok_or(Error::NoSession)?;
        f(transport)
    }

    async fn decode(&self, path: &Path) -> Result<BufferSource> {
        let owned = path.to_path_buf();
        let rate = self.sample_rate;
        let (source, _info) = tokio::task::spawn_blocking(move || SimpleDecoder::load_source(&owned, rate))
            .await
            .map_err(|e| Error::Decode(format!("decode task failed: {}", e)))??;
        Ok(source)
    }

    fn track_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    }

    // ----- loading -----

    /// Start a new session playing `paths` together, all at offset 0.
    ///
    /// If the first file fails the previous session is left untouched. If a
    /// later file fails, the files before it stay loaded and the error names
    /// the failing file.
    pub async fn load(&mut self, paths: &[PathBuf]) -> Result<usize> {
        let (first, rest) = paths
            .split_first()
            .ok_or_else(|| Error::InvalidInput("load needs at least one file".to_string()))?;

        let source = self.decode(first).await.map_err(|e| Error::Load {
            path: first.clone(),
            source: Box::new(e),
        })?;

        let mut mixer = Mixer::new(self.sample_rate);
        mixer.add_track(Box::new(source), Self::track_name(first), 0.0);
        let length = mixer.len();
        let transport = Transport::new(Graph::Mixed(mixer), self.sample_rate, self.config.volume_percent)?;

        {
            let mut deck = self.lock.lock();
            deck.replace_transport(transport);
        }
        self.loaded = Some(Loaded {
            markers: MarkerTable::for_length(self.config.marker_slots, self.sample_rate, length),
            files: vec![first.clone()],
        });
        info!("New session: {}", first.display());

        for path in rest {
            if let Err(e) = self.add(path, 0.0).await {
                warn!("Load stopped at {}: {}", path.display(), e);
                return Err(Error::Load {
                    path: path.clone(),
                    source: Box::new(e),
                });
            }
        }

        Ok(paths.len())
    }

    /// Decode `path` and add it as a track delayed by `offset_secs`.
    pub async fn add(&mut self, path: &Path, offset_secs: f64) -> Result<TrackId> {
        self.loaded()?;
        if offset_secs < 0.0 || !offset_secs.is_finite() {
            return Err(Error::InvalidInput(format!(
                "offset must be zero or positive, got {}",
                offset_secs
            )));
        }

        let source = self.decode(path).await?;
        let name = Self::track_name(path);

        let (id, old_len, new_len) = self.with_transport(|t| {
            let old_len = t.len();
            let id = t.add_track(Box::new(source), &name, offset_secs)?;
            Ok((id, old_len, t.len()))
        })?;

        let loaded = self.loaded_mut()?;
        loaded.markers.follow_length(old_len, new_len);
        loaded.files.push(path.to_path_buf());
        Ok(id)
    }

    /// Remove track `id` from the mixer.
    pub fn remove(&mut self, id: TrackId) -> Result<TrackInfo> {
        let (info, old_len, new_len) = self.with_transport(|t| {
            let old_len = t.len();
            let info = t.remove_track(id)?;
            Ok((info, old_len, t.len()))
        })?;
        self.loaded_mut()?.markers.follow_length(old_len, new_len);
        Ok(info)
    }

    /// Track listing in insertion order
    pub fn tracks(&self) -> Result<Vec<TrackInfo>> {
        self.with_transport(|t| Ok(t.tracks()))
    }

    // ----- transport -----

    /// Flip pause; returns true when now paused.
    pub fn toggle_pause(&self) -> Result<bool> {
        self.with_transport(|t| Ok(t.toggle_pause()))
    }

    /// Relative seek in seconds; returns the new position in frames.
    pub fn seek_relative(&self, secs: f64) -> Result<usize> {
        self.with_transport(|t| t.seek_relative(secs))
    }

    /// Set volume (0-100).
    pub fn set_volume(&self, percent: u8) -> Result<()> {
        self.with_transport(|t| t.set_volume(percent))
    }

    /// Step volume by `delta` percent; returns the new volume.
    pub fn step_volume(&self, delta: i32) -> Result<u8> {
        self.with_transport(|t| Ok(t.step_volume(delta)))
    }

    /// Set playback speed.
    pub fn set_speed(&self, speed: f64) -> Result<()> {
        self.with_transport(|t| t.set_speed(speed))
    }

    /// Loop between markers `from` and `to`, `count` times (negative = forever).
    pub fn set_loop(&self, from: usize, to: usize, count: i64) -> Result<(Marker, Marker)> {
        let markers = &self.loaded()?.markers;
        let (start, end) = (markers.get(from)?, markers.get(to)?);
        self.with_transport(|t| t.set_loop(start.position, end.position, count))?;
        Ok((start, end))
    }

    /// Back to a single pass over the whole timeline.
    pub fn clear_loop(&self) -> Result<()> {
        self.with_transport(|t| t.clear_loop())
    }

    /// Consistent status snapshot (one lock acquisition).
    pub fn status(&self) -> Result<TransportStatus> {
        self.with_transport(|t| Ok(t.status()))
    }

    // ----- markers -----

    /// Record the current position in marker slot `index`.
    pub fn mark(&mut self, index: usize) -> Result<Marker> {
        let position = self.with_transport(|t| Ok(t.position()))?;
        Ok(self.loaded_mut()?.markers.set(index, position))
    }

    /// Seek to marker `index`.
    pub fn goto(&self, index: usize) -> Result<Marker> {
        let marker = self.loaded()?.markers.get(index)?;
        self.with_transport(|t| t.seek_to(marker.position))?;
        Ok(marker)
    }

    /// Set markers in index order
    pub fn markers(&self) -> Result<Vec<(usize, Marker)>> {
        Ok(self.loaded()?.markers.iter().collect())
    }

    // ----- export -----

    /// Export the region between markers `from` and `to` to a WAV file.
    ///
    /// The frames are copied under the audio lock; the file is written after
    /// the lock is released. Returns the written path.
    ///
    /// # Errors
    /// `InvalidRange` when the end marker is not after the start marker,
    /// checked before any file is touched.
    pub async fn export(&self, from: usize, to: usize, out: Option<PathBuf>) -> Result<PathBuf> {
        let markers = &self.loaded()?.markers;
        let (start, end) = (markers.get(from)?.position, markers.get(to)?.position);
        if end <= start {
            return Err(Error::InvalidRange(format!(
                "marker {} ({}) must come after marker {} ({})",
                to, end, from, start
            )));
        }

        let frames = self.with_transport(|t| t.read_region(start, end))?;
        let path = out.unwrap_or_else(|| self.default_export_path());
        self.write_export(path, frames).await
    }

    async fn write_export(&self, path: PathBuf, frames: Vec<AudioFrame>) -> Result<PathBuf> {
        let rate = self.sample_rate;
        tokio::task::spawn_blocking(move || -> Result<PathBuf> {
            WavEncoder::write(&path, &frames, rate)?;
            Ok(path)
        })
        .await
        .map_err(|e| Error::Encode(format!("export task failed: {}", e)))?
    }

    fn default_export_path(&self) -> PathBuf {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        self.config.export_dir.join(format!("export-{}.wav", stamp))
    }

    // ----- noise -----

    /// Toggle the pink noise voice, or set its volume when `percent` is given.
    ///
    /// Works with or without loaded audio. Returns the noise volume when on.
    pub fn pink_noise(&self, percent: Option<u8>) -> Option<u8> {
        let mut deck = self.lock.lock();
        match percent {
            Some(p) => deck.set_noise(p),
            None => {
                deck.toggle_noise(self.config.volume_percent);
            }
        }
        deck.noise_volume()
    }
}
