//! Multi-track mixer
//!
//! Sums any number of tracks, each optionally delayed by a leading silence
//! prefix, into one combined [`Source`].
//!
//! # Architecture
//!
//! - Every track is pulled independently into its own zeroed scratch buffer
//!   and added into the output, so tracks that have not started yet or have
//!   already ended contribute silence without disturbing the others.
//! - The mixer's length is the union of its tracks: the maximum over tracks
//!   of `offset + track length`. It is recomputed after every add/remove.
//! - Sums are not clamped. Overlapping tracks can exceed [-1.0, 1.0]; the
//!   output device clamps when converting to the device format.
//!
//! Positions, markers and loop regions all address the combined timeline;
//! per-track positions are derived from it on every seek.

use crate::audio::types::{AudioFrame, CALLBACK_FRAMES};
use crate::error::{Error, Result};
use crate::playback::offset::OffsetSource;
use crate::playback::source::Source;
use gordon_common::SampleRate;
use tracing::{debug, info};

/// Stable track identifier, unique within one mixer
pub type TrackId = u32;

/// One audio source owned by the mixer
pub struct Track {
    id: TrackId,
    name: String,
    source: OffsetSource,
}

impl Track {
    /// Track identifier
    pub fn id(&self) -> TrackId {
        self.id
    }

    /// Display name (usually the file name)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Leading silence in frames
    pub fn offset(&self) -> usize {
        self.source.offset()
    }

    /// Length of the track's own audio, excluding the silence prefix
    pub fn audio_len(&self) -> usize {
        self.source.inner_len()
    }

    /// Length on the combined timeline (offset + audio)
    pub fn timeline_len(&self) -> usize {
        self.source.len()
    }
}

/// Summary of a track for listings
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    /// Track identifier
    pub id: TrackId,
    /// Display name
    pub name: String,
    /// Leading silence in frames
    pub offset_frames: usize,
    /// Audio length in frames
    pub len_frames: usize,
}

/// Multi-track mixer
pub struct Mixer {
    /// Live tracks in insertion order
    tracks: Vec<Track>,

    /// Position on the combined timeline (frames)
    position: usize,

    /// Cached max over tracks of `offset + len`
    length: usize,

    /// Rate used to convert offsets given in seconds
    sample_rate: SampleRate,

    /// Per-track pull buffer, reused between fills
    scratch: Vec<AudioFrame>,
}

impl Mixer {
    /// Create an empty mixer.
    ///
    /// An empty mixer has length 0 and reports "no more" on the first fill.
    pub fn new(sample_rate: SampleRate) -> Self {
        Self {
            tracks: Vec::new(),
            position: 0,
            length: 0,
            sample_rate,
            scratch: Vec::with_capacity(CALLBACK_FRAMES),
        }
    }

    /// Add a track delayed by `offset_secs` seconds of silence.
    ///
    /// # Arguments
    ///
    /// * `source` - Decoded audio at the mixer's sample rate
    /// * `name` - Display name for listings
    /// * `offset_secs` - Start delay; rounded to the nearest frame, negative treated as 0
    ///
    /// # Returns
    ///
    /// The new track's id: one greater than the largest live id (1 when empty).
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let id = mixer.add_track(Box::new(vocals), "vocals.flac", 1.5);
    /// ```
    pub fn add_track(&mut self, source: Box<dyn Source>, name: impl Into<String>, offset_secs: f64) -> TrackId {
        let offset = self.sample_rate.frames_for_secs(offset_secs);
        self.add_track_frames(source, name, offset)
    }

    /// Add a track delayed by `offset` frames of silence.
    ///
    /// The new track is aligned with the current mixer position.
    pub fn add_track_frames(&mut self, source: Box<dyn Source>, name: impl Into<String>, offset: usize) -> TrackId {
        let id = self.next_id();
        let mut track = Track {
            id,
            name: name.into(),
            source: OffsetSource::new(source, offset),
        };

        let local = self.position.min(track.source.len());
        if let Err(e) = track.source.seek(local) {
            debug!("Track {} could not align to mixer position {}: {}", id, self.position, e);
        }

        info!(
            "Added track {} '{}' (offset {} frames, {} frames)",
            id,
            track.name,
            offset,
            track.audio_len()
        );

        self.tracks.push(track);
        self.recompute_length();
        id
    }

    /// Remove the track with `id`.
    ///
    /// The cached length is recomputed from the remaining tracks, so it never
    /// grows on removal. A position beyond the new length is pulled back to it.
    ///
    /// # Errors
    ///
    /// `NotFound` if no live track has that id.
    pub fn remove_track(&mut self, id: TrackId) -> Result<TrackInfo> {
        let index = self
            .tracks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| Error::NotFound(format!("track {}", id)))?;

        let track = self.tracks.remove(index);
        self.recompute_length();
        self.position = self.position.min(self.length);

        info!("Removed track {} '{}'", id, track.name);
        Ok(Self::info_of(&track))
    }

    /// Listing of live tracks in insertion order.
    pub fn tracks(&self) -> Vec<TrackInfo> {
        self.tracks.iter().map(Self::info_of).collect()
    }

    /// Number of live tracks
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Sample rate the mixer was created with
    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    fn info_of(track: &Track) -> TrackInfo {
        TrackInfo {
            id: track.id,
            name: track.name.clone(),
            offset_frames: track.offset(),
            len_frames: track.audio_len(),
        }
    }

    fn next_id(&self) -> TrackId {
        self.tracks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    fn recompute_length(&mut self) {
        self.length = self
            .tracks
            .iter()
            .map(|t| t.timeline_len())
            .max()
            .unwrap_or(0);
        debug!("Mixer length now {} frames", self.length);
    }
}

impl Source for Mixer {
    fn fill(&mut self, out: &mut [AudioFrame]) -> (usize, bool) {
        if self.position >= self.length {
            return (0, false);
        }

        let n = out.len().min(self.length - self.position);
        let out = &mut out[..n];
        out.fill(AudioFrame::zero());

        if self.scratch.len() < n {
            self.scratch.resize(n, AudioFrame::zero());
        }

        for track in self.tracks.iter_mut() {
            let scratch = &mut self.scratch[..n];
            scratch.fill(AudioFrame::zero());
            let (count, _more) = track.source.fill(scratch);
            for (mixed, frame) in out.iter_mut().zip(scratch[..count].iter()) {
                mixed.add(frame);
            }
        }

        self.position += n;
        (n, self.position < self.length)
    }

    fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.length {
            return Err(Error::OutOfRange(format!(
                "seek to frame {} beyond mixer length {}",
                pos, self.length
            )));
        }

        for track in self.tracks.iter_mut() {
            // Parks tracks that end before `pos` at their own end
            let local = pos.min(track.source.len());
            match track.source.seek(local) {
                Ok(()) => {}
                Err(Error::Unsupported(msg)) => {
                    debug!("Track {} not seekable: {}", track.id, msg);
                }
                Err(e) => return Err(e),
            }
        }

        self.position = pos;
        Ok(())
    }

    fn len(&self) -> usize {
        self.length
    }

    fn position(&self) -> usize {
        self.position
    }
}
