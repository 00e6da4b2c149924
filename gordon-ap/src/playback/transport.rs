//! Transport controller
//!
//! Owns the active graph wrapped in its stage chain:
//!
//! ```text
//! Graph (mixer or single source) -> RegionLooper -> Resample -> Ctrl -> Volume
//! ```
//!
//! The pause gate sits after the speed stage so that a paused transport never
//! pulls (and buffers) anything from the graph.
//!
//! The transport itself is not synchronized. It lives inside the deck behind
//! the audio lock, and every method here is called with that lock held, by
//! either the output callback (`fill`) or a command handler.

use crate::audio::types::AudioFrame;
use crate::error::{Error, Result};
use crate::playback::effects::{Ctrl, Resample, Volume};
use crate::playback::looper::RegionLooper;
use crate::playback::mixer::{Mixer, TrackId, TrackInfo};
use crate::playback::source::Source;
use gordon_common::time::format_position;
use gordon_common::SampleRate;
use std::fmt;
use tracing::{debug, info};

/// Frames pulled per step while copying an export region
const EXPORT_CHUNK: usize = 4096;

/// The graph at the bottom of the chain
pub enum Graph {
    /// One source, no track management
    Single(Box<dyn Source>),

    /// Multi-track mixer
    Mixed(Mixer),
}

impl Source for Graph {
    fn fill(&mut self, out: &mut [AudioFrame]) -> (usize, bool) {
        match self {
            Graph::Single(source) => source.fill(out),
            Graph::Mixed(mixer) => mixer.fill(out),
        }
    }

    fn seek(&mut self, pos: usize) -> Result<()> {
        match self {
            Graph::Single(source) => source.seek(pos),
            Graph::Mixed(mixer) => mixer.seek(pos),
        }
    }

    fn len(&self) -> usize {
        match self {
            Graph::Single(source) => source.len(),
            Graph::Mixed(mixer) => mixer.len(),
        }
    }

    fn position(&self) -> usize {
        match self {
            Graph::Single(source) => source.position(),
            Graph::Mixed(mixer) => mixer.position(),
        }
    }
}

type Chain = Volume<Ctrl<Resample<RegionLooper<Graph>>>>;

/// Active loop region as reported in status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopState {
    pub start: usize,
    pub end: usize,
    /// Iterations left (negative = infinite)
    pub remaining: i64,
}

/// Consistent snapshot of transport state for the status line
#[derive(Debug, Clone, PartialEq)]
pub struct TransportStatus {
    pub position: usize,
    pub length: usize,
    pub volume_percent: u8,
    pub speed: f64,
    pub paused: bool,
    pub looping: Option<LoopState>,
    pub sample_rate: SampleRate,
}

impl fmt::Display for TransportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} (Volume: {}%, Speed: {:.2}x",
            format_position(self.sample_rate.secs_of(self.position)),
            format_position(self.sample_rate.secs_of(self.length)),
            self.volume_percent,
            self.speed
        )?;
        if self.paused {
            write!(f, ", paused")?;
        }
        if let Some(l) = self.looping {
            write!(
                f,
                ", loop {}-{}",
                format_position(self.sample_rate.secs_of(l.start)),
                format_position(self.sample_rate.secs_of(l.end))
            )?;
            if l.remaining >= 0 {
                write!(f, " x{}", l.remaining)?;
            }
        }
        write!(f, ")")
    }
}

/// Playback transport over one graph.
pub struct Transport {
    chain: Chain,
    sample_rate: SampleRate,
    /// True while the loop region is the whole timeline, single pass
    unlooped: bool,
}

impl Transport {
    /// Build the stage chain over `graph`, playing the whole timeline once.
    pub fn new(graph: Graph, sample_rate: SampleRate, volume_percent: u8) -> Result<Self> {
        let looper = RegionLooper::whole(graph)?;
        let chain = Volume::new(Ctrl::new(Resample::new(looper)), volume_percent);
        Ok(Self {
            chain,
            sample_rate,
            unlooped: true,
        })
    }

    /// Transport over a single source.
    pub fn single(source: Box<dyn Source>, sample_rate: SampleRate, volume_percent: u8) -> Result<Self> {
        Self::new(Graph::Single(source), sample_rate, volume_percent)
    }

    fn ctrl(&self) -> &Ctrl<Resample<RegionLooper<Graph>>> {
        self.chain.inner()
    }

    fn ctrl_mut(&mut self) -> &mut Ctrl<Resample<RegionLooper<Graph>>> {
        self.chain.inner_mut()
    }

    fn resample(&self) -> &Resample<RegionLooper<Graph>> {
        self.ctrl().inner()
    }

    fn resample_mut(&mut self) -> &mut Resample<RegionLooper<Graph>> {
        self.ctrl_mut().inner_mut()
    }

    fn looper(&self) -> &RegionLooper<Graph> {
        self.resample().inner()
    }

    fn looper_mut(&mut self) -> &mut RegionLooper<Graph> {
        self.resample_mut().inner_mut()
    }

    /// The graph at the bottom of the chain
    pub fn graph(&self) -> &Graph {
        self.looper().inner()
    }

    /// Session sample rate
    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    // ----- pause -----

    /// Whether playback is paused
    pub fn is_paused(&self) -> bool {
        self.ctrl().is_paused()
    }

    /// Pause or resume.
    pub fn set_paused(&mut self, paused: bool) {
        self.ctrl_mut().set_paused(paused);
        info!("Playback {}", if paused { "paused" } else { "resumed" });
    }

    /// Flip the pause flag and return the new state.
    pub fn toggle_pause(&mut self) -> bool {
        let paused = !self.is_paused();
        self.set_paused(paused);
        paused
    }

    // ----- seeking -----

    /// Seek to an absolute frame on the combined timeline.
    pub fn seek_to(&mut self, pos: usize) -> Result<()> {
        self.chain.seek(pos)?;
        debug!("Seeked to frame {}", pos);
        Ok(())
    }

    /// Seek by `secs` seconds relative to the current position.
    ///
    /// The target is clamped to `[0, len - 1]`. Returns the new position.
    pub fn seek_relative(&mut self, secs: f64) -> Result<usize> {
        let len = self.len();
        let current = self.position() as i64;
        let target = current.saturating_add(self.sample_rate.frame_delta(secs));
        let max = len.saturating_sub(1) as i64;
        let target = target.clamp(0, max) as usize;
        self.seek_to(target)?;
        Ok(target)
    }

    // ----- volume / speed -----

    /// Volume in percent
    pub fn volume(&self) -> u8 {
        self.chain.percent()
    }

    /// Set the volume.
    ///
    /// # Errors
    /// `OutOfRange` above 100.
    pub fn set_volume(&mut self, percent: u8) -> Result<()> {
        if percent > 100 {
            return Err(Error::OutOfRange(format!(
                "volume {} is outside 0-100",
                percent
            )));
        }
        self.chain.set_percent(percent);
        Ok(())
    }

    /// Change the volume by `delta` percent, clamped to 0-100.
    pub fn step_volume(&mut self, delta: i32) -> u8 {
        let percent = (self.volume() as i32 + delta).clamp(0, 100) as u8;
        self.chain.set_percent(percent);
        percent
    }

    /// Speed multiplier
    pub fn speed(&self) -> f64 {
        self.resample().ratio()
    }

    /// Set the speed multiplier (pitch follows speed).
    pub fn set_speed(&mut self, speed: f64) -> Result<()> {
        self.resample_mut().set_ratio(speed)
    }

    // ----- looping -----

    /// Loop `[start, end)` `count` times (negative = forever).
    ///
    /// Applies at the next loop boundary; the cursor does not jump.
    ///
    /// # Errors
    /// - `InvalidRange` if `end <= start`
    /// - `OutOfRange` if `end` is past the timeline
    pub fn set_loop(&mut self, start: usize, end: usize, count: i64) -> Result<()> {
        if end <= start {
            return Err(Error::InvalidRange(format!(
                "loop end {} must be after start {}",
                end, start
            )));
        }
        self.looper_mut().set_region(start, end, count)?;
        self.unlooped = false;
        info!("Looping frames {}..{} (count {})", start, end, count);
        Ok(())
    }

    /// Back to a single pass over the whole timeline.
    pub fn clear_loop(&mut self) -> Result<()> {
        let len = self.len();
        self.looper_mut().set_region(0, len, 1)?;
        self.unlooped = true;
        Ok(())
    }

    /// Current loop region, `None` when unlooped
    pub fn loop_state(&self) -> Option<LoopState> {
        if self.unlooped {
            return None;
        }
        let looper = self.looper();
        Some(LoopState {
            start: looper.start(),
            end: looper.end(),
            remaining: looper.remaining(),
        })
    }

    // ----- tracks -----

    fn mixer_mut(&mut self) -> Result<&mut Mixer> {
        match self.looper_mut().inner_mut() {
            Graph::Mixed(mixer) => Ok(mixer),
            Graph::Single(_) => Err(Error::Unsupported(
                "single-source playback has no tracks".to_string(),
            )),
        }
    }

    /// Track listing (empty for a single-source graph)
    pub fn tracks(&self) -> Vec<TrackInfo> {
        match self.graph() {
            Graph::Mixed(mixer) => mixer.tracks(),
            Graph::Single(_) => Vec::new(),
        }
    }

    /// Add a track to the mixer graph.
    pub fn add_track(&mut self, source: Box<dyn Source>, name: &str, offset_secs: f64) -> Result<TrackId> {
        let old_len = self.len();
        let id = self.mixer_mut()?.add_track(source, name, offset_secs);
        self.refit_region(old_len)?;
        Ok(id)
    }

    /// Remove a track from the mixer graph.
    pub fn remove_track(&mut self, id: TrackId) -> Result<TrackInfo> {
        let old_len = self.len();
        let info = self.mixer_mut()?.remove_track(id)?;
        self.refit_region(old_len)?;
        Ok(info)
    }

    /// Keep the loop region valid after the timeline length changed.
    fn refit_region(&mut self, old_len: usize) -> Result<()> {
        let len = self.len();
        if len == old_len {
            return Ok(());
        }
        if self.unlooped {
            return self.clear_loop();
        }
        let looper = self.looper();
        let (start, end, remaining) = (looper.start(), looper.end(), looper.remaining());
        if end > len {
            let end = len;
            let start = start.min(end);
            self.looper_mut().set_region(start, end, remaining)?;
        }
        Ok(())
    }

    // ----- export -----

    /// Copy frames `[start, end)` of the graph into memory.
    ///
    /// Reads the graph directly (no loop, pause, speed or volume), pads with
    /// silence if the graph runs short, and restores the playback position.
    ///
    /// # Errors
    /// - `InvalidRange` if `end <= start`
    /// - `OutOfRange` if `end` is past the timeline
    pub fn read_region(&mut self, start: usize, end: usize) -> Result<Vec<AudioFrame>> {
        if end <= start {
            return Err(Error::InvalidRange(format!(
                "export end {} must be after start {}",
                end, start
            )));
        }
        if end > self.len() {
            return Err(Error::OutOfRange(format!(
                "export end {} beyond length {}",
                end,
                self.len()
            )));
        }

        let graph = self.looper_mut().inner_mut();
        let saved = graph.position();
        graph.seek(start)?;

        let total = end - start;
        let mut frames = vec![AudioFrame::zero(); total];
        let mut filled = 0;
        while filled < total {
            let want = (total - filled).min(EXPORT_CHUNK);
            let (count, more) = graph.fill(&mut frames[filled..filled + want]);
            filled += count;
            if count == 0 || !more {
                break;
            }
        }

        graph.seek(saved)?;
        debug!("Read {} frames for export ({} from source)", total, filled);
        Ok(frames)
    }

    // ----- status -----

    /// Snapshot of everything the status line shows.
    pub fn status(&self) -> TransportStatus {
        TransportStatus {
            position: self.position(),
            length: self.len(),
            volume_percent: self.volume(),
            speed: self.speed(),
            paused: self.is_paused(),
            looping: self.loop_state(),
            sample_rate: self.sample_rate,
        }
    }
}

impl Source for Transport {
    fn fill(&mut self, out: &mut [AudioFrame]) -> (usize, bool) {
        self.chain.fill(out)
    }

    fn seek(&mut self, pos: usize) -> Result<()> {
        self.seek_to(pos)
    }

    fn len(&self) -> usize {
        self.chain.len()
    }

    fn position(&self) -> usize {
        self.chain.position()
    }
}
