//! Deck: everything the output callback plays
//!
//! The deck holds the optional active transport and an optional free-running
//! pink noise voice. It is shared between the output callback and the
//! command handlers through one [`AudioLock`]; a handler that needs several
//! fields (status line, export) takes the lock once for the whole read.

use crate::audio::types::{AudioFrame, CALLBACK_FRAMES};
use crate::playback::effects::Volume;
use crate::playback::noise::PinkNoise;
use crate::playback::source::Source;
use crate::playback::transport::Transport;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// The single mutual-exclusion boundary around playback state
pub type AudioLock = Arc<Mutex<Deck>>;

/// Playback state guarded by the audio lock
pub struct Deck {
    transport: Option<Transport>,
    noise: Option<Volume<PinkNoise>>,
    scratch: Vec<AudioFrame>,
}

impl Deck {
    /// Empty deck: renders silence.
    pub fn new() -> Self {
        Self {
            transport: None,
            noise: None,
            scratch: Vec::with_capacity(CALLBACK_FRAMES),
        }
    }

    /// Empty deck behind a fresh audio lock.
    pub fn shared() -> AudioLock {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Active transport, if audio is loaded
    pub fn transport(&self) -> Option<&Transport> {
        self.transport.as_ref()
    }

    /// Mutable access to the active transport
    pub fn transport_mut(&mut self) -> Option<&mut Transport> {
        self.transport.as_mut()
    }

    /// Install a new transport, returning the one it replaces.
    pub fn replace_transport(&mut self, transport: Transport) -> Option<Transport> {
        self.transport.replace(transport)
    }

    /// Drop the active transport.
    pub fn clear_transport(&mut self) -> Option<Transport> {
        self.transport.take()
    }

    /// Noise volume in percent, `None` when the noise voice is off
    pub fn noise_volume(&self) -> Option<u8> {
        self.noise.as_ref().map(|n| n.percent())
    }

    /// Turn the noise voice on at `percent`, or adjust it if already on.
    pub fn set_noise(&mut self, percent: u8) {
        match self.noise.as_mut() {
            Some(noise) => noise.set_percent(percent),
            None => self.noise = Some(Volume::new(PinkNoise::new(), percent)),
        }
        info!("Pink noise on at {}%", percent.min(100));
    }

    /// Turn the noise voice off.
    pub fn stop_noise(&mut self) {
        if self.noise.take().is_some() {
            info!("Pink noise off");
        }
    }

    /// Toggle the noise voice; returns whether it is now on.
    pub fn toggle_noise(&mut self, percent: u8) -> bool {
        if self.noise.is_some() {
            self.stop_noise();
            false
        } else {
            self.set_noise(percent);
            true
        }
    }

    /// Render one device buffer.
    ///
    /// Whatever the transport does not fill stays silent; the noise voice is
    /// added on top.
    pub fn render(&mut self, out: &mut [AudioFrame]) {
        out.fill(AudioFrame::zero());

        if let Some(transport) = self.transport.as_mut() {
            transport.fill(out);
        }

        if let Some(noise) = self.noise.as_mut() {
            if self.scratch.len() < out.len() {
                self.scratch.resize(out.len(), AudioFrame::zero());
            }
            let scratch = &mut self.scratch[..out.len()];
            let (count, _) = noise.fill(scratch);
            for (mixed, frame) in out.iter_mut().zip(scratch[..count].iter()) {
                mixed.add(frame);
            }
        }
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::buffer_source::BufferSource;
    use gordon_common::SampleRate;

    fn transport(n: usize, value: f32) -> Transport {
        let src = BufferSource::new(vec![AudioFrame::from_mono(value); n]);
        Transport::single(Box::new(src), SampleRate::new(100), 100).unwrap()
    }

    #[test]
    fn test_empty_deck_renders_silence() {
        let mut deck = Deck::new();
        let mut buf = [AudioFrame::from_mono(1.0); 16];
        deck.render(&mut buf);
        assert!(buf.iter().all(|f| f.is_silent()));
    }

    #[test]
    fn test_render_pads_after_end() {
        let mut deck = Deck::new();
        deck.replace_transport(transport(5, 0.5));
        let mut buf = [AudioFrame::from_mono(1.0); 8];
        deck.render(&mut buf);
        assert!(buf[..5].iter().all(|f| f.left == 0.5));
        assert!(buf[5..].iter().all(|f| f.is_silent()));
    }

    #[test]
    fn test_noise_toggle() {
        let mut deck = Deck::new();
        assert!(deck.toggle_noise(30));
        assert_eq!(deck.noise_volume(), Some(30));

        let mut buf = [AudioFrame::zero(); 64];
        deck.render(&mut buf);
        assert!(buf.iter().any(|f| !f.is_silent()));
        assert!(buf.iter().all(|f| f.left.abs() <= 0.3 + f32::EPSILON));

        deck.set_noise(60);
        assert_eq!(deck.noise_volume(), Some(60));

        assert!(!deck.toggle_noise(30));
        assert_eq!(deck.noise_volume(), None);
    }

    #[test]
    fn test_shared_lock() {
        let lock = Deck::shared();
        lock.lock().replace_transport(transport(10, 0.1));
        assert!(lock.lock().transport().is_some());
        assert!(lock.lock().clear_transport().is_some());
        assert!(lock.lock().transport().is_none());
    }
}
