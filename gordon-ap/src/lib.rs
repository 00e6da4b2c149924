//! # Gordon Audio Player Library (gordon-ap)
//!
//! Command-driven playback engine: decode files into memory, mix them on a
//! shared timeline with per-track offsets, and play the result with pause,
//! seek, volume, speed, A-B looping, markers and WAV export of a region.
//!
//! **Architecture:** pull-based source graph (symphonia + rubato in, cpal
//! out) behind one audio lock shared by the device callback and the command
//! loop.

pub mod audio;
pub mod commands;
pub mod error;
pub mod playback;
pub mod repl;
pub mod session;

pub use error::{Error, Result};
pub use session::Session;
