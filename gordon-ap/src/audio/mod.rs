//! Audio collaborators around the streaming engine
//!
//! - `decoder`: symphonia whole-file decode to an in-memory source
//! - `resampler`: rubato rate normalization to the session rate
//! - `encoder`: hound WAV writer for region export
//! - `output`: cpal device stream that plays the deck

pub mod decoder;
pub mod encoder;
pub mod output;
pub mod resampler;
pub mod types;

pub use decoder::{DecodedInfo, SimpleDecoder};
pub use encoder::WavEncoder;
pub use output::AudioOutput;
pub use resampler::Resampler;
pub use types::AudioFrame;
