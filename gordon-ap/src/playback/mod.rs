//! Streaming engine: the pull-based audio graph and its transport

pub mod buffer_source;
pub mod deck;
pub mod effects;
pub mod looper;
pub mod markers;
pub mod mixer;
pub mod noise;
pub mod offset;
pub mod source;
pub mod transport;

pub use buffer_source::BufferSource;
pub use deck::{AudioLock, Deck};
pub use looper::{RegionLooper, LOOP_FOREVER};
pub use markers::{Marker, MarkerTable};
pub use mixer::{Mixer, TrackId, TrackInfo};
pub use noise::PinkNoise;
pub use offset::OffsetSource;
pub use source::{Source, INFINITE};
pub use transport::{Graph, LoopState, Transport, TransportStatus};
