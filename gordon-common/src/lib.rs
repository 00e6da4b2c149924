//! # Gordon Common Library
//!
//! Shared code for the gordon player crates:
//! - Configuration file model and resolution
//! - Common error type
//! - Sample rate and time conversion helpers

pub mod config;
pub mod error;
pub mod time;

pub use config::{LoggingConfig, PlayerConfig};
pub use error::{Error, Result};
pub use time::SampleRate;
