//! Error types for gordon-ap
//!
//! Every failure a transport command can hit is a typed variant here. The
//! command layer renders them as a one-line message; none of them tear down
//! the audio graph, which stays in its last valid state.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for gordon-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Seek or index outside valid bounds
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// Unknown track or marker id
    #[error("Not found: {0}")]
    NotFound(String),

    /// Region end does not come after its start
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// Operation not valid for this source (e.g. seeking a generator)
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// File extension / container not recognized
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio encoding errors (export)
    #[error("Audio encode error: {0}")]
    Encode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Invalid command argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A command needs loaded audio and none is loaded
    #[error("No audio loaded")]
    NoSession,

    /// One file of a multi-file load failed; earlier files stay loaded
    #[error("Failed to load {}: {source}", path.display())]
    Load {
        /// File that failed
        path: PathBuf,
        /// Underlying decode failure
        #[source]
        source: Box<Error>,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] gordon_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using gordon-ap Error
pub type Result<T> = std::result::Result<T, Error>;
