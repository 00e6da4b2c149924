//! Integration tests for file decoding and rate normalization

mod helpers;

use gordon_ap::audio::SimpleDecoder;
use gordon_ap::playback::Source;
use gordon_ap::Error;
use gordon_common::SampleRate;
use helpers::{write_constant_wav, write_ramp_wav, TEST_RATE};
use std::path::Path;

#[test]
fn test_decode_stereo_wav_at_session_rate() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_constant_wav(dir.path(), "tone.wav", 1_234, TEST_RATE, 16_384);

    let (source, info) = SimpleDecoder::load_source(&path, SampleRate::new(TEST_RATE)).unwrap();
    assert_eq!(info.sample_rate, TEST_RATE);
    assert_eq!(info.channels, 2);
    assert_eq!(info.frames, 1_234);
    assert_eq!(source.len(), 1_234);
    assert_eq!(source.position(), 0);
    assert!((source.frames()[100].left - 0.5).abs() < 1e-3);
}

#[test]
fn test_decode_mono_duplicates_channels() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_ramp_wav(dir.path(), "mono.wav", 500, TEST_RATE);

    let (source, info) = SimpleDecoder::load_source(&path, SampleRate::new(TEST_RATE)).unwrap();
    assert_eq!(info.channels, 1);
    assert_eq!(source.len(), 500);
    let frame = source.frames()[250];
    assert_eq!(frame.left, frame.right);
    assert!(frame.left > 0.0);
}

#[test]
fn test_decode_resamples_to_session_rate() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_constant_wav(dir.path(), "hi.wav", 16_000, 16_000, 1_000);

    let (source, info) = SimpleDecoder::load_source(&path, SampleRate::new(TEST_RATE)).unwrap();
    assert_eq!(info.sample_rate, 16_000);
    assert_eq!(info.frames, 16_000);
    // One second of audio either way
    let len = source.len() as i64;
    assert!((len - TEST_RATE as i64).abs() <= 64, "got {} frames", len);
}

#[test]
fn test_unsupported_extension_is_rejected() {
    let err = SimpleDecoder::load_source(Path::new("notes.txt"), SampleRate::new(TEST_RATE)).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(_)), "{:?}", err);
}

#[test]
fn test_missing_file_is_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SimpleDecoder::load_source(&dir.path().join("gone.wav"), SampleRate::new(TEST_RATE)).unwrap_err();
    assert!(matches!(err, Error::Decode(_)), "{:?}", err);
}

#[test]
fn test_garbage_wav_is_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("junk.wav");
    std::fs::write(&path, b"definitely not a riff file").unwrap();
    let err = SimpleDecoder::load_source(&path, SampleRate::new(TEST_RATE)).unwrap_err();
    assert!(matches!(err, Error::Decode(_)), "{:?}", err);
}
