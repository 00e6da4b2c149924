//! Integration tests for the playback transport
//!
//! Drives the full stage chain (graph, looper, speed, pause, volume) the way
//! the output callback does.

mod helpers;

use gordon_ap::audio::AudioFrame;
use gordon_ap::playback::{Graph, Mixer, Source, Transport};
use gordon_ap::Error;
use gordon_common::SampleRate;
use helpers::{constant, drain, lefts, ramp};

const RATE: u32 = 1_000;

fn mixed(tracks: &[(usize, usize)]) -> Transport {
    let mut mixer = Mixer::new(SampleRate::new(RATE));
    for (i, &(len, offset)) in tracks.iter().enumerate() {
        mixer.add_track_frames(Box::new(ramp(len)), format!("t{}", i), offset);
    }
    Transport::new(Graph::Mixed(mixer), SampleRate::new(RATE), 100).unwrap()
}

/// Render exactly `frames` frames in one device-sized pull.
fn play(t: &mut Transport, frames: usize) -> Vec<AudioFrame> {
    let mut buf = vec![AudioFrame::zero(); frames];
    let (count, _) = t.fill(&mut buf);
    buf.truncate(count);
    buf
}

/// Value of the next frame played, which carries its timeline index.
fn next_value(t: &mut Transport) -> f32 {
    play(t, 1)[0].left
}

#[test]
fn test_paused_transport_keeps_position_while_rendering_silence() {
    let mut t = mixed(&[(5_000, 0)]);
    drain(&mut t, 100, 300);
    assert_eq!(t.position(), 300);

    t.set_paused(true);
    let mut buf = [AudioFrame::from_mono(9.0); 256];
    for _ in 0..10 {
        let (count, more) = t.fill(&mut buf);
        assert_eq!(count, 256);
        assert!(more);
        assert!(buf.iter().all(|f| f.is_silent()));
    }
    assert_eq!(t.position(), 300);

    t.set_paused(false);
    let out = lefts(&drain(&mut t, 4, 4));
    assert_eq!(out, vec![300.0, 301.0, 302.0, 303.0]);
}

#[test]
fn test_relative_seek_clamps_to_timeline() {
    let mut t = mixed(&[(2_000, 0)]);
    assert_eq!(t.seek_relative(1.5).unwrap(), 1_500);
    assert_eq!(t.seek_relative(-0.25).unwrap(), 1_250);
    assert_eq!(t.seek_relative(60.0).unwrap(), 1_999);
    assert_eq!(t.seek_relative(-60.0).unwrap(), 0);
}

#[test]
fn test_loop_between_positions_repeats() {
    let mut t = mixed(&[(1_000, 0)]);
    t.set_loop(100, 110, 3).unwrap();
    t.seek_to(100).unwrap();
    let out = lefts(&drain(&mut t, 16, usize::MAX));
    assert_eq!(out.len(), 30);
    assert_eq!(out[10], 100.0);
    assert_eq!(out[29], 109.0);
    assert!(matches!(t.set_loop(50, 50, 1), Err(Error::InvalidRange(_))));
}

#[test]
fn test_volume_scales_output() {
    let mut t = Transport::single(Box::new(constant(100, 0.8)), SampleRate::new(RATE), 50).unwrap();
    let out = lefts(&drain(&mut t, 10, 10));
    assert!(out.iter().all(|v| (v - 0.4).abs() < 1e-6));

    assert!(matches!(t.set_volume(101), Err(Error::OutOfRange(_))));
    assert_eq!(t.volume(), 50);
    assert_eq!(t.step_volume(80), 100);
    assert_eq!(t.step_volume(-250), 0);
}

#[test]
fn test_double_speed_halves_duration() {
    let mut t = mixed(&[(1_000, 0)]);
    t.set_speed(2.0).unwrap();
    let out = drain(&mut t, 64, usize::MAX);
    assert!((495..=505).contains(&out.len()), "got {}", out.len());
    assert!(matches!(t.set_speed(0.0), Err(Error::InvalidInput(_))));
}

#[test]
fn test_adding_track_extends_unlooped_playback() {
    let mut t = mixed(&[(100, 0)]);
    t.add_track(Box::new(ramp(100)), "late", 0.15).unwrap();
    assert_eq!(t.len(), 250);
    assert_eq!(t.tracks().len(), 2);

    let out = drain(&mut t, 32, usize::MAX);
    assert_eq!(out.len(), 250);
    assert_eq!(out[249].left, 99.0);
}

#[test]
fn test_read_region_ignores_loop_and_volume() {
    let mut t = mixed(&[(500, 0)]);
    t.set_volume(10).unwrap();
    t.set_loop(0, 20, -1).unwrap();
    t.seek_to(5).unwrap();

    let frames = t.read_region(200, 260).unwrap();
    assert_eq!(frames.len(), 60);
    assert_eq!(frames[0].left, 200.0);
    assert_eq!(frames[59].left, 259.0);
    assert_eq!(t.position(), 5);
}

#[test]
fn test_status_reflects_state() {
    let mut t = mixed(&[(90_000, 0)]);
    t.seek_to(61_250).unwrap();
    t.set_volume(40).unwrap();
    t.set_loop(1_000, 2_000, 2).unwrap();

    let status = t.status();
    assert_eq!(status.position, 61_250);
    assert_eq!(status.length, 90_000);
    assert!(!status.paused);
    let line = status.to_string();
    assert!(line.starts_with("1:01.250 / 1:30.000 (Volume: 40%"), "{}", line);
    assert!(line.contains("loop"), "{}", line);
}

#[test]
fn test_speed_outside_bounds_is_rejected() {
    let mut t = mixed(&[(1_000, 0)]);
    for speed in [1e20, f64::INFINITY, 1_000.0, 0.001] {
        assert!(matches!(t.set_speed(speed), Err(Error::InvalidInput(_))), "{}", speed);
    }
    assert_eq!(t.speed(), 1.0);

    // Top speed still finishes in bounded time
    t.set_speed(100.0).unwrap();
    let out = drain(&mut t, 256, usize::MAX);
    assert_eq!(out.len(), 10);
}

#[test]
fn test_position_after_whole_source_wraps() {
    let mut t = Transport::single(Box::new(ramp(100)), SampleRate::new(RATE), 100).unwrap();
    t.set_loop(0, 100, -1).unwrap();

    let out = play(&mut t, 70);
    assert_eq!(out[69].left, 69.0);
    assert_eq!(t.position(), 70);

    play(&mut t, 60);
    assert_eq!(t.position(), 30);
    assert_eq!(next_value(&mut t), 30.0);
}

#[test]
fn test_position_follows_loop_at_unity() {
    let mut t = mixed(&[(1_000, 0)]);
    t.set_loop(20, 60, -1).unwrap();
    t.seek_to(20).unwrap();

    let mut played = 0;
    for step in [7, 33, 64, 100, 1, 250, 39] {
        play(&mut t, step);
        played += step;
        let expected = 20 + played % 40;
        assert_eq!(t.position(), expected, "after {} frames", played);
        assert_eq!(next_value(&mut t), expected as f32, "after {} frames", played);
        played += 1;
    }
}

#[test]
fn test_position_follows_loop_at_one_and_a_half() {
    let mut t = mixed(&[(1_000, 0)]);
    t.set_loop(20, 60, -1).unwrap();
    t.set_speed(1.5).unwrap();
    t.seek_to(20).unwrap();

    // Even frame counts land the read head on whole input frames
    let mut played = 0;
    for (target, expected) in [(10, 35), (26, 59), (50, 55), (100, 50)] {
        play(&mut t, target - played);
        played = target;
        assert_eq!(t.position(), expected, "after {} frames", played);
    }
    assert_eq!(next_value(&mut t), 50.0);
}

#[test]
fn test_marked_position_round_trips_while_looping() {
    for speed in [1.0, 1.5] {
        let mut t = mixed(&[(1_000, 0)]);
        t.set_loop(100, 164, -1).unwrap();
        t.set_speed(speed).unwrap();
        t.seek_to(100).unwrap();

        // Long enough to wrap several times inside the speed stage's lookahead
        for step in [90, 46, 200, 64] {
            play(&mut t, step);
            let mark = t.position();
            assert!((100..164).contains(&mark), "{}x: {}", speed, mark);

            play(&mut t, 37);
            t.seek_to(mark).unwrap();
            assert_eq!(t.position(), mark, "{}x", speed);
            assert_eq!(next_value(&mut t), mark as f32, "{}x", speed);
        }
    }
}
