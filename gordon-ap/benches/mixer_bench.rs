//! Mixer and transport throughput benchmark
//!
//! Measures how fast the source graph renders compared to realtime. One
//! second of 44.1kHz audio is pulled per iteration in device-sized chunks.
//!
//! **Target:** far above realtime; a 4-track mix should still exceed 100x.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gordon_ap::audio::AudioFrame;
use gordon_ap::playback::{BufferSource, Graph, Mixer, Source, Transport};
use gordon_common::SampleRate;

const RATE: u32 = 44_100;
const DEVICE_CHUNK: usize = 512;

fn track(len: usize, value: f32) -> Box<dyn Source> {
    Box::new(BufferSource::new(vec![AudioFrame::from_mono(value); len]))
}

fn mixer(tracks: usize) -> Mixer {
    let mut m = Mixer::new(SampleRate::new(RATE));
    for i in 0..tracks {
        m.add_track_frames(track(RATE as usize * 2, 0.1), format!("t{}", i), i * 1_000);
    }
    m
}

fn render_second(source: &mut dyn Source, buf: &mut [AudioFrame]) {
    let mut rendered = 0;
    while rendered < RATE as usize {
        let (count, more) = source.fill(buf);
        rendered += count;
        black_box(&buf[..count]);
        if !more {
            break;
        }
    }
}

fn bench_mixer(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixer_throughput");

    for tracks in [1, 4, 16] {
        group.bench_with_input(BenchmarkId::new("tracks", tracks), &tracks, |b, &tracks| {
            let mut m = mixer(tracks);
            let mut buf = vec![AudioFrame::zero(); DEVICE_CHUNK];
            b.iter(|| {
                // Seeking realigns every track, which is part of the cost
                m.seek(0).ok();
                render_second(&mut m, &mut buf);
            });
        });
    }

    group.finish();
}

fn bench_transport(c: &mut Criterion) {
    let mut group = c.benchmark_group("transport_throughput");

    for speed in [1.0, 1.5] {
        group.bench_with_input(BenchmarkId::new("speed", speed), &speed, |b, &speed| {
            let mut t = Transport::new(Graph::Mixed(mixer(4)), SampleRate::new(RATE), 80)
                .expect("transport");
            t.set_speed(speed).expect("speed");
            t.set_loop(0, RATE as usize, -1).expect("loop");
            let mut buf = vec![AudioFrame::zero(); DEVICE_CHUNK];
            b.iter(|| render_second(&mut t, &mut buf));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_mixer, bench_transport);
criterion_main!(benches);
