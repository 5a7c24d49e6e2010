// Timing Benchmarks
// Performance benchmarks for the raster timing generator

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use scanout::config::VideoMode;
use scanout::stream::StreamElement;
use scanout::{FrameGeometry, FrameProgram, PixelSample, TimingGenerator};
use std::hint::black_box;

fn geometry(mode: &VideoMode) -> FrameGeometry {
    FrameGeometry::new(mode.horizontal, mode.vertical, 0, 0)
}

/// Benchmark one full frame of timing steps with pixels always available
fn bench_timing_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("timing_frame");
    group.sample_size(20);

    for mode in [VideoMode::VGA_640X480_60, VideoMode::HD_1280X720_60] {
        let g = geometry(&mode);
        let steps = g.steps_per_frame();
        let program = FrameProgram::running(g);
        let token = program.token();
        let pixel = Some(StreamElement::new(PixelSample(0x8080)));

        group.bench_with_input(BenchmarkId::from_parameter(mode.name), &steps, |b, &steps| {
            let mut timing = TimingGenerator::new();
            b.iter(|| {
                for _ in 0..steps {
                    let out = timing.source(token.as_ref(), pixel.as_ref());
                    timing.tick(token.as_ref(), pixel.as_ref(), true);
                    black_box(out);
                }
            });
        });
    }

    group.finish();
}

/// Benchmark the pure next-state computation
fn bench_timing_next_state(c: &mut Criterion) {
    let mode = VideoMode::VGA_640X480_60;
    let mut state = scanout::TimingState::default();

    c.bench_function("timing_next_state", |b| {
        b.iter(|| {
            state = black_box(&state).next(&mode.horizontal, &mode.vertical);
        });
    });
}

criterion_group!(benches, bench_timing_frame, bench_timing_next_state);
criterion_main!(benches);
