//! Benchmarks for the CPU-side particle field.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec2;
use stardrift::field::{FieldConfig, ParticleField};
use stardrift::motion::{Easing, MotionState};
use stardrift::surface::RecordingSurface;
use stardrift::viewport::Viewport;

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_update");

    for count in [140u32, 240, 2_000, 20_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let config = FieldConfig::default().with_counts(count, count);
            let mut field = ParticleField::seeded(config, Viewport::new(1280.0, 720.0), 42);
            b.iter(|| field.update(black_box(0.016)))
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_render");

    group.bench_function("recording_240", |b| {
        let field = ParticleField::seeded(FieldConfig::default(), Viewport::new(1280.0, 720.0), 7);
        let mut surface = RecordingSurface::new();
        b.iter(|| {
            field.render(&mut surface);
            black_box(surface.take().len())
        })
    });

    group.finish();
}

fn bench_regenerate(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_regenerate");

    group.bench_function("resize_large_small", |b| {
        let mut field = ParticleField::seeded(FieldConfig::default(), Viewport::new(1280.0, 720.0), 3);
        let mut small = false;
        b.iter(|| {
            small = !small;
            let viewport = if small { Viewport::new(320.0, 480.0) } else { Viewport::new(1280.0, 720.0) };
            field.regenerate(black_box(viewport));
        })
    });

    group.finish();
}

fn bench_motion(c: &mut Criterion) {
    let mut group = c.benchmark_group("motion");

    group.bench_function("pointer_decay_to_rest", |b| {
        b.iter(|| {
            let mut motion = MotionState::default();
            motion.push(black_box(Vec2::new(10.0, -4.0)));
            let mut ticks = 0;
            while motion.decay(0.1, 0.01) {
                ticks += 1;
            }
            ticks
        })
    });

    group.bench_function("css_ease", |b| {
        b.iter(|| {
            (0..100)
                .map(|i| Easing::Ease.apply(black_box(i as f32 / 100.0)))
                .sum::<f32>()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_update, bench_render, bench_regenerate, bench_motion);
criterion_main!(benches);
