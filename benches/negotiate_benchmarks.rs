//! Performance benchmarks for preview negotiation
//!
//! Run with: cargo bench --bench negotiate_benchmarks
//!
//! Negotiation runs on the camera worker on every start and restart, so it
//! should stay negligible next to the driver calls around it.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use crabpreview::capability::select_fps_range;
use crabpreview::negotiate::{clamp_to_preferred, select_optimal};
use crabpreview::types::{FpsRange, Size};

/// Size table shaped like a phone driver's: mixed 4:3, 16:9 and odd ratios
fn generate_sizes(count: usize) -> Vec<Size> {
    let ratios = [(4, 3), (16, 9), (11, 9), (1, 1), (18, 9)];
    (0..count)
        .map(|i| {
            let (rw, rh) = ratios[i % ratios.len()];
            let scale = 16 + (i as u32 * 7) % 240;
            Size::new(rw * scale, rh * scale)
        })
        .collect()
}

fn bench_select_optimal(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_optimal");
    let target = clamp_to_preferred(Size::new(1920, 1080), Size::new(1280, 720));

    for count in [8usize, 32, 128] {
        let sizes = generate_sizes(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &sizes, |b, sizes| {
            b.iter(|| select_optimal(black_box(sizes), black_box(target)))
        });
    }
    group.finish();
}

fn bench_select_fps_range(c: &mut Criterion) {
    let ranges: Vec<FpsRange> = (0..16)
        .map(|i| FpsRange::new(i * 1000, 15000 + (i * 3000) % 45000))
        .collect();
    c.bench_function("select_fps_range", |b| {
        b.iter(|| select_fps_range(black_box(&ranges)))
    });
}

criterion_group!(benches, bench_select_optimal, bench_select_fps_range);
criterion_main!(benches);
