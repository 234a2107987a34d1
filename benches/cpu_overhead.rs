//! Benchmarks for the CPU-side work a frame can incur: color generation,
//! shader-variant source assembly, and resolution derivation. The GPU
//! passes themselves are out of scope here.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use splashcursor::color::hsv_to_rgb;
use splashcursor::grid_resolution;
use splashcursor::shader::{apply_keywords, keyword_set};
use splashcursor::shaders;

fn bench_hsv_conversion(c: &mut Criterion) {
    c.bench_function("hsv_to_rgb sweep", |b| {
        b.iter(|| {
            let mut acc = 0.0f32;
            for i in 0..256 {
                let rgb = hsv_to_rgb(black_box(i as f32 / 256.0), 1.0, 1.0);
                acc += rgb.r + rgb.g + rgb.b;
            }
            acc
        })
    });
}

fn bench_variant_source_assembly(c: &mut Criterion) {
    let template = shaders::two_texture(shaders::ADVECTION);
    let manual = keyword_set(&["MANUAL_FILTERING"]);
    let plain = keyword_set(&[]);

    c.bench_function("advection variant (manual filtering)", |b| {
        b.iter(|| apply_keywords(black_box(&template), &manual))
    });
    c.bench_function("advection variant (plain)", |b| {
        b.iter(|| apply_keywords(black_box(&template), &plain))
    });
}

fn bench_grid_resolution(c: &mut Criterion) {
    c.bench_function("grid_resolution", |b| {
        b.iter(|| grid_resolution(black_box(128), black_box(1920), black_box(1080)))
    });
}

criterion_group!(
    benches,
    bench_hsv_conversion,
    bench_variant_source_assembly,
    bench_grid_resolution
);
criterion_main!(benches);
