//! Benchmark: absorb JPEG headers in ABS and MAIN modes, with and without a leading region to
//! scan, and regenerate an absorbed tree.

use absorbdsl::formats::jpg;
use absorbdsl::{absorb, generate, Mode};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const HEADERS: [u8; 25] = [
    0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x00, 0x10, 0x00, 0x10, 0x01, 0x01, 0x11, 0x00, //
    0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00, //
    0xFF, 0xD9,
];

fn with_prefix(n: usize) -> Vec<u8> {
    let mut data: Vec<u8> = (0..n).map(|i| (i % 251) as u8).collect();
    data.extend_from_slice(&HEADERS);
    data
}

fn bench_absorb(c: &mut Criterion) {
    let model = jpg::data_model().expect("schema");
    let engine = model.engine();
    let padded = with_prefix(4096);

    c.bench_function("absorb_abs", |b| b.iter(|| engine.absorb(black_box(&HEADERS))));
    c.bench_function("absorb_main", |b| {
        b.iter(|| absorb(&model.schema, black_box(&HEADERS), &Mode::MAIN))
    });
    c.bench_function("absorb_region_4k", |b| b.iter(|| engine.absorb(black_box(&padded))));

    let result = engine.absorb(&HEADERS);
    let tree = result.instance_tree.expect("tree");
    c.bench_function("generate_main", |b| b.iter(|| generate(black_box(&tree), &Mode::MAIN)));
}

criterion_group!(benches, bench_absorb);
criterion_main!(benches);
