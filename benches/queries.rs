use std::ops::Range;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use rand::prelude::*;

use mapped_roaring::{aggregate, ImmutableBitmap, RoaringBitmap, RoaringView};

const SEED0: u64 = 0x0304_0106_0308_0600;
const SEED1: u64 = 0x0905_0407_0608_0102;

fn generate_seeded_data(range: Range<u32>, count: usize, seed: u64) -> Vec<u32> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut result: Vec<u32> = range.collect();

    // Randomly remove values till we have the desired number
    while result.len() > count {
        let index = rng.gen_range(0..result.len());
        result.swap_remove(index);
    }

    result.sort_unstable();

    result
}

fn setup_large() -> (RoaringBitmap, RoaringBitmap) {
    let data_a = generate_seeded_data(0..5_000_000, 4_000_000, SEED0);
    let data_b = generate_seeded_data(0..5_000_000, 4_000_000, SEED1);

    let a = RoaringBitmap::from_slice(&data_a);
    let b = RoaringBitmap::from_slice(&data_b);

    (a, b)
}

fn setup_small() -> (RoaringBitmap, RoaringBitmap) {
    let data_a = generate_seeded_data(0..2_000_000, 500_000, SEED0);
    let data_b = generate_seeded_data(0..2_000_000, 500_000, SEED1);

    let a = RoaringBitmap::from_slice(&data_a);
    let b = RoaringBitmap::from_slice(&data_b);

    (a, b)
}

fn setup_runs() -> (RoaringBitmap, RoaringBitmap) {
    let mut a = RoaringBitmap::new();
    let mut b = RoaringBitmap::new();

    for i in 0..2_000 {
        a.add_range(i * 3_000..i * 3_000 + 1_500);
        b.add_range(i * 3_000 + 700..i * 3_000 + 2_800);
    }

    a.run_optimize();
    b.run_optimize();

    (a, b)
}

fn serialized(bitmap: &RoaringBitmap) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(bitmap.serialized_size());
    bitmap.serialize(&mut bytes).unwrap();

    bytes
}

fn pairwise(c: &mut Criterion) {
    let setups = [
        ("large", setup_large()),
        ("small", setup_small()),
        ("runs", setup_runs())
    ];

    for (name, (a, b)) in setups.iter() {
        c.bench_function(&format!("roaring or - {}", name), |bencher| {
            bencher.iter_with_large_drop(|| a.or(b))
        });

        c.bench_function(&format!("roaring and - {}", name), |bencher| {
            bencher.iter_with_large_drop(|| a.and(b))
        });

        c.bench_function(&format!("roaring and not - {}", name), |bencher| {
            bencher.iter_with_large_drop(|| a.and_not(b))
        });

        c.bench_function(&format!("roaring xor - {}", name), |bencher| {
            bencher.iter_with_large_drop(|| a.xor(b))
        });
    }
}

fn inplace(c: &mut Criterion) {
    let (a, b) = setup_large();

    c.bench_function("roaring inplace or - large", |bencher| {
        bencher.iter_batched(|| a.clone(), |mut a| { a.inplace_or(&b); a }, BatchSize::LargeInput)
    });

    c.bench_function("roaring inplace and - large", |bencher| {
        bencher.iter_batched(|| a.clone(), |mut a| { a.inplace_and(&b); a }, BatchSize::LargeInput)
    });

    c.bench_function("roaring inplace and not - large", |bencher| {
        bencher.iter_batched(|| a.clone(), |mut a| { a.inplace_and_not(&b); a }, BatchSize::LargeInput)
    });

    c.bench_function("roaring inplace xor - large", |bencher| {
        bencher.iter_batched(|| a.clone(), |mut a| { a.inplace_xor(&b); a }, BatchSize::LargeInput)
    });
}

fn views(c: &mut Criterion) {
    let (a, b) = setup_large();
    let (bytes_a, bytes_b) = (serialized(&a), serialized(&b));

    c.bench_function("view open - large", |bencher| {
        bencher.iter(|| RoaringView::new(black_box(&bytes_a)).unwrap().container_count())
    });

    c.bench_function("view and - large", |bencher| {
        let view_a = RoaringView::new(&bytes_a).unwrap();
        let view_b = RoaringView::new(&bytes_b).unwrap();

        bencher.iter_with_large_drop(|| view_a.and(&view_b))
    });

    c.bench_function("view contains - large", |bencher| {
        let view = RoaringView::new(&bytes_a).unwrap();

        bencher.iter(|| (0..5_000_000).step_by(101).filter(|value| view.contains(*value)).count())
    });

    c.bench_function("deserialize - large", |bencher| {
        bencher.iter_with_large_drop(|| RoaringBitmap::deserialize(&mut &bytes_a[..]).unwrap())
    });
}

fn aggregates(c: &mut Criterion) {
    let inputs: Vec<RoaringBitmap> = (0..8)
        .map(|seed| RoaringBitmap::from_slice(&generate_seeded_data(0..2_000_000, 800_000, seed)))
        .collect();

    c.bench_function("aggregate or - 8 inputs", |bencher| {
        bencher.iter_with_large_drop(|| aggregate::or(&inputs))
    });

    c.bench_function("aggregate and range - 8 inputs", |bencher| {
        bencher.iter_with_large_drop(|| aggregate::and_range(&inputs, 500_000, 700_000).unwrap())
    });
}

criterion_group!(roaring, pairwise, inplace);
criterion_group!(roaring_views, views, aggregates);

criterion_main!(roaring, roaring_views);
