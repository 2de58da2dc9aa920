// This file is part of packed_cardinality. Copyright © 2026 packed_cardinality contributors.
// packed_cardinality is licensed under the GNU GPL v3.0 or any later version. See LICENSE file for full text.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use packed_cardinality::{CompressionFlags, HyperLogLog, HyperLogLogLog, PackedVector};

const M: usize = 1024;
const N: usize = 10_000;

fn inputs() -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(0x0DDB1A5E5BA57A6E);
    (0..N).map(|_| rng.gen()).collect()
}

fn bench_packed_vector(c: &mut Criterion) {
    c.bench_function("packed_vector_set_get", |b| {
        let mut v = PackedVector::new(6, M);
        b.iter(|| {
            for i in 0..M {
                v.set(i, (i % 64) as u64);
            }
            let mut sum = 0u64;
            for i in 0..M {
                sum += v.get(i);
            }
            black_box(sum)
        })
    });
}

fn bench_sketch_add(c: &mut Criterion) {
    let data = inputs();

    c.bench_function("hyperloglog_add", |b| {
        b.iter_batched(
            || HyperLogLog::new(M).unwrap(),
            |mut sketch| {
                for x in &data {
                    sketch.add(x);
                }
                sketch
            },
            BatchSize::SmallInput,
        )
    });

    for (name, flags) in [
        ("hyperlogloglog_add_default", CompressionFlags::DEFAULT),
        ("hyperlogloglog_add_appendonly", CompressionFlags::WHEN_APPEND),
        ("hyperlogloglog_add_bottom", CompressionFlags::BOTTOM),
    ] {
        c.bench_function(name, |b| {
            b.iter_batched(
                || HyperLogLogLog::with_options(M, 3, flags).unwrap(),
                |mut sketch| {
                    for x in &data {
                        sketch.add(x);
                    }
                    sketch
                },
                BatchSize::SmallInput,
            )
        });
    }
}

fn bench_merge(c: &mut Criterion) {
    let data = inputs();
    let mut first = HyperLogLogLog::new(M).unwrap();
    let mut second = HyperLogLogLog::new(M).unwrap();
    for x in &data[..N / 2] {
        first.add(x);
    }
    for x in &data[N / 2..] {
        second.add(x);
    }

    c.bench_function("hyperlogloglog_merge", |b| {
        b.iter(|| first.merge(black_box(&second)).unwrap())
    });
}

criterion_group!(benches, bench_packed_vector, bench_sketch_add, bench_merge);
criterion_main!(benches);
