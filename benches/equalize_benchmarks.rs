//! Benchmarks for histogram equalization
//!
//! Compares the sequential reference against the worker group at several sizes

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use parheq::{coordinator, EqualizeParams, GroupConfig, IntensityBuffer, Mode};
use std::time::Duration;

fn create_test_image(width: u32, height: u32) -> IntensityBuffer {
    let values = (0..width * height)
        .map(|i| (i % width + (i / width) * 3) % 256)
        .collect();
    IntensityBuffer::from_vec(width, height, values).unwrap()
}

fn benchmark_equalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("equalize");
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(20);

    for size in [256u32, 512, 1024] {
        let image = create_test_image(size, size);
        let label = format!("{}x{}", size, size);

        let seq = coordinator(GroupConfig::default().with_workers(1), EqualizeParams::default())
            .unwrap();
        group.bench_with_input(BenchmarkId::new("sequential", &label), &image, |b, img| {
            b.iter(|| {
                let mut buf = img.clone();
                seq.run(Mode::Reference, black_box(&mut buf)).unwrap();
            });
        });

        for workers in [2usize, 4, 8] {
            let par = coordinator(
                GroupConfig::default().with_workers(workers),
                EqualizeParams::default(),
            )
            .unwrap();
            group.bench_with_input(
                BenchmarkId::new(format!("parallel-{}", workers), &label),
                &image,
                |b, img| {
                    b.iter(|| {
                        let mut buf = img.clone();
                        par.run(Mode::Distributed, black_box(&mut buf)).unwrap();
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, benchmark_equalize);
criterion_main!(benches);
