//! Benchmarks for stream network extraction

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hydrotrace_algorithms::extraction::extract_network;
use hydrotrace_algorithms::filter::FilterConfig;
use hydrotrace_algorithms::pipeline::{run_pipeline, PipelineConfig};
use hydrotrace_core::{GeoTransform, Raster};

/// Valley basin: a main channel down the middle column fed by a
/// tributary every eighth row
fn synthetic_basin(size: usize) -> (Raster<u8>, Raster<f64>) {
    let gt = GeoTransform::new(0.0, (size * 10) as f64, 10.0, -10.0);
    let mid = size / 2;

    let mut dir: Raster<u8> = Raster::new(size, size);
    dir.set_transform(gt);
    let mut acc: Raster<f64> = Raster::new(size, size);
    acc.set_transform(gt);

    for row in 0..size {
        for col in 0..size {
            let d = match col.cmp(&mid) {
                std::cmp::Ordering::Less => 1,
                std::cmp::Ordering::Greater => 5,
                std::cmp::Ordering::Equal => 7,
            };
            dir.set(row, col, d).unwrap();

            let a = if col == mid {
                (size * (row + 1)) as f64
            } else if row % 8 == 0 && col < mid {
                (size + col) as f64
            } else {
                (size - col.abs_diff(mid)) as f64 / 2.0
            };
            acc.set(row, col, a).unwrap();
        }
    }

    (dir, acc)
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_network");

    for size in [256, 512, 1024].iter() {
        let (dir, acc) = synthetic_basin(*size);
        let threshold = *size as u32;

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| extract_network(black_box(&dir), black_box(&acc), threshold).unwrap())
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_pipeline");
    group.sample_size(20);

    for size in [256, 512].iter() {
        let (dir, acc) = synthetic_basin(*size);
        let config = PipelineConfig {
            thresholds: vec![*size as u32, (*size * 2) as u32],
            filter: FilterConfig::default(),
        };

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| run_pipeline(black_box(&dir), black_box(&acc), &config).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_extract, bench_pipeline);
criterion_main!(benches);
