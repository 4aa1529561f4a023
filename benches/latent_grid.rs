//! Latent grid and composite tiling benchmarks.

#![allow(clippy::disallowed_methods)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vae_latent_viz::dataset::{SampleMatrix, IMAGE_SIZE};
use vae_latent_viz::grid::{CompositeImage, LatentGrid};

fn benchmark_grid_construction(c: &mut Criterion) {
    c.bench_function("latent_grid_30x30", |b| {
        b.iter(|| {
            let grid = LatentGrid::new(black_box(30), (-1.0, 1.0));
            black_box(grid.points().len())
        });
    });
}

fn benchmark_composite_tiling(c: &mut Criterion) {
    let n = 30;
    let recon = SampleMatrix::new(n * n, IMAGE_SIZE, vec![0.5; n * n * IMAGE_SIZE]).unwrap();

    c.bench_function("tile_composite_30x30", |b| {
        b.iter(|| {
            let image = CompositeImage::tile(n, black_box(&recon)).unwrap();
            black_box(image.side())
        });
    });
}

criterion_group!(
    benches,
    benchmark_grid_construction,
    benchmark_composite_tiling
);
criterion_main!(benches);
