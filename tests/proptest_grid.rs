//! Property-based tests for the latent grid and composite tiling.
//!
//! These tests verify placement invariants for any grid size.

use proptest::prelude::*;
use vae_latent_viz::dataset::{SampleMatrix, IMAGE_SIDE, IMAGE_SIZE};
use vae_latent_viz::grid::{block_origin, linspace, CompositeImage, LatentGrid};

/// Strategy for generating grid sizes small enough to tile quickly
fn grid_size() -> impl Strategy<Value = usize> {
    1..12usize
}

/// Strategy for generating increasing latent ranges
fn latent_range() -> impl Strategy<Value = (f32, f32)> {
    (-5.0f32..0.0, 0.1f32..5.0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: linspace yields n values, hits both ends, and is increasing
    #[test]
    fn linspace_endpoints_and_order(n in 2..200usize, (lo, hi) in latent_range()) {
        let values = linspace(lo, hi, n);
        prop_assert_eq!(values.len(), n);
        prop_assert_eq!(values[0], lo);
        prop_assert_eq!(values[n - 1], hi);
        prop_assert!(values.windows(2).all(|w| w[1] > w[0]));
    }

    /// Property: the grid has n^2 points in x-major, y-minor order
    #[test]
    fn grid_is_x_major(n in grid_size(), range in latent_range()) {
        let grid = LatentGrid::new(n, range);
        prop_assert_eq!(grid.points().len(), n * n);
        for i in 0..n {
            for j in 0..n {
                let p = grid.points()[i * n + j];
                prop_assert_eq!(p[0], grid.x_values()[i]);
                prop_assert_eq!(p[1], grid.y_values()[j]);
            }
        }
    }

    /// Property: block (i, j) occupies rows [(n-1-i)*28, (n-i)*28) and cols [j*28, (j+1)*28)
    #[test]
    fn block_origin_ranges(n in 1..40usize, i in 0..40usize, j in 0..40usize) {
        prop_assume!(i < n && j < n);
        let (row, col) = block_origin(i, j, n);
        prop_assert_eq!(row, (n - 1 - i) * IMAGE_SIDE);
        prop_assert_eq!(row + IMAGE_SIDE, (n - i) * IMAGE_SIDE);
        prop_assert_eq!(col, j * IMAGE_SIDE);
    }

    /// Property: every block of the composite holds exactly its reconstruction
    #[test]
    fn tile_places_each_reconstruction_once(n in grid_size()) {
        let data: Vec<f32> = (0..n * n)
            .flat_map(|k| std::iter::repeat(k as f32).take(IMAGE_SIZE))
            .collect();
        let recon = SampleMatrix::new(n * n, IMAGE_SIZE, data).unwrap();
        let image = CompositeImage::tile(n, &recon).unwrap();

        prop_assert_eq!(image.side(), n * IMAGE_SIDE);
        prop_assert_eq!(image.pixels().len(), n * n * IMAGE_SIZE);
        for i in 0..n {
            for j in 0..n {
                let (row, col) = block_origin(i, j, n);
                let expected = (i * n + j) as f32;
                prop_assert_eq!(image.get(row, col), Some(expected));
                prop_assert_eq!(
                    image.get(row + IMAGE_SIDE - 1, col + IMAGE_SIDE - 1),
                    Some(expected)
                );
            }
        }
    }

    /// Property: tiling rejects any reconstruction count other than n^2
    #[test]
    fn tile_rejects_wrong_count(n in grid_size(), delta in 1..5usize) {
        let rows = n * n + delta;
        let recon = SampleMatrix::new(rows, IMAGE_SIZE, vec![0.0; rows * IMAGE_SIZE]).unwrap();
        prop_assert!(CompositeImage::tile(n, &recon).is_err());
    }
}

#[test]
fn default_grid_first_block_position() {
    // n = 30, i = 0, j = 0 -> rows [812, 840), cols [0, 28)
    assert_eq!(block_origin(0, 0, 30), (812, 0));
    let grid = LatentGrid::new(30, (-1.0, 1.0));
    assert_eq!(grid.points().len(), 900);
    assert_eq!(grid.points()[0], [-1.0, -1.0]);
    assert_eq!(grid.points()[899], [1.0, 1.0]);
}
