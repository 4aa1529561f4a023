//! Regular latent grid and the composite image of its reconstructions.
//!
//! Grid point `(i, j)` pairs the `i`-th x value with the `j`-th y value and
//! sits at index `i * n + j` of the point list. Its reconstruction lands in
//! row block `n - 1 - i` and column block `j`, so larger x values appear
//! higher up in the composite.

use crate::config::VisualizationConfig;
use crate::dataset::{SampleMatrix, IMAGE_SIDE, IMAGE_SIZE};
use crate::error::{Result, VizError};
use crate::model::{LatentModel, LatentPoint};
use crate::render::FigureSink;
use tracing::info;

/// `n` evenly spaced values from `start` to `end`, both ends included.
#[must_use]
pub fn linspace(start: f32, end: f32, n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f32;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f32 })
                .collect()
        }
    }
}

/// Square lattice of latent points, x-major then y.
#[derive(Debug, Clone, PartialEq)]
pub struct LatentGrid {
    size: usize,
    x_values: Vec<f32>,
    y_values: Vec<f32>,
    points: Vec<LatentPoint>,
}

impl LatentGrid {
    /// Build an `n x n` grid spanning `range` on both axes.
    #[must_use]
    pub fn new(size: usize, range: (f32, f32)) -> Self {
        let x_values = linspace(range.0, range.1, size);
        let y_values = linspace(range.0, range.1, size);
        let mut points = Vec::with_capacity(size * size);
        for &x in &x_values {
            for &y in &y_values {
                points.push([x, y]);
            }
        }
        Self {
            size,
            x_values,
            y_values,
            points,
        }
    }

    /// Points per side.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Values along the first latent axis.
    #[must_use]
    pub fn x_values(&self) -> &[f32] {
        &self.x_values
    }

    /// Values along the second latent axis.
    #[must_use]
    pub fn y_values(&self) -> &[f32] {
        &self.y_values
    }

    /// All grid points in x-major order.
    #[must_use]
    pub fn points(&self) -> &[LatentPoint] {
        &self.points
    }
}

/// Top-left pixel `(row, col)` of the block for grid index `(i, j)`.
#[must_use]
pub fn block_origin(i: usize, j: usize, blocks_per_side: usize) -> (usize, usize) {
    ((blocks_per_side - 1 - i) * IMAGE_SIDE, j * IMAGE_SIDE)
}

/// Square grayscale image tiled from 28x28 reconstructions.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeImage {
    blocks_per_side: usize,
    pixels: Vec<f32>,
}

impl CompositeImage {
    /// All-zero composite with `blocks_per_side` blocks on each side.
    #[must_use]
    pub fn new(blocks_per_side: usize) -> Self {
        let side = blocks_per_side * IMAGE_SIDE;
        Self {
            blocks_per_side,
            pixels: vec![0.0; side * side],
        }
    }

    /// Tile reconstructions listed in grid order (`i * n + j`).
    ///
    /// # Errors
    ///
    /// Returns an error unless there are exactly `n^2` rows of 784 values.
    pub fn tile(blocks_per_side: usize, reconstructions: &SampleMatrix) -> Result<Self> {
        let expected = blocks_per_side * blocks_per_side;
        if reconstructions.rows() != expected {
            return Err(VizError::dimension_mismatch(
                format!("{expected} reconstructions"),
                format!("{} reconstructions", reconstructions.rows()),
            ));
        }
        if reconstructions.cols() != IMAGE_SIZE {
            return Err(VizError::dimension_mismatch(
                format!("{IMAGE_SIZE} pixels per reconstruction"),
                format!("{} pixels", reconstructions.cols()),
            ));
        }

        let mut image = Self::new(blocks_per_side);
        for i in 0..blocks_per_side {
            for j in 0..blocks_per_side {
                image.place(i, j, reconstructions.row(i * blocks_per_side + j));
            }
        }
        Ok(image)
    }

    /// Copy a 28x28 block into grid cell `(i, j)`.
    fn place(&mut self, i: usize, j: usize, block: &[f32]) {
        let side = self.side();
        let (top, left) = block_origin(i, j, self.blocks_per_side);
        for (r, src) in block.chunks_exact(IMAGE_SIDE).enumerate() {
            let start = (top + r) * side + left;
            self.pixels[start..start + IMAGE_SIDE].copy_from_slice(src);
        }
    }

    /// Blocks per side.
    #[must_use]
    pub fn blocks_per_side(&self) -> usize {
        self.blocks_per_side
    }

    /// Pixels per side.
    #[must_use]
    pub fn side(&self) -> usize {
        self.blocks_per_side * IMAGE_SIDE
    }

    /// Row-major pixel values.
    #[must_use]
    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    /// Pixel at `(row, col)`.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        let side = self.side();
        (row < side && col < side).then(|| self.pixels[row * side + col])
    }
}

/// Decode the configured latent grid in one call and show the tiled result.
///
/// # Errors
///
/// Propagates model and rendering failures, and rejects a model that
/// returns the wrong number or size of reconstructions.
pub fn render_latent_grid<M, S>(
    model: &M,
    sink: &mut S,
    config: &VisualizationConfig,
) -> Result<CompositeImage>
where
    M: LatentModel + ?Sized,
    S: FigureSink + ?Sized,
{
    let grid = LatentGrid::new(config.grid_size, config.grid_range);
    info!(
        points = grid.points().len(),
        range = ?config.grid_range,
        "decoding latent grid"
    );
    let reconstructions = model.prior_predictive_probs_given_input(grid.points())?;
    let composite = CompositeImage::tile(grid.size(), &reconstructions)?;
    sink.show_composite(&composite)?;
    Ok(composite)
}
