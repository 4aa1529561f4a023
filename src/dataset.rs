//! Handwritten-digit samples and their labels.
//!
//! A [`Dataset`] pairs an N×784 [`SampleMatrix`] with N labels. Rows and labels
//! only ever move together, so index `i` of one always describes index `i` of
//! the other.

use crate::error::{Result, VizError};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Image side length for MNIST digits
pub const IMAGE_SIDE: usize = 28;
/// Flattened image length
pub const IMAGE_SIZE: usize = IMAGE_SIDE * IMAGE_SIDE;

/// Row-major matrix of flattened images.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl SampleMatrix {
    /// Wrap row-major data.
    ///
    /// # Errors
    ///
    /// Returns an error if `data.len() != rows * cols`.
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(VizError::dimension_mismatch(
                format!("{rows}x{cols} = {} values", rows * cols),
                format!("{} values", data.len()),
            ));
        }
        Ok(Self { rows, cols, data })
    }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Whether the matrix has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Borrow row `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= rows`.
    #[must_use]
    pub fn row(&self, index: usize) -> &[f32] {
        &self.data[index * self.cols..(index + 1) * self.cols]
    }

    /// Iterate rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact panics on a zero chunk size
        self.data.chunks_exact(self.cols.max(1)).take(self.rows)
    }

    /// Raw row-major values.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Copy the rows at `indices` into a new matrix.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Self {
            rows: indices.len(),
            cols: self.cols,
            data,
        }
    }

    /// Reorder rows in place with a uniformly random permutation.
    pub fn shuffle_rows<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.rows).collect();
        order.shuffle(rng);
        *self = self.select_rows(&order);
    }
}

/// Samples with their aligned digit labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    samples: SampleMatrix,
    labels: Vec<u8>,
}

impl Dataset {
    /// Pair samples with labels.
    ///
    /// # Errors
    ///
    /// Returns an error if the label count differs from the row count.
    pub fn new(samples: SampleMatrix, labels: Vec<u8>) -> Result<Self> {
        if labels.len() != samples.rows() {
            return Err(VizError::dimension_mismatch(
                format!("{} labels", samples.rows()),
                format!("{} labels", labels.len()),
            ));
        }
        Ok(Self { samples, labels })
    }

    /// The sample matrix.
    #[must_use]
    pub fn samples(&self) -> &SampleMatrix {
        &self.samples
    }

    /// The label vector.
    #[must_use]
    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the dataset is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Distinct label values in ascending order.
    #[must_use]
    pub fn distinct_labels(&self) -> Vec<u8> {
        self.labels
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Shuffle rows and labels with the same permutation.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);
        self.samples = self.samples.select_rows(&order);
        self.labels = order.iter().map(|&i| self.labels[i]).collect();
    }

    /// Keep only the first `limit` samples.
    pub fn truncate(&mut self, limit: usize) {
        if limit >= self.len() {
            return;
        }
        let keep: Vec<usize> = (0..limit).collect();
        self.samples = self.samples.select_rows(&keep);
        self.labels.truncate(limit);
    }

    /// Keep only samples whose label is in `classes`.
    #[must_use]
    pub fn filter_labels(&self, classes: &[u8]) -> Self {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&i| classes.contains(&self.labels[i]))
            .collect();
        Self {
            samples: self.samples.select_rows(&keep),
            labels: keep.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// Generate `per_class` deterministic stroke digits for every class 0-9.
    ///
    /// Samples are ordered class by class; the same seed always yields the
    /// same pixels.
    #[must_use]
    pub fn synthetic(seed: u64, per_class: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let total = per_class * 10;
        let mut data = Vec::with_capacity(total * IMAGE_SIZE);
        let mut labels = Vec::with_capacity(total);

        for digit in 0..10u8 {
            for _ in 0..per_class {
                data.extend(synthetic_digit(digit, &mut rng));
                labels.push(digit);
            }
        }

        Self {
            samples: SampleMatrix {
                rows: total,
                cols: IMAGE_SIZE,
                data,
            },
            labels,
        }
    }
}

/// Load a Kaggle-style MNIST CSV: one `label,pixel0,...,pixel783` row per line.
///
/// A non-numeric first line is treated as a header. With `normalize`, pixel
/// values are scaled from 0-255 into [0, 1].
///
/// # Errors
///
/// Returns [`VizError::DatasetNotFound`] if the file is missing, or
/// [`VizError::InvalidDataset`] naming the first malformed line.
pub fn load_mnist_csv(path: impl AsRef<Path>, normalize: bool) -> Result<Dataset> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(VizError::DatasetNotFound {
            path: path.to_path_buf(),
        });
    }
    let reader = BufReader::new(File::open(path)?);
    read_mnist_csv(reader, normalize)
}

/// Parse MNIST CSV rows from any buffered reader.
///
/// # Errors
///
/// Returns [`VizError::InvalidDataset`] naming the first malformed line.
pub fn read_mnist_csv<R: BufRead>(reader: R, normalize: bool) -> Result<Dataset> {
    let scale = if normalize { 1.0 / 255.0 } else { 1.0 };
    let mut data = Vec::new();
    let mut labels = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut fields = trimmed.split(',').map(str::trim);
        let first = fields.next().unwrap_or_default();
        let label = match first.parse::<u8>() {
            Ok(label) => label,
            Err(_) if index == 0 => continue,
            Err(_) => {
                return Err(VizError::invalid_dataset(
                    line_no,
                    format!("label {first:?} is not a digit"),
                ))
            }
        };
        if label > 9 {
            return Err(VizError::invalid_dataset(
                line_no,
                format!("label {label} outside 0-9"),
            ));
        }

        let start = data.len();
        for field in fields {
            let value: f32 = field.parse().map_err(|_| {
                VizError::invalid_dataset(line_no, format!("pixel {field:?} is not a number"))
            })?;
            data.push(value * scale);
        }
        let width = data.len() - start;
        if width != IMAGE_SIZE {
            return Err(VizError::invalid_dataset(
                line_no,
                format!("expected {IMAGE_SIZE} pixels, got {width}"),
            ));
        }
        labels.push(label);
    }

    let samples = SampleMatrix::new(labels.len(), IMAGE_SIZE, data)?;
    Dataset::new(samples, labels)
}

// 5x6 glyphs, one row of five cells per line
const GLYPHS: [[u8; 30]; 10] = [
    [0, 1, 1, 1, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 1, 1, 1, 0],
    [0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 1, 1, 1, 0],
    [0, 1, 1, 1, 0, 1, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 1, 1, 1, 1, 0],
    [1, 1, 1, 0, 0, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 1, 1, 1, 0, 0],
    [1, 0, 0, 1, 0, 1, 0, 0, 1, 0, 1, 1, 1, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0],
    [1, 1, 1, 1, 0, 1, 0, 0, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 1, 1, 1, 0, 0],
    [0, 1, 1, 0, 0, 1, 0, 0, 0, 0, 1, 1, 1, 0, 0, 1, 0, 0, 1, 0, 1, 0, 0, 1, 0, 0, 1, 1, 0, 0],
    [1, 1, 1, 1, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0],
    [0, 1, 1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 1, 0, 0, 1, 0, 0, 1, 0, 1, 0, 0, 1, 0, 0, 1, 1, 0, 0],
    [0, 1, 1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 1, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0],
];
const GLYPH_W: usize = 5;
const GLYPH_H: usize = 6;
const GLYPH_SCALE: usize = 3;

/// Render one glyph scaled into a 28x28 frame with a random shift and ink level.
fn synthetic_digit<R: Rng + ?Sized>(digit: u8, rng: &mut R) -> Vec<f32> {
    let glyph = &GLYPHS[usize::from(digit)];
    let mut pixels = vec![0.0_f32; IMAGE_SIZE];

    let base_x = (IMAGE_SIDE - GLYPH_W * GLYPH_SCALE) / 2;
    let base_y = (IMAGE_SIDE - GLYPH_H * GLYPH_SCALE) / 2;
    let offset_x = (base_x as i64 + rng.gen_range(-2..=2)) as usize;
    let offset_y = (base_y as i64 + rng.gen_range(-2..=2)) as usize;
    let ink: f32 = rng.gen_range(0.7..1.0);

    for gy in 0..GLYPH_H {
        for gx in 0..GLYPH_W {
            if glyph[gy * GLYPH_W + gx] == 0 {
                continue;
            }
            for dy in 0..GLYPH_SCALE {
                for dx in 0..GLYPH_SCALE {
                    let x = offset_x + gx * GLYPH_SCALE + dx;
                    let y = offset_y + gy * GLYPH_SCALE + dy;
                    pixels[y * IMAGE_SIDE + x] = (ink + rng.gen_range(0.0..0.1)).min(1.0);
                }
            }
        }
    }

    pixels
}
