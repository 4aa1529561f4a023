//! Figure output.
//!
//! Each visualization step hands its finished figure to a [`FigureSink`].
//! [`PngFigures`] writes them to disk; [`MemoryFigures`] keeps them in memory
//! for headless runs and tests.

use crate::dataset::IMAGE_SIDE;
use crate::error::{Result, VizError};
use crate::grid::CompositeImage;
use crate::scatter::{DiscreteLegend, LatentScatter};
use image::{GrayImage, Luma};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::PathBuf;
use tracing::info;

/// Pixel width reserved for the colour legend
const LEGEND_WIDTH: i32 = 110;
/// Pixel size of a titled sample figure
const SAMPLE_FIGURE: (u32, u32) = (560, 620);

/// Destination for finished figures.
pub trait FigureSink {
    /// Show one flattened square grayscale image under `title`.
    ///
    /// # Errors
    ///
    /// Returns an error if the figure cannot be rendered.
    fn show_sample(&mut self, pixels: &[f32], title: &str) -> Result<()>;

    /// Show the latent scatter plot with its discrete legend.
    ///
    /// # Errors
    ///
    /// Returns an error if the figure cannot be rendered.
    fn show_scatter(&mut self, scatter: &LatentScatter) -> Result<()>;

    /// Show the reconstruction composite without axes.
    ///
    /// # Errors
    ///
    /// Returns an error if the figure cannot be rendered.
    fn show_composite(&mut self, image: &CompositeImage) -> Result<()>;
}

/// Convert an intensity in [0, 1] to an 8-bit gray level.
#[must_use]
pub fn to_gray(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Writes every figure as a PNG under one directory.
#[derive(Debug)]
pub struct PngFigures {
    dir: PathBuf,
    figure_size: (u32, u32),
    samples_shown: usize,
    written: Vec<PathBuf>,
}

impl PngFigures {
    /// Create the output directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>, figure_size: (u32, u32)) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            figure_size,
            samples_shown: 0,
            written: Vec::new(),
        })
    }

    /// Files written so far, in order.
    #[must_use]
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn finish(&mut self, path: PathBuf) {
        info!(path = %path.display(), "figure written");
        self.written.push(path);
    }
}

impl FigureSink for PngFigures {
    fn show_sample(&mut self, pixels: &[f32], title: &str) -> Result<()> {
        let side = square_side(pixels.len())?;
        let path = self.dir.join(format!("sample_{:05}.png", self.samples_shown));
        self.samples_shown += 1;

        {
            let root = BitMapBackend::new(&path, SAMPLE_FIGURE).into_drawing_area();
            root.fill(&WHITE).map_err(VizError::render)?;

            let cells = side as i32;
            let mut chart = ChartBuilder::on(&root)
                .caption(title, ("sans-serif", 28).into_font())
                .margin(20)
                .build_cartesian_2d(0..cells, 0..cells)
                .map_err(VizError::render)?;

            chart
                .draw_series(pixels.iter().enumerate().map(|(k, &v)| {
                    let col = (k % side) as i32;
                    let row = (k / side) as i32;
                    let y = cells - 1 - row;
                    let g = to_gray(v);
                    Rectangle::new([(col, y), (col + 1, y + 1)], RGBColor(g, g, g).filled())
                }))
                .map_err(VizError::render)?;

            root.present().map_err(VizError::render)?;
        }

        self.finish(path);
        Ok(())
    }

    fn show_scatter(&mut self, scatter: &LatentScatter) -> Result<()> {
        let path = self.dir.join("latent_scatter.png");

        {
            let root = BitMapBackend::new(&path, self.figure_size).into_drawing_area();
            root.fill(&WHITE).map_err(VizError::render)?;

            let (width, _) = root.dim_in_pixel();
            let (plot_area, legend_area) =
                root.split_horizontally((width as i32 - LEGEND_WIDTH).max(1));

            let (x_min, x_max, y_min, y_max) = scatter.bounds();
            let mut chart = ChartBuilder::on(&plot_area)
                .caption(&scatter.title, ("sans-serif", 30).into_font())
                .margin(20)
                .x_label_area_size(40)
                .y_label_area_size(50)
                .build_cartesian_2d(x_min..x_max, y_min..y_max)
                .map_err(VizError::render)?;

            chart
                .configure_mesh()
                .x_desc("z[0]")
                .y_desc("z[1]")
                .draw()
                .map_err(VizError::render)?;

            let radius = scatter.marker_radius;
            let alpha = scatter.marker_alpha;
            chart
                .draw_series(scatter.points.iter().zip(&scatter.labels).filter_map(
                    |(p, &label)| {
                        let (r, g, b) = scatter.legend.color_of(label)?;
                        Some(Circle::new(
                            (p[0], p[1]),
                            radius,
                            RGBColor(r, g, b).mix(alpha).filled(),
                        ))
                    },
                ))
                .map_err(VizError::render)?;

            draw_legend(&legend_area, &scatter.legend)?;
            root.present().map_err(VizError::render)?;
        }

        self.finish(path);
        Ok(())
    }

    fn show_composite(&mut self, image: &CompositeImage) -> Result<()> {
        let path = self.dir.join("latent_grid.png");
        let side = image.side() as u32;
        let pixels = image.pixels();
        let gray = GrayImage::from_fn(side, side, |x, y| {
            Luma([to_gray(pixels[(y * side + x) as usize])])
        });
        gray.save(&path)?;
        self.finish(path);
        Ok(())
    }
}

/// Stacked colour levels with one tick label each; level 0 at the bottom.
fn draw_legend<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    legend: &DiscreteLegend,
) -> Result<()> {
    let levels = legend.levels() as i32;
    if levels == 0 {
        return Ok(());
    }

    let (_, height) = area.dim_in_pixel();
    let top = 60;
    let bottom = (height as i32 - 60).max(top + levels);
    let cell = (bottom - top) / levels;
    let (left, right) = (20, 50);

    for (k, (tick, &(r, g, b))) in legend.ticks().iter().zip(legend.colors()).enumerate() {
        let k = k as i32;
        let upper = bottom - (k + 1) * cell;
        let lower = bottom - k * cell;
        area.draw(&Rectangle::new(
            [(left, upper), (right, lower)],
            RGBColor(r, g, b).filled(),
        ))
        .map_err(VizError::render)?;
        area.draw(&Text::new(
            tick.to_string(),
            (right + 8, (upper + lower) / 2 - 8),
            ("sans-serif", 16).into_font(),
        ))
        .map_err(VizError::render)?;
    }

    area.draw(&Rectangle::new(
        [(left, bottom - levels * cell), (right, bottom)],
        BLACK.stroke_width(1),
    ))
    .map_err(VizError::render)?;

    Ok(())
}

fn square_side(len: usize) -> Result<usize> {
    let side = (len as f64).sqrt().round() as usize;
    if side * side != len || side == 0 {
        return Err(VizError::dimension_mismatch(
            format!("a square image such as {}", IMAGE_SIDE * IMAGE_SIDE),
            format!("{len} pixels"),
        ));
    }
    Ok(side)
}

/// Keeps figures in memory instead of rendering them.
#[derive(Debug, Default)]
pub struct MemoryFigures {
    /// Titles of shown samples, in order
    pub sample_titles: Vec<String>,
    /// Shown scatter plots
    pub scatters: Vec<LatentScatter>,
    /// Shown composites
    pub composites: Vec<CompositeImage>,
}

impl MemoryFigures {
    /// Empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl FigureSink for MemoryFigures {
    fn show_sample(&mut self, pixels: &[f32], title: &str) -> Result<()> {
        square_side(pixels.len())?;
        self.sample_titles.push(title.to_string());
        Ok(())
    }

    fn show_scatter(&mut self, scatter: &LatentScatter) -> Result<()> {
        self.scatters.push(scatter.clone());
        Ok(())
    }

    fn show_composite(&mut self, image: &CompositeImage) -> Result<()> {
        self.composites.push(image.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VisualizationConfig;
    use crate::dataset::{SampleMatrix, IMAGE_SIZE};

    #[test]
    fn test_to_gray_clamps() {
        assert_eq!(to_gray(0.0), 0);
        assert_eq!(to_gray(1.0), 255);
        assert_eq!(to_gray(2.0), 255);
        assert_eq!(to_gray(-1.0), 0);
        assert_eq!(to_gray(0.5), 128);
    }

    #[test]
    fn test_square_side() {
        assert_eq!(square_side(784).unwrap(), 28);
        assert!(square_side(783).is_err());
        assert!(square_side(0).is_err());
    }

    #[test]
    fn test_memory_sink_records() {
        let mut sink = MemoryFigures::new();
        sink.show_sample(&[0.0; IMAGE_SIZE], "Image of '3'").unwrap();
        assert!(sink.show_sample(&[0.0; 10], "bad").is_err());
        assert_eq!(sink.sample_titles, vec!["Image of '3'"]);
    }

    #[test]
    fn test_png_composite_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = PngFigures::new(dir.path().join("figs"), (400, 300)).unwrap();
        let recon = SampleMatrix::new(4, IMAGE_SIZE, vec![0.25; 4 * IMAGE_SIZE]).unwrap();
        let composite = CompositeImage::tile(2, &recon).unwrap();

        sink.show_composite(&composite).unwrap();

        let path = &sink.written()[0];
        assert!(path.ends_with("latent_grid.png"));
        let loaded = image::open(path).unwrap().to_luma8();
        assert_eq!(loaded.dimensions(), (56, 56));
        assert_eq!(loaded.get_pixel(10, 40)[0], to_gray(0.25));
    }

    #[test]
    #[ignore = "needs a system font for captions"]
    fn test_png_titled_figures_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = PngFigures::new(dir.path(), (640, 480)).unwrap();
        sink.show_sample(&[0.5; IMAGE_SIZE], "Image of '1'").unwrap();
        let config = VisualizationConfig::default();
        let scatter =
            LatentScatter::new(vec![[0.0, 0.0], [1.0, 1.0]], &[0, 1], &config).unwrap();
        sink.show_scatter(&scatter).unwrap();
        assert_eq!(sink.written().len(), 2);
        assert!(sink.written().iter().all(|p| p.exists()));
    }
}
