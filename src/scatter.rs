//! Latent scatter plot data and its discrete colour legend.
//!
//! The legend has one colour level per distinct label actually present, so
//! a dataset holding three classes gets a three-level legend even though
//! digits have ten classes.

use crate::config::VisualizationConfig;
use crate::dataset::Dataset;
use crate::error::{Result, VizError};
use crate::model::{LatentModel, LatentPoint};
use crate::render::FigureSink;
use tracing::info;

/// Title shown above the scatter plot
pub const SCATTER_TITLE: &str = "Visualization of the Latent Space";

/// Viridis anchors at t = 0, 1/8, ..., 1.
const VIRIDIS: [(u8, u8, u8); 9] = [
    (68, 1, 84),
    (71, 44, 122),
    (59, 81, 139),
    (44, 113, 142),
    (33, 144, 141),
    (39, 173, 129),
    (92, 200, 99),
    (170, 220, 50),
    (253, 231, 37),
];

/// Sample the viridis colormap at `t` in [0, 1].
#[must_use]
pub fn viridis(t: f64) -> (u8, u8, u8) {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (VIRIDIS.len() - 1) as f64;
    let lo = scaled.floor() as usize;
    let hi = (lo + 1).min(VIRIDIS.len() - 1);
    let frac = scaled - lo as f64;
    let lerp = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * frac).round() as u8;
    let (a, b) = (VIRIDIS[lo], VIRIDIS[hi]);
    (lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

/// Discrete colour legend: one level and one tick per distinct label.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteLegend {
    ticks: Vec<u8>,
    colors: Vec<(u8, u8, u8)>,
}

impl DiscreteLegend {
    /// Build a legend from the distinct values in `labels`.
    #[must_use]
    pub fn from_labels(labels: &[u8]) -> Self {
        let mut ticks = labels.to_vec();
        ticks.sort_unstable();
        ticks.dedup();

        let levels = ticks.len();
        let colors = (0..levels)
            .map(|k| {
                if levels == 1 {
                    viridis(0.0)
                } else {
                    viridis(k as f64 / (levels - 1) as f64)
                }
            })
            .collect();
        Self { ticks, colors }
    }

    /// Number of colour levels.
    #[must_use]
    pub fn levels(&self) -> usize {
        self.ticks.len()
    }

    /// Tick values, ascending.
    #[must_use]
    pub fn ticks(&self) -> &[u8] {
        &self.ticks
    }

    /// Level colours, parallel to [`Self::ticks`].
    #[must_use]
    pub fn colors(&self) -> &[(u8, u8, u8)] {
        &self.colors
    }

    /// Colour of `label`, or `None` if the label is not in the legend.
    #[must_use]
    pub fn color_of(&self, label: u8) -> Option<(u8, u8, u8)> {
        self.ticks
            .binary_search(&label)
            .ok()
            .map(|level| self.colors[level])
    }
}

/// Latent coordinates with their labels, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct LatentScatter {
    /// One latent mean per sample, in dataset order
    pub points: Vec<LatentPoint>,
    /// Label of each point
    pub labels: Vec<u8>,
    /// Discrete colour legend
    pub legend: DiscreteLegend,
    /// Figure title
    pub title: String,
    /// Marker radius in pixels
    pub marker_radius: u32,
    /// Marker opacity
    pub marker_alpha: f64,
}

impl LatentScatter {
    /// Pair points with labels.
    ///
    /// # Errors
    ///
    /// Returns an error if the two lengths differ.
    pub fn new(
        points: Vec<LatentPoint>,
        labels: &[u8],
        config: &VisualizationConfig,
    ) -> Result<Self> {
        if points.len() != labels.len() {
            return Err(VizError::dimension_mismatch(
                format!("{} latent points", labels.len()),
                format!("{} latent points", points.len()),
            ));
        }
        Ok(Self {
            points,
            labels: labels.to_vec(),
            legend: DiscreteLegend::from_labels(labels),
            title: SCATTER_TITLE.to_string(),
            marker_radius: config.marker_radius(),
            marker_alpha: config.marker_alpha,
        })
    }

    /// Axis ranges `(x_min, x_max, y_min, y_max)` with a 5% margin.
    ///
    /// Degenerate or empty extents widen to a unit span.
    #[must_use]
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        let extent = |axis: usize| {
            let (lo, hi) = self
                .points
                .iter()
                .map(|p| p[axis])
                .filter(|v| v.is_finite())
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                });
            if lo > hi {
                (-1.0, 1.0)
            } else if (hi - lo) < f32::EPSILON {
                (lo - 0.5, hi + 0.5)
            } else {
                let pad = (hi - lo) * 0.05;
                (lo - pad, hi + pad)
            }
        };
        let (x_min, x_max) = extent(0);
        let (y_min, y_max) = extent(1);
        (x_min, x_max, y_min, y_max)
    }
}

/// Encode the unshuffled dataset and show the labelled scatter.
///
/// # Errors
///
/// Propagates model and rendering failures, and rejects a model that
/// returns a different number of points than there are samples.
pub fn plot_latent_scatter<M, S>(
    model: &M,
    dataset: &Dataset,
    sink: &mut S,
    config: &VisualizationConfig,
) -> Result<LatentScatter>
where
    M: LatentModel + ?Sized,
    S: FigureSink + ?Sized,
{
    let points = model.transform(dataset.samples())?;
    let scatter = LatentScatter::new(points, dataset.labels(), config)?;
    info!(
        points = scatter.points.len(),
        levels = scatter.legend.levels(),
        "plotting latent scatter"
    );
    sink.show_scatter(&scatter)?;
    Ok(scatter)
}
