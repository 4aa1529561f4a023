//! Run configuration.
//!
//! The binary reads no flags or files; it runs on [`VisualizationConfig::default`].
//! The struct is still serde-backed so a run's settings can be logged and
//! reproduced exactly.

use crate::dataset::IMAGE_SIZE;
use crate::error::{Result, VizError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Every constant that shapes one visualization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationConfig {
    /// Kaggle-style MNIST CSV (`label,pixel0..pixel783`)
    pub data_path: PathBuf,
    /// Scale pixel intensities into [0, 1]
    pub normalize: bool,
    /// Keep only the first N rows after the load-time shuffle
    pub sample_limit: Option<usize>,
    /// Directory receiving the rendered figures
    pub output_dir: PathBuf,
    /// Flattened image width fed to the model
    pub input_dim: usize,
    /// Encoder layer widths; the last entry is the latent dimensionality
    pub layer_sizes: Vec<usize>,
    /// Training epochs
    pub epochs: usize,
    /// Reconstructions per side of the latent grid
    pub grid_size: usize,
    /// Inclusive latent range covered on both grid axes
    pub grid_range: (f32, f32),
    /// Scatter marker area in square pixels
    pub marker_area: f64,
    /// Scatter marker opacity
    pub marker_alpha: f64,
    /// Pixel size of titled figures
    pub figure_size: (u32, u32),
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("../large_files/train.csv"),
            normalize: true,
            sample_limit: None,
            output_dir: PathBuf::from("latent_space_figures"),
            input_dim: IMAGE_SIZE,
            layer_sizes: vec![200, 100, 2],
            epochs: 15,
            grid_size: 30,
            grid_range: (-1.0, 1.0),
            marker_area: 15.0,
            marker_alpha: 0.5,
            figure_size: (800, 640),
        }
    }
}

impl VisualizationConfig {
    /// Parse a config from JSON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the result fails validation.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the config as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that the settings can drive a full run.
    ///
    /// # Errors
    ///
    /// Returns [`VizError::InvalidConfig`] describing the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.input_dim != IMAGE_SIZE {
            return Err(VizError::invalid_config(format!(
                "input dimension must be {IMAGE_SIZE}, got {}",
                self.input_dim
            )));
        }
        match self.layer_sizes.last() {
            Some(2) => {}
            Some(&latent) => {
                return Err(VizError::invalid_config(format!(
                    "latent dimension must be 2 for plotting, got {latent}"
                )))
            }
            None => return Err(VizError::invalid_config("layer sizes must not be empty")),
        }
        if self.layer_sizes.contains(&0) {
            return Err(VizError::invalid_config("layer sizes must be positive"));
        }
        if self.grid_size == 0 {
            return Err(VizError::invalid_config("grid size must be positive"));
        }
        let (low, high) = self.grid_range;
        if !(low.is_finite() && high.is_finite()) || low >= high {
            return Err(VizError::invalid_config(format!(
                "grid range must be finite and increasing, got ({low}, {high})"
            )));
        }
        if !(0.0..=1.0).contains(&self.marker_alpha) {
            return Err(VizError::invalid_config(format!(
                "marker alpha must lie in [0, 1], got {}",
                self.marker_alpha
            )));
        }
        if self.marker_area <= 0.0 {
            return Err(VizError::invalid_config("marker area must be positive"));
        }
        Ok(())
    }

    /// Set the dataset path.
    #[must_use]
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    /// Set the figure output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Limit the number of samples kept after loading.
    #[must_use]
    pub fn with_sample_limit(mut self, limit: usize) -> Self {
        self.sample_limit = Some(limit);
        self
    }

    /// Set the encoder layer widths.
    #[must_use]
    pub fn with_layer_sizes(mut self, sizes: Vec<usize>) -> Self {
        self.layer_sizes = sizes;
        self
    }

    /// Set the number of training epochs.
    #[must_use]
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Set the number of reconstructions per grid side.
    #[must_use]
    pub fn with_grid_size(mut self, size: usize) -> Self {
        self.grid_size = size;
        self
    }

    /// Marker radius in pixels for the configured marker area.
    #[must_use]
    pub fn marker_radius(&self) -> u32 {
        (self.marker_area / std::f64::consts::PI)
            .sqrt()
            .round()
            .max(1.0) as u32
    }
}
