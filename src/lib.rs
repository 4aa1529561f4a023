//! # VAE Latent Viz
//!
//! Explore what a variational autoencoder learns about handwritten digits
//! when its latent space is squeezed down to two dimensions.
//!
//! ## Steps
//!
//! 1. **Load**: MNIST rows and labels, normalized to [0, 1]
//! 2. **View**: page through raw samples until the user says `n`
//! 3. **Train**: fit the autoencoder on a copy, keeping the original order
//! 4. **Scatter**: latent means coloured by label, with a discrete legend
//! 5. **Grid**: decode a regular lattice over [-1, 1]² into one composite image
//!
//! The model is any [`model::LatentModel`]; [`vae::VariationalAutoencoder`]
//! is the bundled implementation.

pub mod config;
pub mod dataset;
pub mod error;
pub mod grid;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod run;
pub mod scatter;
pub mod training;
pub mod vae;
pub mod viewer;

pub use error::{Result, VizError};

/// Re-exports for convenient access
pub mod prelude {
    pub use crate::config::VisualizationConfig;
    pub use crate::dataset::{load_mnist_csv, Dataset, SampleMatrix, IMAGE_SIDE, IMAGE_SIZE};
    pub use crate::error::{Result, VizError};
    pub use crate::grid::{block_origin, linspace, render_latent_grid, CompositeImage, LatentGrid};
    pub use crate::model::{LatentModel, LatentPoint};
    pub use crate::pipeline::{prepare_dataset, visualize_latent_space, PipelineReport};
    pub use crate::render::{FigureSink, MemoryFigures, PngFigures};
    pub use crate::run::{hash_name_to_seed, MetricValue, RunContext};
    pub use crate::scatter::{plot_latent_scatter, DiscreteLegend, LatentScatter};
    pub use crate::training::{build_model, train_on_copy};
    pub use crate::vae::{VaeConfig, VariationalAutoencoder};
    pub use crate::viewer::{should_stop, view_samples};
}
