//! Training driver.
//!
//! `fit` is allowed to shuffle what it is given, while the plots afterwards
//! index labels by the original row order. Training therefore always runs on
//! a deep copy.

use crate::config::VisualizationConfig;
use crate::dataset::SampleMatrix;
use crate::error::Result;
use crate::model::LatentModel;
use crate::vae::{VaeConfig, VariationalAutoencoder};
use tracing::info;

/// Build the autoencoder described by `config`, seeded for reproducibility.
///
/// # Errors
///
/// Returns an error if the config fails validation.
pub fn build_model(config: &VisualizationConfig, seed: u64) -> Result<VariationalAutoencoder> {
    config.validate()?;
    let vae_config = VaeConfig::new(config.input_dim, config.layer_sizes.clone()).with_seed(seed);
    VariationalAutoencoder::new(vae_config)
}

/// Train `model` on an independent copy of `samples`, leaving `samples` untouched.
///
/// # Errors
///
/// Propagates any error from the model's `fit`.
pub fn train_on_copy<M: LatentModel + ?Sized>(
    model: &mut M,
    samples: &SampleMatrix,
    epochs: usize,
) -> Result<()> {
    let mut working = samples.clone();
    info!(rows = working.rows(), epochs, "training on a copy of the samples");
    model.fit(&mut working, epochs)
}
