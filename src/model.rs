//! The latent model seen from the visualization side.
//!
//! Plots only need three things from a trained autoencoder, so that is all
//! the trait asks for. [`crate::vae::VariationalAutoencoder`] is the shipped
//! implementation; tests substitute lightweight fakes.

use crate::dataset::SampleMatrix;
use crate::error::Result;

/// A point in the 2-D latent space.
pub type LatentPoint = [f32; 2];

/// Model that maps images to a 2-D latent space and back.
pub trait LatentModel {
    /// Train for `epochs` passes over `samples`.
    ///
    /// Implementations may reorder the rows of `samples` in place; callers
    /// that need the original order must pass a copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the samples do not match the model's input width.
    fn fit(&mut self, samples: &mut SampleMatrix, epochs: usize) -> Result<()>;

    /// Encoder mean for every row of `samples`, in row order.
    ///
    /// # Errors
    ///
    /// Returns an error if the samples do not match the model's input width.
    fn transform(&self, samples: &SampleMatrix) -> Result<Vec<LatentPoint>>;

    /// Decoded pixel probabilities for each latent point, in input order.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    fn prior_predictive_probs_given_input(&self, latent: &[LatentPoint]) -> Result<SampleMatrix>;
}
