//! Dense variational autoencoder over flattened images.
//!
//! ## Architecture
//!
//! ```text
//! Encoder: D -> h1 (ReLU) -> ... -> hk (ReLU) -> 2M (mean | pre-std)
//!          std = softplus(pre-std) + 1e-6
//!          z   = mean + std * eps,  eps ~ N(0, I)
//! Decoder: M -> hk (ReLU) -> ... -> h1 (ReLU) -> D (Bernoulli logits)
//! ```
//!
//! Training minimizes the negative ELBO summed over each mini-batch: Bernoulli
//! cross-entropy of the input under the decoder logits plus the closed-form
//! KL divergence between `N(mean, std^2)` and the standard normal prior.
//! Parameters are updated with RMSProp.

use crate::dataset::SampleMatrix;
use crate::error::{Result, VizError};
use crate::model::{LatentModel, LatentPoint};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use tracing::{debug, info};

/// Lower bound added to every posterior standard deviation
const STD_FLOOR: f32 = 1e-6;
/// RMSProp denominator guard
const RMS_EPSILON: f32 = 1e-8;
/// Batches between debug cost lines
const LOG_EVERY: usize = 100;

/// Hyperparameters for [`VariationalAutoencoder`].
#[derive(Debug, Clone, PartialEq)]
pub struct VaeConfig {
    /// Flattened input width
    pub input_dim: usize,
    /// Encoder widths; the last is the latent dimensionality
    pub layer_sizes: Vec<usize>,
    /// Rows per gradient step
    pub batch_size: usize,
    /// RMSProp step size
    pub learning_rate: f32,
    /// RMSProp moving-average decay
    pub decay: f32,
    /// Seed for weight init, shuffling, and reparameterization noise
    pub seed: u64,
}

impl Default for VaeConfig {
    fn default() -> Self {
        Self {
            input_dim: 784,
            layer_sizes: vec![200, 100, 2],
            batch_size: 64,
            learning_rate: 1e-3,
            decay: 0.9,
            seed: 0,
        }
    }
}

impl VaeConfig {
    /// Config for the given input width and encoder layer widths.
    #[must_use]
    pub fn new(input_dim: usize, layer_sizes: Vec<usize>) -> Self {
        Self {
            input_dim,
            layer_sizes,
            ..Default::default()
        }
    }

    /// Set the mini-batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the learning rate.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Latent dimensionality (last layer width).
    #[must_use]
    pub fn latent_dim(&self) -> usize {
        self.layer_sizes.last().copied().unwrap_or(0)
    }

    fn validate(&self) -> Result<()> {
        if self.input_dim == 0 {
            return Err(VizError::invalid_config("input dimension must be positive"));
        }
        if self.layer_sizes.is_empty() || self.layer_sizes.contains(&0) {
            return Err(VizError::invalid_config(
                "layer sizes must be non-empty and positive",
            ));
        }
        if self.batch_size == 0 {
            return Err(VizError::invalid_config("batch size must be positive"));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(VizError::invalid_config("learning rate must be positive"));
        }
        if !(0.0..1.0).contains(&self.decay) {
            return Err(VizError::invalid_config("decay must lie in [0, 1)"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activation {
    Relu,
    Identity,
}

impl Activation {
    fn apply(self, x: f32) -> f32 {
        match self {
            Self::Relu => x.max(0.0),
            Self::Identity => x,
        }
    }

    /// Derivative expressed through the activation's output.
    fn derivative_from_output(self, y: f32) -> f32 {
        match self {
            Self::Relu => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Identity => 1.0,
        }
    }
}

/// Fully connected layer; weights are row-major `output_dim x input_dim`.
#[derive(Debug, Clone)]
struct DenseLayer {
    input_dim: usize,
    output_dim: usize,
    weights: Vec<f32>,
    bias: Vec<f32>,
    activation: Activation,
}

impl DenseLayer {
    fn new<R: Rng + ?Sized>(
        input_dim: usize,
        output_dim: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let scale = 2.0 / (input_dim as f32).sqrt();
        let weights = (0..input_dim * output_dim)
            .map(|_| rng.sample::<f32, _>(StandardNormal) * scale)
            .collect();
        Self {
            input_dim,
            output_dim,
            weights,
            bias: vec![0.0; output_dim],
            activation,
        }
    }

    fn forward(&self, input: &[f32]) -> Vec<f32> {
        let batch = input.len() / self.input_dim;
        let mut output = vec![0.0; batch * self.output_dim];

        for (x, y) in input
            .chunks_exact(self.input_dim)
            .zip(output.chunks_exact_mut(self.output_dim))
        {
            for (o, y_o) in y.iter_mut().enumerate() {
                let row = &self.weights[o * self.input_dim..(o + 1) * self.input_dim];
                let sum: f32 = row.iter().zip(x).map(|(w, v)| w * v).sum();
                *y_o = self.activation.apply(sum + self.bias[o]);
            }
        }

        output
    }

    /// Accumulate parameter gradients and return the gradient w.r.t. the input.
    fn backward(
        &self,
        input: &[f32],
        output: &[f32],
        grad_output: &[f32],
        grads: &mut Gradients,
    ) -> Vec<f32> {
        let mut grad_input = vec![0.0; input.len()];

        let rows = input
            .chunks_exact(self.input_dim)
            .zip(output.chunks_exact(self.output_dim))
            .zip(grad_output.chunks_exact(self.output_dim))
            .zip(grad_input.chunks_exact_mut(self.input_dim));

        for (((x, y), g), gx) in rows {
            for o in 0..self.output_dim {
                let delta = self.activation.derivative_from_output(y[o]) * g[o];
                if delta == 0.0 {
                    continue;
                }
                grads.bias[o] += delta;
                let span = o * self.input_dim..(o + 1) * self.input_dim;
                let w_row = &self.weights[span.clone()];
                let gw_row = &mut grads.weights[span];
                for i in 0..self.input_dim {
                    gw_row[i] += delta * x[i];
                    gx[i] += delta * w_row[i];
                }
            }
        }

        grad_input
    }
}

#[derive(Debug, Clone)]
struct Gradients {
    weights: Vec<f32>,
    bias: Vec<f32>,
}

impl Gradients {
    fn zeros_like(layer: &DenseLayer) -> Self {
        Self {
            weights: vec![0.0; layer.weights.len()],
            bias: vec![0.0; layer.bias.len()],
        }
    }
}

/// Per-layer RMSProp running averages of squared gradients.
#[derive(Debug, Clone)]
struct RmsProp {
    weights_ms: Vec<f32>,
    bias_ms: Vec<f32>,
}

impl RmsProp {
    fn zeros_like(layer: &DenseLayer) -> Self {
        Self {
            weights_ms: vec![0.0; layer.weights.len()],
            bias_ms: vec![0.0; layer.bias.len()],
        }
    }

    fn step(&mut self, layer: &mut DenseLayer, grads: &Gradients, learning_rate: f32, decay: f32) {
        rms_update(
            &mut layer.weights,
            &grads.weights,
            &mut self.weights_ms,
            learning_rate,
            decay,
        );
        rms_update(&mut layer.bias, &grads.bias, &mut self.bias_ms, learning_rate, decay);
    }
}

fn rms_update(params: &mut [f32], grads: &[f32], ms: &mut [f32], learning_rate: f32, decay: f32) {
    for ((p, &g), m) in params.iter_mut().zip(grads).zip(ms.iter_mut()) {
        *m = decay * *m + (1.0 - decay) * g * g;
        *p -= learning_rate * g / (m.sqrt() + RMS_EPSILON);
    }
}

#[derive(Debug, Clone)]
struct Network {
    layers: Vec<DenseLayer>,
}

impl Network {
    /// ReLU between every pair of widths, `head` on the last layer.
    fn new<R: Rng + ?Sized>(widths: &[usize], head: Activation, rng: &mut R) -> Self {
        let last = widths.len() - 2;
        let layers = widths
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                let activation = if i == last { head } else { Activation::Relu };
                DenseLayer::new(pair[0], pair[1], activation, rng)
            })
            .collect();
        Self { layers }
    }

    fn forward(&self, input: &[f32]) -> Vec<f32> {
        let mut current = input.to_vec();
        for layer in &self.layers {
            current = layer.forward(&current);
        }
        current
    }

    /// Forward pass keeping every activation, input first.
    fn forward_cached(&self, input: Vec<f32>) -> Vec<Vec<f32>> {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(input);
        for layer in &self.layers {
            let next = layer.forward(&activations[activations.len() - 1]);
            activations.push(next);
        }
        activations
    }

    fn backward(
        &self,
        activations: &[Vec<f32>],
        grad_output: Vec<f32>,
        grads: &mut [Gradients],
    ) -> Vec<f32> {
        let mut grad = grad_output;
        for (i, layer) in self.layers.iter().enumerate().rev() {
            grad = layer.backward(&activations[i], &activations[i + 1], &grad, &mut grads[i]);
        }
        grad
    }

    fn zero_gradients(&self) -> Vec<Gradients> {
        self.layers.iter().map(Gradients::zeros_like).collect()
    }
}

fn softplus(x: f32) -> f32 {
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Gradients and cost of one mini-batch.
struct BatchGradients {
    cost: f32,
    encoder: Vec<Gradients>,
    decoder: Vec<Gradients>,
}

/// Variational autoencoder with a Gaussian latent posterior and Bernoulli pixels.
#[derive(Debug, Clone)]
pub struct VariationalAutoencoder {
    config: VaeConfig,
    encoder: Network,
    decoder: Network,
    encoder_opt: Vec<RmsProp>,
    decoder_opt: Vec<RmsProp>,
    rng: StdRng,
}

impl VariationalAutoencoder {
    /// Build a freshly initialized model.
    ///
    /// # Errors
    ///
    /// Returns an error if the config has zero-sized layers or a bad optimizer setting.
    pub fn new(config: VaeConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let latent = config.latent_dim();
        let hidden = &config.layer_sizes[..config.layer_sizes.len() - 1];

        let mut encoder_widths = Vec::with_capacity(hidden.len() + 2);
        encoder_widths.push(config.input_dim);
        encoder_widths.extend_from_slice(hidden);
        encoder_widths.push(2 * latent);

        let mut decoder_widths = Vec::with_capacity(hidden.len() + 2);
        decoder_widths.push(latent);
        decoder_widths.extend(hidden.iter().rev());
        decoder_widths.push(config.input_dim);

        let encoder = Network::new(&encoder_widths, Activation::Identity, &mut rng);
        let decoder = Network::new(&decoder_widths, Activation::Identity, &mut rng);
        let encoder_opt = encoder.layers.iter().map(RmsProp::zeros_like).collect();
        let decoder_opt = decoder.layers.iter().map(RmsProp::zeros_like).collect();

        info!(
            input_dim = config.input_dim,
            layers = ?config.layer_sizes,
            parameters = encoder_widths.windows(2).chain(decoder_widths.windows(2))
                .map(|w| w[0] * w[1] + w[1])
                .sum::<usize>(),
            "initialized variational autoencoder"
        );

        Ok(Self {
            config,
            encoder,
            decoder,
            encoder_opt,
            decoder_opt,
            rng,
        })
    }

    /// The model's hyperparameters.
    #[must_use]
    pub fn config(&self) -> &VaeConfig {
        &self.config
    }

    /// Latent dimensionality.
    #[must_use]
    pub fn latent_dim(&self) -> usize {
        self.config.latent_dim()
    }

    fn check_width(&self, samples: &SampleMatrix) -> Result<()> {
        if samples.cols() != self.config.input_dim {
            return Err(VizError::dimension_mismatch(
                format!("{} input columns", self.config.input_dim),
                format!("{} columns", samples.cols()),
            ));
        }
        Ok(())
    }

    /// Posterior means, row-major `rows x latent_dim`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sample width does not match the model input.
    pub fn encode_means(&self, samples: &SampleMatrix) -> Result<Vec<f32>> {
        self.check_width(samples)?;
        let latent = self.latent_dim();
        let head = self.encoder.forward(samples.as_slice());
        Ok(head
            .chunks_exact(2 * latent)
            .flat_map(|row| row[..latent].iter().copied())
            .collect())
    }

    /// Pixel probabilities for row-major latent vectors.
    ///
    /// # Errors
    ///
    /// Returns an error if `latent.len()` is not a multiple of the latent dimension.
    pub fn decode_probs(&self, latent: &[f32]) -> Result<Vec<f32>> {
        let dim = self.latent_dim();
        if latent.len() % dim != 0 {
            return Err(VizError::dimension_mismatch(
                format!("a multiple of {dim} latent values"),
                format!("{} values", latent.len()),
            ));
        }
        let mut logits = self.decoder.forward(latent);
        for l in &mut logits {
            *l = sigmoid(*l);
        }
        Ok(logits)
    }

    /// Run one RMSProp step on a row-major batch; returns the batch's negative ELBO.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch is empty or its length is not a multiple
    /// of the input dimension.
    pub fn train_batch(&mut self, batch: &[f32]) -> Result<f32> {
        let width = self.config.input_dim;
        if batch.is_empty() || batch.len() % width != 0 {
            return Err(VizError::dimension_mismatch(
                format!("a non-empty multiple of {width} values"),
                format!("{} values", batch.len()),
            ));
        }
        let gradients = self.batch_gradients(batch);
        let (lr, decay) = (self.config.learning_rate, self.config.decay);

        for ((layer, opt), grads) in self
            .encoder
            .layers
            .iter_mut()
            .zip(&mut self.encoder_opt)
            .zip(&gradients.encoder)
        {
            opt.step(layer, grads, lr, decay);
        }
        for ((layer, opt), grads) in self
            .decoder
            .layers
            .iter_mut()
            .zip(&mut self.decoder_opt)
            .zip(&gradients.decoder)
        {
            opt.step(layer, grads, lr, decay);
        }

        Ok(gradients.cost)
    }

    fn batch_gradients(&mut self, batch: &[f32]) -> BatchGradients {
        let latent = self.latent_dim();
        let rows = batch.len() / self.config.input_dim;

        let enc_acts = self.encoder.forward_cached(batch.to_vec());
        let head = &enc_acts[enc_acts.len() - 1];

        let mut eps = vec![0.0_f32; rows * latent];
        let mut z = vec![0.0_f32; rows * latent];
        for b in 0..rows {
            for k in 0..latent {
                let mean = head[b * 2 * latent + k];
                let std = softplus(head[b * 2 * latent + latent + k]) + STD_FLOOR;
                let e: f32 = self.rng.sample(StandardNormal);
                eps[b * latent + k] = e;
                z[b * latent + k] = mean + std * e;
            }
        }

        let dec_acts = self.decoder.forward_cached(z);
        let logits = &dec_acts[dec_acts.len() - 1];

        let mut cost = 0.0_f32;
        let mut grad_logits = vec![0.0_f32; logits.len()];
        for ((&l, &x), g) in logits.iter().zip(batch).zip(grad_logits.iter_mut()) {
            cost += l.max(0.0) - l * x + (-l.abs()).exp().ln_1p();
            *g = sigmoid(l) - x;
        }

        let mut decoder_grads = self.decoder.zero_gradients();
        let grad_z = self
            .decoder
            .backward(&dec_acts, grad_logits, &mut decoder_grads);

        let mut grad_head = vec![0.0_f32; rows * 2 * latent];
        for b in 0..rows {
            for k in 0..latent {
                let mean_idx = b * 2 * latent + k;
                let raw_idx = mean_idx + latent;
                let mean = head[mean_idx];
                let raw = head[raw_idx];
                let std = softplus(raw) + STD_FLOOR;

                cost += -std.ln() + 0.5 * (std * std + mean * mean) - 0.5;

                let gz = grad_z[b * latent + k];
                grad_head[mean_idx] = gz + mean;
                let grad_std = gz * eps[b * latent + k] - 1.0 / std + std;
                grad_head[raw_idx] = grad_std * sigmoid(raw);
            }
        }

        let mut encoder_grads = self.encoder.zero_gradients();
        self.encoder.backward(&enc_acts, grad_head, &mut encoder_grads);

        BatchGradients {
            cost,
            encoder: encoder_grads,
            decoder: decoder_grads,
        }
    }
}

impl LatentModel for VariationalAutoencoder {
    fn fit(&mut self, samples: &mut SampleMatrix, epochs: usize) -> Result<()> {
        self.check_width(samples)?;
        if samples.is_empty() {
            return Ok(());
        }

        let batch_size = self.config.batch_size;
        let n_batches = samples.rows().div_ceil(batch_size);
        let chunk = batch_size * self.config.input_dim;

        for epoch in 0..epochs {
            samples.shuffle_rows(&mut self.rng);
            let mut epoch_cost = 0.0_f64;

            for (j, batch) in samples.as_slice().chunks(chunk).enumerate() {
                let cost = self.train_batch(batch)?;
                epoch_cost += f64::from(cost);
                if j % LOG_EVERY == 0 {
                    debug!(epoch, batch = j, n_batches, cost, "mini-batch");
                }
            }

            info!(
                epoch = epoch + 1,
                epochs,
                mean_cost = epoch_cost / samples.rows() as f64,
                "epoch complete"
            );
        }

        Ok(())
    }

    fn transform(&self, samples: &SampleMatrix) -> Result<Vec<LatentPoint>> {
        require_planar(self.latent_dim())?;
        let means = self.encode_means(samples)?;
        Ok(means.chunks_exact(2).map(|m| [m[0], m[1]]).collect())
    }

    fn prior_predictive_probs_given_input(&self, latent: &[LatentPoint]) -> Result<SampleMatrix> {
        require_planar(self.latent_dim())?;
        let flat: Vec<f32> = latent.iter().flatten().copied().collect();
        let probs = self.decode_probs(&flat)?;
        SampleMatrix::new(latent.len(), self.config.input_dim, probs)
    }
}

fn require_planar(latent: usize) -> Result<()> {
    if latent == 2 {
        Ok(())
    } else {
        Err(VizError::dimension_mismatch(
            "latent dimension 2",
            format!("latent dimension {latent}"),
        ))
    }
}
