//! Walk through the latent space of a VAE trained on MNIST.
//!
//! Expects the Kaggle `train.csv` at `../large_files/train.csv`. Figures are
//! written as PNGs under `latent_space_figures/`; answer `n` at the prompt
//! to stop paging through samples.
//!
//! ```bash
//! cargo run --release --bin visualize_latent_space
//! ```

use std::io;

use tracing_subscriber::EnvFilter;
use vae_latent_viz::prelude::*;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("vae_latent_viz=info,visualize_latent_space=info")
        }))
        .init();

    let config = VisualizationConfig::default();
    config.validate()?;
    tracing::debug!(config = %config.to_json_pretty()?, "configuration");

    let mut ctx = RunContext::new("visualize_latent_space", &config.output_dir)?;
    let dataset = prepare_dataset(&mut ctx, &config)?;

    let seed = ctx.derive_seed();
    let mut model = build_model(&config, seed)?;
    let mut figures = PngFigures::new(ctx.output_dir(), config.figure_size)?;

    let stdin = io::stdin();
    let report = visualize_latent_space(
        &mut ctx,
        &config,
        &dataset,
        &mut model,
        &mut figures,
        stdin.lock(),
        io::stdout(),
    )?;

    tracing::info!(
        samples_viewed = report.samples_viewed,
        distinct_labels = report.distinct_labels,
        grid_points = report.grid_points,
        "latent space tour complete"
    );
    ctx.record_metric("figures_written", figures.written().len() as i64);
    ctx.report();
    Ok(())
}
