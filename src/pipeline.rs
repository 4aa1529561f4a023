//! The whole tour of the latent space, run once from top to bottom.

use crate::config::VisualizationConfig;
use crate::dataset::{load_mnist_csv, Dataset};
use crate::error::Result;
use crate::grid::render_latent_grid;
use crate::model::LatentModel;
use crate::render::FigureSink;
use crate::run::RunContext;
use crate::scatter::plot_latent_scatter;
use crate::training::train_on_copy;
use crate::viewer::view_samples;
use std::io::{BufRead, Write};
use std::time::Instant;
use tracing::info;

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    /// Samples shown before the viewer stopped
    pub samples_viewed: usize,
    /// Colour levels in the scatter legend
    pub distinct_labels: usize,
    /// Latent points decoded for the composite
    pub grid_points: usize,
}

/// Load the configured dataset, shuffle it once with the run RNG, and apply
/// the sample limit.
///
/// # Errors
///
/// Returns an error if the file is missing or malformed.
pub fn prepare_dataset(ctx: &mut RunContext, config: &VisualizationConfig) -> Result<Dataset> {
    let mut dataset = load_mnist_csv(&config.data_path, config.normalize)?;
    dataset.shuffle(ctx.rng());
    if let Some(limit) = config.sample_limit {
        dataset.truncate(limit);
    }
    info!(
        path = %config.data_path.display(),
        samples = dataset.len(),
        classes = dataset.distinct_labels().len(),
        "dataset loaded"
    );
    Ok(dataset)
}

/// View samples, train on a copy, plot the latent scatter, then decode the
/// latent grid.
///
/// # Errors
///
/// The first failing step ends the run and its error is returned unchanged.
pub fn visualize_latent_space<M, S, R, W>(
    ctx: &mut RunContext,
    config: &VisualizationConfig,
    dataset: &Dataset,
    model: &mut M,
    sink: &mut S,
    input: R,
    prompt: W,
) -> Result<PipelineReport>
where
    M: LatentModel + ?Sized,
    S: FigureSink + ?Sized,
    R: BufRead,
    W: Write,
{
    config.validate()?;
    ctx.record_metric("samples", dataset.len() as i64);

    let samples_viewed = view_samples(dataset, sink, input, prompt)?;
    ctx.record_metric("samples_viewed", samples_viewed as i64);

    let started = Instant::now();
    train_on_copy(model, dataset.samples(), config.epochs)?;
    ctx.record_duration("training", started.elapsed());
    ctx.record_metric("epochs", config.epochs as i64);

    let scatter = plot_latent_scatter(model, dataset, sink, config)?;
    ctx.record_metric("distinct_labels", scatter.legend.levels() as i64);

    let composite = render_latent_grid(model, sink, config)?;
    let grid_points = composite.blocks_per_side() * composite.blocks_per_side();
    ctx.record_metric("grid_points", grid_points as i64);

    Ok(PipelineReport {
        samples_viewed,
        distinct_labels: scatter.legend.levels(),
        grid_points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{SampleMatrix, IMAGE_SIZE};
    use crate::error::VizError;
    use crate::model::LatentPoint;
    use crate::render::MemoryFigures;
    use crate::run::MetricValue;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::{Cursor, ErrorKind};

    /// Encodes each image by its mean intensity and decodes a point to a
    /// constant image of its x coordinate.
    #[derive(Default)]
    struct MeanModel {
        fitted_epochs: Option<usize>,
        decode_calls: usize,
    }

    impl LatentModel for MeanModel {
        fn fit(&mut self, samples: &mut SampleMatrix, epochs: usize) -> Result<()> {
            samples.shuffle_rows(&mut StdRng::seed_from_u64(9));
            self.fitted_epochs = Some(epochs);
            Ok(())
        }

        fn transform(&self, samples: &SampleMatrix) -> Result<Vec<LatentPoint>> {
            Ok(samples
                .iter_rows()
                .map(|r| [r.iter().sum::<f32>() / r.len() as f32, 0.0])
                .collect())
        }

        fn prior_predictive_probs_given_input(
            &self,
            latent: &[LatentPoint],
        ) -> Result<SampleMatrix> {
            let data = latent
                .iter()
                .flat_map(|p| std::iter::repeat(p[0]).take(IMAGE_SIZE))
                .collect();
            SampleMatrix::new(latent.len(), IMAGE_SIZE, data)
        }
    }

    /// Returns one reconstruction too few.
    struct ShortModel;

    impl LatentModel for ShortModel {
        fn fit(&mut self, _: &mut SampleMatrix, _: usize) -> Result<()> {
            Ok(())
        }

        fn transform(&self, samples: &SampleMatrix) -> Result<Vec<LatentPoint>> {
            Ok(vec![[0.0, 0.0]; samples.rows()])
        }

        fn prior_predictive_probs_given_input(
            &self,
            latent: &[LatentPoint],
        ) -> Result<SampleMatrix> {
            let rows = latent.len().saturating_sub(1);
            SampleMatrix::new(rows, IMAGE_SIZE, vec![0.0; rows * IMAGE_SIZE])
        }
    }

    fn context() -> (tempfile::TempDir, RunContext) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::new("pipeline_test", dir.path()).unwrap();
        (dir, ctx)
    }

    #[test]
    fn test_full_run_with_fake_model() {
        let (_dir, mut ctx) = context();
        let config = VisualizationConfig::default().with_grid_size(4);
        let dataset = Dataset::synthetic(8, 3);
        let mut model = MeanModel::default();
        let mut sink = MemoryFigures::new();

        let report = visualize_latent_space(
            &mut ctx,
            &config,
            &dataset,
            &mut model,
            &mut sink,
            Cursor::new("\nn\n"),
            std::io::sink(),
        )
        .unwrap();

        assert_eq!(
            report,
            PipelineReport {
                samples_viewed: 2,
                distinct_labels: 10,
                grid_points: 16,
            }
        );
        assert_eq!(model.fitted_epochs, Some(15));
        assert_eq!(sink.sample_titles.len(), 2);
        assert_eq!(sink.scatters.len(), 1);
        assert_eq!(sink.composites.len(), 1);
        assert_eq!(ctx.get_metric("grid_points"), Some(&MetricValue::Int(16)));
    }

    #[test]
    fn test_scatter_points_align_with_labels() {
        let (_dir, mut ctx) = context();
        let config = VisualizationConfig::default().with_grid_size(2);
        let dataset = Dataset::synthetic(8, 2);
        let mut model = MeanModel::default();
        let mut sink = MemoryFigures::new();

        visualize_latent_space(
            &mut ctx,
            &config,
            &dataset,
            &mut model,
            &mut sink,
            Cursor::new("n\n"),
            std::io::sink(),
        )
        .unwrap();

        let scatter = &sink.scatters[0];
        assert_eq!(scatter.labels, dataset.labels());
        let expected = model.transform(dataset.samples()).unwrap();
        assert_eq!(scatter.points, expected);
    }

    #[test]
    fn test_composite_orientation() {
        let (_dir, mut ctx) = context();
        let config = VisualizationConfig::default().with_grid_size(3);
        let dataset = Dataset::synthetic(1, 1);
        let mut model = MeanModel::default();
        let mut sink = MemoryFigures::new();

        visualize_latent_space(
            &mut ctx,
            &config,
            &dataset,
            &mut model,
            &mut sink,
            Cursor::new("n\n"),
            std::io::sink(),
        )
        .unwrap();

        // Blocks hold their x coordinate: x = -1 at the bottom, x = 1 at the top.
        let composite = &sink.composites[0];
        assert_eq!(composite.get(0, 0), Some(1.0));
        assert_eq!(composite.get(83, 83), Some(-1.0));
    }

    #[test]
    fn test_subset_legend_levels() {
        let (_dir, mut ctx) = context();
        let config = VisualizationConfig::default().with_grid_size(1);
        let dataset = Dataset::synthetic(2, 2).filter_labels(&[1, 4, 7]);
        let mut sink = MemoryFigures::new();

        let report = visualize_latent_space(
            &mut ctx,
            &config,
            &dataset,
            &mut MeanModel::default(),
            &mut sink,
            Cursor::new("n\n"),
            std::io::sink(),
        )
        .unwrap();

        assert_eq!(report.distinct_labels, 3);
        assert_eq!(sink.scatters[0].legend.ticks(), &[1, 4, 7]);
    }

    #[test]
    fn test_short_reconstruction_fails_run() {
        let (_dir, mut ctx) = context();
        let config = VisualizationConfig::default().with_grid_size(2);
        let dataset = Dataset::synthetic(3, 1);
        let mut sink = MemoryFigures::new();

        let err = visualize_latent_space(
            &mut ctx,
            &config,
            &dataset,
            &mut ShortModel,
            &mut sink,
            Cursor::new("n\n"),
            std::io::sink(),
        )
        .unwrap_err();

        assert!(matches!(err, VizError::DimensionMismatch { .. }));
        assert!(sink.composites.is_empty());
    }

    #[test]
    fn test_closed_input_halts_before_training() {
        let (_dir, mut ctx) = context();
        let config = VisualizationConfig::default().with_grid_size(2);
        let dataset = Dataset::synthetic(4, 1);
        let mut model = MeanModel::default();
        let mut sink = MemoryFigures::new();

        let err = visualize_latent_space(
            &mut ctx,
            &config,
            &dataset,
            &mut model,
            &mut sink,
            Cursor::new(""),
            std::io::sink(),
        )
        .unwrap_err();

        assert!(matches!(err, VizError::Io(ref e) if e.kind() == ErrorKind::UnexpectedEof));
        assert_eq!(model.fitted_epochs, None);
        assert!(sink.scatters.is_empty());
        assert!(sink.composites.is_empty());
        assert!(ctx.get_metric("samples_viewed").is_none());
    }

    #[test]
    fn test_prepare_dataset_shuffles_and_limits() {
        let (dir, mut ctx) = context();
        let path = dir.path().join("train.csv");
        let mut csv = String::from("label,pixels\n");
        for label in 0..10u8 {
            csv.push_str(&label.to_string());
            for _ in 0..IMAGE_SIZE {
                csv.push_str(&format!(",{}", u32::from(label) * 20));
            }
            csv.push('\n');
        }
        std::fs::write(&path, csv).unwrap();

        let config = VisualizationConfig::default()
            .with_data_path(&path)
            .with_sample_limit(6);
        let dataset = prepare_dataset(&mut ctx, &config).unwrap();

        assert_eq!(dataset.len(), 6);
        for (row, &label) in dataset.samples().iter_rows().zip(dataset.labels()) {
            let expected = f32::from(label) * 20.0 / 255.0;
            assert!((row[0] - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_prepare_dataset_missing_file() {
        let (dir, mut ctx) = context();
        let config = VisualizationConfig::default().with_data_path(dir.path().join("nope.csv"));
        assert!(matches!(
            prepare_dataset(&mut ctx, &config),
            Err(VizError::DatasetNotFound { .. })
        ));
    }
}
