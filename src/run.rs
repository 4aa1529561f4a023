//! Run context: one place for the output directory, seeded randomness,
//! timing, and the metrics reported at the end of a run.
//!
//! The RNG is seeded from a BLAKE3 hash of the run name, so two runs with
//! the same name shuffle data and initialize the model identically.

use crate::error::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;

/// Context shared by every step of a visualization run.
#[derive(Debug)]
pub struct RunContext {
    /// Run name for identification and seed generation
    name: String,
    /// Directory receiving figures
    output_dir: PathBuf,
    /// Deterministic RNG seeded by run name hash
    rng: StdRng,
    /// Start time for duration tracking
    start_time: Instant,
    /// Collected metrics for reporting
    metrics: BTreeMap<String, MetricValue>,
}

/// A metric value that can be recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// Count (e.g., samples viewed)
    Int(i64),
    /// Step duration
    Duration(Duration),
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Duration(d) => write!(f, "{:.2}ms", d.as_secs_f64() * 1000.0),
        }
    }
}

impl RunContext {
    /// Create a context, making sure the output directory exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the output directory cannot be created.
    pub fn new(name: &str, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;

        Ok(Self {
            name: name.to_string(),
            output_dir,
            rng: StdRng::seed_from_u64(hash_name_to_seed(name)),
            start_time: Instant::now(),
            metrics: BTreeMap::new(),
        })
    }

    /// Get the output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Get mutable access to the deterministic RNG.
    #[must_use]
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Draw a fresh seed for a component that owns its own RNG.
    pub fn derive_seed(&mut self) -> u64 {
        self.rng.gen()
    }

    /// Get elapsed time since context creation.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Record an integer metric.
    pub fn record_metric(&mut self, name: &str, value: i64) {
        self.metrics
            .insert(name.to_string(), MetricValue::Int(value));
    }

    /// Record a duration metric.
    pub fn record_duration(&mut self, name: &str, duration: Duration) {
        self.metrics
            .insert(name.to_string(), MetricValue::Duration(duration));
    }

    /// Get a recorded metric.
    #[must_use]
    pub fn get_metric(&self, name: &str) -> Option<&MetricValue> {
        self.metrics.get(name)
    }

    /// Log the run duration and every recorded metric.
    pub fn report(&self) {
        info!(
            run = %self.name,
            duration_ms = self.elapsed().as_secs_f64() * 1000.0,
            output_dir = %self.output_dir.display(),
            "run finished"
        );
        for (name, value) in &self.metrics {
            info!(metric = %name, value = %value);
        }
    }
}

/// Hash a run name to a deterministic u64 seed.
///
/// Uses BLAKE3 for consistent cross-platform hashing.
#[must_use]
pub fn hash_name_to_seed(name: &str) -> u64 {
    let hash = blake3::hash(name.as_bytes());
    let bytes = hash.as_bytes();
    u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}
