//! Bootstrap Resampling
//!
//! Percentile-bootstrap confidence interval for the mean of a metric.
//! Resampling is seeded per iteration, so a fixed seed reproduces the same
//! interval regardless of how rayon schedules the work.

use crate::{DEFAULT_BOOTSTRAP_ITERATIONS, DEFAULT_CONFIDENCE_LEVEL};
use crate::percentiles::compute_percentile;
use crate::summary::mean;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum number of samples for a bootstrap interval
pub const MIN_BOOTSTRAP_SAMPLES: usize = 3;

/// Bootstrap configuration
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Number of resamples
    pub iterations: usize,
    /// Confidence level (e.g. 0.95 for a 95% interval)
    pub confidence_level: f64,
    /// Base seed for the resampling RNG
    pub seed: u64,
    /// Whether to resample on the rayon pool
    pub parallel: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_BOOTSTRAP_ITERATIONS,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            seed: 0,
            parallel: true,
        }
    }
}

/// Confidence interval bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Lower bound
    pub lower: f64,
    /// Upper bound
    pub upper: f64,
    /// Confidence level the bounds were computed at
    pub level: f64,
}

impl ConfidenceInterval {
    /// Whether `value` lies inside the interval (inclusive)
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// Result of bootstrap analysis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BootstrapResult {
    /// Sample mean
    pub point_estimate: f64,
    /// Percentile interval of the resampled means
    pub confidence_interval: ConfidenceInterval,
    /// Standard deviation of the resampled means
    pub standard_error: f64,
}

/// Errors that can occur during bootstrap
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BootstrapError {
    #[error("Not enough samples: got {got}, need at least {min}")]
    NotEnoughSamples { got: usize, min: usize },

    #[error("Invalid confidence level: {0} (must be between 0 and 1)")]
    InvalidConfidenceLevel(f64),

    #[error("Bootstrap needs at least one iteration")]
    NoIterations,
}

/// Compute a percentile-bootstrap confidence interval for the mean
pub fn compute_bootstrap(
    samples: &[f64],
    config: &BootstrapConfig,
) -> Result<BootstrapResult, BootstrapError> {
    if samples.len() < MIN_BOOTSTRAP_SAMPLES {
        return Err(BootstrapError::NotEnoughSamples {
            got: samples.len(),
            min: MIN_BOOTSTRAP_SAMPLES,
        });
    }
    if !(config.confidence_level > 0.0 && config.confidence_level < 1.0) {
        return Err(BootstrapError::InvalidConfidenceLevel(
            config.confidence_level,
        ));
    }
    if config.iterations == 0 {
        return Err(BootstrapError::NoIterations);
    }

    let point_estimate = mean(samples).ok_or(BootstrapError::NotEnoughSamples {
        got: 0,
        min: MIN_BOOTSTRAP_SAMPLES,
    })?;

    // Identical samples: every resample has the same mean.
    if samples.iter().all(|&x| x == samples[0]) {
        return Ok(BootstrapResult {
            point_estimate,
            confidence_interval: ConfidenceInterval {
                lower: point_estimate,
                upper: point_estimate,
                level: config.confidence_level,
            },
            standard_error: 0.0,
        });
    }

    let resampled: Vec<f64> = if config.parallel {
        (0..config.iterations)
            .into_par_iter()
            .map(|i| resample_mean(samples, config.seed, i))
            .collect()
    } else {
        (0..config.iterations)
            .map(|i| resample_mean(samples, config.seed, i))
            .collect()
    };

    let alpha = (1.0 - config.confidence_level) / 2.0;
    let lower = compute_percentile(&resampled, alpha * 100.0).unwrap_or(point_estimate);
    let upper = compute_percentile(&resampled, (1.0 - alpha) * 100.0).unwrap_or(point_estimate);

    let resampled_mean = mean(&resampled).unwrap_or(point_estimate);
    let standard_error = (resampled
        .iter()
        .map(|x| (x - resampled_mean).powi(2))
        .sum::<f64>()
        / resampled.len() as f64)
        .sqrt();

    Ok(BootstrapResult {
        point_estimate,
        confidence_interval: ConfidenceInterval {
            lower,
            upper,
            level: config.confidence_level,
        },
        standard_error,
    })
}

/// Mean of one resample drawn with replacement
fn resample_mean(samples: &[f64], seed: u64, iteration: usize) -> f64 {
    let mut rng =
        StdRng::seed_from_u64(seed ^ (iteration as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    let n = samples.len();
    let sum: f64 = (0..n).map(|_| samples[rng.gen_range(0..n)]).sum();
    sum / n as f64
}
