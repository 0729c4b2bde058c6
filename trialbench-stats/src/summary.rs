//! Summary Statistics
//!
//! Every derived value is an `Option`:
//! - mean, min, max and percentiles are undefined for zero samples
//! - standard deviation is undefined for fewer than two samples
//! - two or more identical samples give a defined standard deviation of `0.0`
//!
//! A single sample has unknown spread, which is a different fact from
//! "no spread". Callers see `None` for the first and `Some(0.0)` for the second.

use crate::percentiles::compute_percentiles;
use serde::{Deserialize, Serialize};

/// Summary statistics over one numeric series
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    /// Number of samples summarized
    pub count: usize,
    /// Arithmetic mean
    pub mean: Option<f64>,
    /// Sample standard deviation (divides by `n - 1`)
    pub std_dev: Option<f64>,
    /// Smallest sample
    pub min: Option<f64>,
    /// Largest sample
    pub max: Option<f64>,
    /// Median
    pub median: Option<f64>,
    /// 95th percentile
    pub p95: Option<f64>,
}

impl SummaryStatistics {
    /// Coefficient of variation in percent, undefined when the mean is zero
    /// or the spread is unknown.
    pub fn coefficient_of_variation(&self) -> Option<f64> {
        match (self.mean, self.std_dev) {
            (Some(mean), Some(std_dev)) if mean != 0.0 => Some(std_dev / mean.abs() * 100.0),
            _ => None,
        }
    }
}

/// Compute summary statistics for a series
pub fn compute_summary(samples: &[f64]) -> SummaryStatistics {
    let percentiles = compute_percentiles(samples);

    SummaryStatistics {
        count: samples.len(),
        mean: mean(samples),
        std_dev: sample_std_dev(samples),
        min: samples.iter().copied().reduce(f64::min),
        max: samples.iter().copied().reduce(f64::max),
        median: percentiles.p50,
        p95: percentiles.p95,
    }
}

/// Arithmetic mean, `None` for an empty series
pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        None
    } else {
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }
}

/// Two-pass sample standard deviation, `None` for fewer than two samples
pub fn sample_std_dev(samples: &[f64]) -> Option<f64> {
    if samples.len() < 2 {
        return None;
    }
    let mean = mean(samples)?;
    let variance =
        samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (samples.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Fraction of `hits` among `total`, `None` when `total` is zero.
///
/// `hits` larger than `total` is clamped so the result stays in `[0, 1]`.
pub fn compute_rate(hits: usize, total: usize) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(hits.min(total) as f64 / total as f64)
    }
}
