#![warn(missing_docs)]
//! Trialbench Statistical Engine
//!
//! Numeric building blocks for experiment analysis:
//! - Summary statistics where "undefined" is an explicit `None`
//! - Percentiles for skewed timing distributions
//! - Least-squares scaling fits (power-law, linear, exponential) with r²
//! - Seeded percentile-bootstrap confidence intervals

mod bootstrap;
mod fit;
mod percentiles;
mod summary;

pub use bootstrap::{
    BootstrapConfig, BootstrapError, BootstrapResult, ConfidenceInterval, MIN_BOOTSTRAP_SAMPLES,
    compute_bootstrap,
};
pub use fit::{
    FitError, FitModel, FitResult, MIN_FIT_POINTS, fit, fit_exponential, fit_linear, fit_power_law,
};
pub use percentiles::{Percentiles, compute_percentile, compute_percentiles};
pub use summary::{
    SummaryStatistics, compute_rate, compute_summary, mean, sample_std_dev,
};

/// Default number of bootstrap iterations
pub const DEFAULT_BOOTSTRAP_ITERATIONS: usize = 2_000;

/// Default confidence level (95%)
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_BOOTSTRAP_ITERATIONS, 2_000);
        assert!((DEFAULT_CONFIDENCE_LEVEL - 0.95).abs() < f64::EPSILON);
        assert_eq!(MIN_FIT_POINTS, 2);
    }
}
