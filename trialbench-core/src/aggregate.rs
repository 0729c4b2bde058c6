//! Aggregation
//!
//! Reduces the trials of one configuration to a `SummaryRow`. Aggregation is
//! pure: the same trials and settings always give the same row.

use crate::collect::Collection;
use crate::{Configuration, Trial};
use serde::{Deserialize, Serialize};
use std::fmt;
use trialbench_stats::{
    BootstrapConfig, compute_bootstrap, compute_percentiles, compute_rate, mean, sample_std_dev,
};

/// Numeric quantity summarized by `mean` / `std_dev`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    /// Elapsed time in microseconds
    #[default]
    Elapsed,
    /// Numeric value of the result column
    Result,
    /// `|result - reference|`
    AbsError,
}

/// How trials are reduced
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateSpec {
    /// Result value counted by `rate`; no rate without one
    pub positive_outcome: Option<String>,
    /// Metric for mean and standard deviation
    pub metric: Metric,
    /// Reference value for `Metric::AbsError`
    pub reference: Option<f64>,
}

impl AggregateSpec {
    /// Metric value of each trial that has one.
    ///
    /// Non-numeric results are left out of `Result` and `AbsError`, and
    /// `AbsError` without a reference yields nothing.
    pub fn metric_values(&self, trials: &[Trial]) -> Vec<f64> {
        match self.metric {
            Metric::Elapsed => trials.iter().map(|t| t.elapsed_us).collect(),
            Metric::Result => trials.iter().filter_map(Trial::numeric_result).collect(),
            Metric::AbsError => match self.reference {
                Some(reference) => trials
                    .iter()
                    .filter_map(Trial::numeric_result)
                    .map(|v| (v - reference).abs())
                    .collect(),
                None => Vec::new(),
            },
        }
    }
}

/// Outcome of collecting one configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "reason")]
pub enum RowStatus {
    /// Collected and aggregated
    #[default]
    Ok,
    /// The subject invocation failed
    Failed(String),
    /// Not run because the subject was unusable
    Skipped(String),
}

impl RowStatus {
    /// Short label used in tables
    pub fn label(&self) -> &'static str {
        match self {
            RowStatus::Ok => "ok",
            RowStatus::Failed(_) => "failed",
            RowStatus::Skipped(_) => "skipped",
        }
    }

    /// Reason for a failed or skipped row
    pub fn reason(&self) -> Option<&str> {
        match self {
            RowStatus::Ok => None,
            RowStatus::Failed(reason) | RowStatus::Skipped(reason) => Some(reason),
        }
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Summary of one configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// Experiment the row belongs to
    pub experiment: Option<String>,
    /// Configuration summarized
    pub configuration: Configuration,
    /// Collection outcome
    pub status: RowStatus,
    /// Number of trials
    pub count: usize,
    /// Number of output lines that could not be parsed
    pub skipped: usize,
    /// Fraction of trials whose result equals the positive outcome
    pub rate: Option<f64>,
    /// Mean of the metric
    pub mean: Option<f64>,
    /// Sample standard deviation of the metric
    pub std_dev: Option<f64>,
    /// Mean elapsed time (µs)
    pub mean_time_us: Option<f64>,
    /// Median elapsed time (µs)
    pub median_time_us: Option<f64>,
    /// 95th percentile elapsed time (µs)
    pub p95_time_us: Option<f64>,
    /// Bootstrap lower bound of the metric mean
    pub ci_lower: Option<f64>,
    /// Bootstrap upper bound of the metric mean
    pub ci_upper: Option<f64>,
}

impl SummaryRow {
    /// A row where every statistic is undefined
    pub fn undefined(configuration: Configuration, status: RowStatus) -> Self {
        Self {
            experiment: None,
            configuration,
            status,
            count: 0,
            skipped: 0,
            rate: None,
            mean: None,
            std_dev: None,
            mean_time_us: None,
            median_time_us: None,
            p95_time_us: None,
            ci_lower: None,
            ci_upper: None,
        }
    }

    /// Attach the experiment name
    pub fn in_experiment(mut self, name: impl Into<String>) -> Self {
        self.experiment = Some(name.into());
        self
    }

    /// Fill `ci_lower`/`ci_upper` from a bootstrap over `values`.
    ///
    /// Left undefined when the bootstrap cannot run (fewer than three values).
    pub fn with_interval(mut self, values: &[f64], config: &BootstrapConfig) -> Self {
        if let Ok(result) = compute_bootstrap(values, config) {
            self.ci_lower = Some(result.confidence_interval.lower);
            self.ci_upper = Some(result.confidence_interval.upper);
        }
        self
    }

    /// Whether the row was collected successfully
    pub fn is_ok(&self) -> bool {
        self.status == RowStatus::Ok
    }
}

/// Reduce `trials` of one configuration to a summary row
pub fn aggregate(
    configuration: &Configuration,
    trials: &[Trial],
    spec: &AggregateSpec,
) -> SummaryRow {
    let count = trials.len();

    let rate = spec.positive_outcome.as_deref().and_then(|positive| {
        let hits = trials.iter().filter(|t| t.result == positive).count();
        compute_rate(hits, count)
    });

    let values = spec.metric_values(trials);
    let elapsed: Vec<f64> = trials.iter().map(|t| t.elapsed_us).collect();
    let timing = compute_percentiles(&elapsed);

    SummaryRow {
        count,
        rate,
        mean: mean(&values),
        std_dev: sample_std_dev(&values),
        mean_time_us: mean(&elapsed),
        median_time_us: timing.p50,
        p95_time_us: timing.p95,
        ..SummaryRow::undefined(configuration.clone(), RowStatus::Ok)
    }
}

/// Aggregate a collection, carrying its skip count into the row
pub fn aggregate_collection(
    configuration: &Configuration,
    collection: &Collection,
    spec: &AggregateSpec,
) -> SummaryRow {
    SummaryRow {
        skipped: collection.skipped,
        ..aggregate(configuration, &collection.trials, spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::{FieldLayout, parse_output};

    fn trial(result: &str, elapsed_us: f64) -> Trial {
        Trial {
            subject: "s".to_string(),
            result: result.to_string(),
            elapsed_us,
        }
    }

    fn positive(outcome: &str) -> AggregateSpec {
        AggregateSpec {
            positive_outcome: Some(outcome.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_scenario_header_and_three_trials() {
        let collection = parse_output(
            "header\n5,1,100\n7,0,120\n11,1,90\n",
            &FieldLayout::default(),
        );
        let row = aggregate_collection(
            &Configuration::new("miller", 1, 1),
            &collection,
            &positive("1"),
        );

        assert_eq!(row.count, 3);
        assert!((row.rate.unwrap() - 2.0 / 3.0).abs() < 1e-12);
        assert!((row.mean_time_us.unwrap() - 310.0 / 3.0).abs() < 1e-9);
        assert_eq!(row.median_time_us, Some(100.0));
        assert!(row.is_ok());
    }

    #[test]
    fn test_nine_of_thirty_positive() {
        let trials: Vec<Trial> = (0..30)
            .map(|i| trial(if i < 9 { "1" } else { "0" }, 10.0))
            .collect();
        let row = aggregate(
            &Configuration::new("fermat", 561, 1),
            &trials,
            &positive("1"),
        );

        assert_eq!(row.count, 30);
        assert_eq!(row.rate, Some(0.3));
    }

    #[test]
    fn test_empty_trials_are_all_undefined() {
        let row = aggregate(&Configuration::new("karger", 8, 4), &[], &positive("1"));

        assert_eq!(row.count, 0);
        assert!(row.rate.is_none());
        assert!(row.mean.is_none());
        assert!(row.std_dev.is_none());
        assert!(row.mean_time_us.is_none());
        assert!(row.p95_time_us.is_none());
        assert_eq!(row.status, RowStatus::Ok);
    }

    #[test]
    fn test_single_trial_has_undefined_std_dev() {
        let row = aggregate(
            &Configuration::new("karger", 8, 4),
            &[trial("1", 42.0)],
            &positive("1"),
        );

        assert_eq!(row.count, 1);
        assert_eq!(row.rate, Some(1.0));
        assert_eq!(row.mean, Some(42.0));
        assert!(row.std_dev.is_none());
    }

    #[test]
    fn test_no_positive_outcome_means_no_rate() {
        let trials = vec![trial("1", 1.0), trial("1", 2.0)];
        let row = aggregate(
            &Configuration::new("a", 1, 1),
            &trials,
            &AggregateSpec::default(),
        );

        assert!(row.rate.is_none());
        assert_eq!(row.mean, Some(1.5));
    }

    #[test]
    fn test_abs_error_metric() {
        let spec = AggregateSpec {
            metric: Metric::AbsError,
            reference: Some(3.0),
            ..Default::default()
        };
        let trials = vec![trial("3.5", 1.0), trial("2.5", 1.0), trial("n/a", 1.0)];
        let row = aggregate(&Configuration::new("pi", 1000, 1), &trials, &spec);

        assert_eq!(row.count, 3);
        assert_eq!(row.mean, Some(0.5));
        assert_eq!(row.std_dev, Some(0.0));
    }

    #[test]
    fn test_abs_error_without_reference_is_undefined() {
        let spec = AggregateSpec {
            metric: Metric::AbsError,
            ..Default::default()
        };
        let row = aggregate(
            &Configuration::new("pi", 10, 1),
            &[trial("3.1", 1.0)],
            &spec,
        );
        assert!(row.mean.is_none());
    }

    #[test]
    fn test_result_metric_ignores_categorical_results() {
        let spec = AggregateSpec {
            metric: Metric::Result,
            ..Default::default()
        };
        let trials = vec![trial("2", 1.0), trial("4", 1.0), trial("timeout", 1.0)];
        let row = aggregate(&Configuration::new("ks", 16, 1), &trials, &spec);

        assert_eq!(row.count, 3);
        assert_eq!(row.mean, Some(3.0));
    }

    #[test]
    fn test_interval_requires_three_values() {
        let config = BootstrapConfig {
            iterations: 200,
            seed: 1,
            ..Default::default()
        };
        let cfg = Configuration::new("a", 1, 1);

        let short =
            SummaryRow::undefined(cfg.clone(), RowStatus::Ok).with_interval(&[1.0, 2.0], &config);
        assert!(short.ci_lower.is_none());

        let row = SummaryRow::undefined(cfg, RowStatus::Ok)
            .with_interval(&[1.0, 2.0, 3.0, 4.0], &config);
        let (lower, upper) = (row.ci_lower.unwrap(), row.ci_upper.unwrap());
        assert!(lower <= 2.5 && 2.5 <= upper);
    }

    #[test]
    fn test_undefined_row_keeps_status() {
        let row = SummaryRow::undefined(
            Configuration::new("a", 1, 1),
            RowStatus::Failed("timed out".into()),
        )
        .in_experiment("pi");

        assert_eq!(row.status.label(), "failed");
        assert_eq!(row.status.reason(), Some("timed out"));
        assert_eq!(row.experiment.as_deref(), Some("pi"));
        assert!(!row.is_ok());
    }
}
