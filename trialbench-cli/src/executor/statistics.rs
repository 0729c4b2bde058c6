//! Statistics Across Rows
//!
//! Two passes over finished cells:
//! - bootstrap confidence intervals per row (Rayon-parallel, seeded per row)
//! - scaling fits across rows, after selecting the rows a fit applies to
//!
//! Only rows with status `ok` and a defined value on both axes become fit points.

use super::execution::CellResult;
use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use trialbench_core::SummaryRow;
use trialbench_stats::{BootstrapConfig, FitError, FitModel, FitResult, MIN_FIT_POINTS, fit};

/// A column of a summary row usable as a fit axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RowField {
    /// Problem size
    N,
    /// Repetition count
    K,
    /// Total work `n · k`
    Work,
    /// Number of trials
    Count,
    /// Positive-outcome rate
    Rate,
    /// Metric mean
    Mean,
    /// Metric standard deviation
    StdDev,
    /// Mean elapsed time
    MeanTimeUs,
    /// Median elapsed time
    MedianTimeUs,
    /// 95th percentile elapsed time
    P95TimeUs,
}

impl RowField {
    /// Value of this field in `row`, if defined
    pub fn value(self, row: &SummaryRow) -> Option<f64> {
        match self {
            RowField::N => Some(row.configuration.n as f64),
            RowField::K => Some(row.configuration.k as f64),
            RowField::Work => Some(row.configuration.work() as f64),
            RowField::Count => Some(row.count as f64),
            RowField::Rate => row.rate,
            RowField::Mean => row.mean,
            RowField::StdDev => row.std_dev,
            RowField::MeanTimeUs => row.mean_time_us,
            RowField::MedianTimeUs => row.median_time_us,
            RowField::P95TimeUs => row.p95_time_us,
        }
    }

    fn name(self) -> &'static str {
        match self {
            RowField::N => "n",
            RowField::K => "k",
            RowField::Work => "work",
            RowField::Count => "count",
            RowField::Rate => "rate",
            RowField::Mean => "mean",
            RowField::StdDev => "std-dev",
            RowField::MeanTimeUs => "mean-time-us",
            RowField::MedianTimeUs => "median-time-us",
            RowField::P95TimeUs => "p95-time-us",
        }
    }
}

impl fmt::Display for RowField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RowField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "n" => Ok(RowField::N),
            "k" => Ok(RowField::K),
            "work" => Ok(RowField::Work),
            "count" => Ok(RowField::Count),
            "rate" => Ok(RowField::Rate),
            "mean" => Ok(RowField::Mean),
            "std-dev" => Ok(RowField::StdDev),
            "mean-time-us" => Ok(RowField::MeanTimeUs),
            "median-time-us" => Ok(RowField::MedianTimeUs),
            "p95-time-us" => Ok(RowField::P95TimeUs),
            other => Err(format!("Unknown row field: {}", other)),
        }
    }
}

/// Selects one value of `n` or `k`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// Exactly this value
    Value(u64),
    /// Largest value present
    Max,
    /// Smallest value present
    Min,
}

impl Selector {
    fn resolve(self, present: impl Iterator<Item = u64>) -> Option<u64> {
        match self {
            Selector::Value(v) => Some(v),
            Selector::Max => present.max(),
            Selector::Min => present.min(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Value(v) => write!(f, "{}", v),
            Selector::Max => write!(f, "max"),
            Selector::Min => write!(f, "min"),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SelectorRepr {
    Value(u64),
    Keyword(String),
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match SelectorRepr::deserialize(deserializer)? {
            SelectorRepr::Value(v) => Ok(Selector::Value(v)),
            SelectorRepr::Keyword(s) => match s.to_lowercase().as_str() {
                "max" => Ok(Selector::Max),
                "min" => Ok(Selector::Min),
                other => Err(serde::de::Error::custom(format!(
                    "expected an integer, \"max\" or \"min\", got {:?}",
                    other
                ))),
            },
        }
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Selector::Value(v) => serializer.serialize_u64(*v),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

/// Restricts which rows a fit sees
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFilter {
    /// Only rows of this algorithm
    #[serde(default)]
    pub algorithm: Option<String>,
    /// Only rows with this `n`
    #[serde(default)]
    pub n: Option<Selector>,
    /// Only rows with this `k`
    #[serde(default)]
    pub k: Option<Selector>,
}

impl RowFilter {
    /// Rows passing the filter, in their original order.
    ///
    /// `max`/`min` resolve over the `ok` rows of the selected algorithm.
    pub fn apply<'a>(&self, rows: &'a [SummaryRow]) -> Vec<&'a SummaryRow> {
        let by_algorithm: Vec<&SummaryRow> = rows
            .iter()
            .filter(|r| {
                self.algorithm
                    .as_deref()
                    .is_none_or(|a| r.configuration.algorithm == a)
            })
            .collect();

        let resolve = |selector: Option<Selector>, pick: fn(&SummaryRow) -> u64| {
            selector.map(|s| {
                s.resolve(
                    by_algorithm
                        .iter()
                        .filter(|r| r.is_ok())
                        .map(|r| pick(r)),
                )
            })
        };
        let n = resolve(self.n, |r| r.configuration.n);
        let k = resolve(self.k, |r| r.configuration.k);

        by_algorithm
            .into_iter()
            .filter(|r| n.is_none_or(|n| Some(r.configuration.n) == n))
            .filter(|r| k.is_none_or(|k| Some(r.configuration.k) == k))
            .collect()
    }

    /// Short description such as `algorithm=karger n=max`
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(algorithm) = &self.algorithm {
            parts.push(format!("algorithm={}", algorithm));
        }
        if let Some(n) = self.n {
            parts.push(format!("n={}", n));
        }
        if let Some(k) = self.k {
            parts.push(format!("k={}", k));
        }
        parts.join(" ")
    }
}

/// Fit `y_field` against `x_field` over `rows`
pub fn fit_across_rows(
    rows: &[SummaryRow],
    x_field: RowField,
    y_field: RowField,
    model: FitModel,
) -> Result<FitResult, FitError> {
    fit_across_rows_with_min(rows.iter(), x_field, y_field, model, MIN_FIT_POINTS)
}

/// Fit over selected rows, requiring at least `min_points` usable points
pub fn fit_across_rows_with_min<'a>(
    rows: impl IntoIterator<Item = &'a SummaryRow>,
    x_field: RowField,
    y_field: RowField,
    model: FitModel,
    min_points: usize,
) -> Result<FitResult, FitError> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = rows
        .into_iter()
        .filter(|r| r.is_ok())
        .filter_map(|r| Some((x_field.value(r)?, y_field.value(r)?)))
        .unzip();

    fit(&xs, &ys, model, min_points)
}

/// Turn cell results into rows, attaching bootstrap intervals (parallelized with Rayon).
///
/// Each row gets its own seed derived from the base seed and its position,
/// so intervals do not depend on scheduling.
pub fn attach_intervals(
    results: Vec<CellResult>,
    bootstrap: Option<&BootstrapConfig>,
) -> Vec<SummaryRow> {
    let Some(bootstrap) = bootstrap else {
        return results.into_iter().map(|r| r.row).collect();
    };

    results
        .into_par_iter()
        .enumerate()
        .map(|(index, result)| {
            let config = BootstrapConfig {
                seed: bootstrap.seed.wrapping_add(index as u64),
                parallel: false,
                ..bootstrap.clone()
            };
            result.row.with_interval(&result.metric_values, &config)
        })
        .collect()
}
