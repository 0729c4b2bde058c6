#![warn(missing_docs)]
//! Trialbench Core - Trial Data Model
//!
//! This crate provides everything between a subject-under-test and a summary row:
//! - `Configuration` and `Trial`, the immutable units of an experiment
//! - `SubjectUnderTest`, the seam over external processes and in-process closures
//! - Sample collection: invoke a subject, parse its per-trial CSV output
//! - Aggregation: reduce trials to rate, mean, spread and timing percentiles

mod aggregate;
mod collect;
mod subject;

pub use aggregate::{AggregateSpec, Metric, RowStatus, SummaryRow, aggregate, aggregate_collection};
pub use collect::{Collection, FieldLayout, SubjectInvocationError, TimeUnit, collect, parse_output};
pub use subject::{FnSubject, InvocationError, SubjectUnderTest, from_fn};

use serde::{Deserialize, Serialize};
use std::fmt;

/// One point in the parameter space: algorithm × problem size × repetitions.
///
/// Identity is the full tuple, and the derived ordering sorts by algorithm,
/// then `n`, then `k`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Configuration {
    /// Algorithm identifier passed to the subject
    pub algorithm: String,
    /// Problem-size parameter
    pub n: u64,
    /// Repetition / round count
    pub k: u64,
}

impl Configuration {
    /// Create a configuration
    pub fn new(algorithm: impl Into<String>, n: u64, k: u64) -> Self {
        Self {
            algorithm: algorithm.into(),
            n,
            k,
        }
    }

    /// Total work `n · k`, saturating
    pub fn work(&self) -> u64 {
        self.n.saturating_mul(self.k)
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} n={} k={}", self.algorithm, self.n, self.k)
    }
}

/// One observed outcome for a single subject instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    /// Subject value the trial ran on (a number, a graph id, ...)
    pub subject: String,
    /// Result value as printed by the subject
    pub result: String,
    /// Elapsed time in microseconds
    pub elapsed_us: f64,
}

impl Trial {
    /// Result parsed as a finite number, if it is one
    pub fn numeric_result(&self) -> Option<f64> {
        self.result
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_identity_and_order() {
        let a = Configuration::new("karger", 10, 5);
        let b = Configuration::new("karger", 10, 5);
        let c = Configuration::new("karger", 10, 50);
        let d = Configuration::new("ks", 1, 1);

        assert_eq!(a, b);
        assert!(a < c);
        assert!(c < d);
        assert_eq!(c.work(), 500);
        assert_eq!(a.to_string(), "karger n=10 k=5");
    }

    #[test]
    fn test_numeric_result() {
        let trial = Trial {
            subject: "7".to_string(),
            result: " 2.5 ".to_string(),
            elapsed_us: 1.0,
        };
        assert_eq!(trial.numeric_result(), Some(2.5));

        let categorical = Trial {
            result: "prime".to_string(),
            ..trial.clone()
        };
        assert_eq!(categorical.numeric_result(), None);

        let nan = Trial {
            result: "NaN".to_string(),
            ..trial
        };
        assert_eq!(nan.numeric_result(), None);
    }

    #[test]
    fn test_work_saturates() {
        assert_eq!(Configuration::new("x", u64::MAX, 2).work(), u64::MAX);
    }
}
