//! Scaling Fits and Expectations
//!
//! Fits a statistic against a configuration field across the rows of one
//! experiment and compares the fitted slope with a theoretical value.
//!
//! ## Data Flow
//!
//! ```text
//!  SummaryRow[] (one experiment)
//!        │
//!        ▼
//!  ┌──────────────┐
//!  │  RowFilter   │  algorithm / fixed n / fixed k (max, min)
//!  └──────┬───────┘
//!         ▼
//!  ┌──────────────┐
//!  │     fit      │  power-law, linear or exponential OLS
//!  └──────┬───────┘
//!         │
//!    ┌────┴─────────────┐
//!    ▼                  ▼
//! FitRecord      ExpectationResult
//!                (passed / failed / undefined)
//! ```

use super::statistics::fit_across_rows_with_min;
use crate::config::ExpectConfig;
use tracing::{info, warn};
use trialbench_core::SummaryRow;
use trialbench_report::{ExpectationResult, FitRecord, Verdict};
use trialbench_stats::{FitError, FitResult};

/// Fit every expectation of an experiment and judge those carrying an
/// expected slope
///
/// # Returns
/// Tuple of (fits, expectation results). Fits come one per expectation;
/// results only for expectations with `expected` set.
pub fn evaluate_expectations(
    experiment: &str,
    rows: &[SummaryRow],
    expects: &[ExpectConfig],
    min_points: usize,
) -> (Vec<FitRecord>, Vec<ExpectationResult>) {
    let mut fits = Vec::with_capacity(expects.len());
    let mut results = Vec::new();

    for expect in expects {
        let label = expect.label();
        let selected = expect.filter.apply(rows);
        let fitted =
            fit_across_rows_with_min(selected, expect.x, expect.y, expect.model, min_points);

        if let Err(e) = &fitted {
            warn!("{}: fit {} undefined: {}", experiment, label, e);
        }

        if let Some(expected) = expect.expected {
            let result = judge(experiment, &label, expected, expect.tolerance, &fitted);
            match result.verdict {
                Verdict::Failed => warn!("{}: {}", experiment, result.message),
                _ => info!("{}: {}", experiment, result.message),
            }
            results.push(result);
        }

        let (result, error) = match fitted {
            Ok(r) => (Some(r), None),
            Err(e) => (None, Some(e.to_string())),
        };
        fits.push(FitRecord {
            experiment: experiment.to_string(),
            label,
            x: expect.x.to_string(),
            y: expect.y.to_string(),
            model: expect.model,
            result,
            error,
        });
    }

    (fits, results)
}

/// Compare a fit against an expected slope
pub fn judge(
    experiment: &str,
    label: &str,
    expected: f64,
    tolerance: f64,
    fitted: &Result<FitResult, FitError>,
) -> ExpectationResult {
    let (observed, verdict, message) = match fitted {
        Ok(fit) => {
            let deviation = (fit.slope - expected).abs();
            if deviation <= tolerance {
                (
                    Some(fit.slope),
                    Verdict::Passed,
                    format!(
                        "{}: slope {:.4} within {} of {:.4}",
                        label, fit.slope, tolerance, expected
                    ),
                )
            } else {
                (
                    Some(fit.slope),
                    Verdict::Failed,
                    format!(
                        "{}: slope {:.4} deviates {:.4} from {:.4} (tolerance {})",
                        label, fit.slope, deviation, expected, tolerance
                    ),
                )
            }
        }
        Err(e) => (None, Verdict::Undefined, format!("{}: {}", label, e)),
    };

    ExpectationResult {
        experiment: experiment.to_string(),
        label: label.to_string(),
        expected,
        tolerance,
        observed,
        verdict,
        message,
    }
}
