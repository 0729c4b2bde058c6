//! Report Building
//!
//! Assembles the complete report from the outcomes of every experiment.
//!
//! ## Pipeline
//!
//! ```text
//! ExperimentOutcome[] (rows, fits, expectations)
//!              │
//!              ▼
//!   ┌─────────────────────┐
//!   │   ReportSummary     │  row statuses, trial counts, verdict tallies
//!   └──────────┬──────────┘
//!              │
//!              ▼
//!   ┌─────────────────────┐
//!   │      Report         │  Ready for JSON/CSV/human output
//!   └─────────────────────┘
//! ```

use super::execution::ExperimentOutcome;
use super::metadata::build_report_meta;
use crate::config::TrialConfig;
use trialbench_core::RowStatus;
use trialbench_report::{Report, ReportConfig, ReportSummary, Verdict};

/// Build a complete Report from experiment outcomes
///
/// # Arguments
/// * `outcomes` - Experiments in run order
/// * `config` - Loaded configuration (captured in metadata)
/// * `total_duration_ms` - Wall-clock time of the whole run
pub fn build_report(
    outcomes: Vec<ExperimentOutcome>,
    config: &TrialConfig,
    total_duration_ms: f64,
) -> Report {
    let summary = summarize(&outcomes, total_duration_ms);

    let mut rows = Vec::with_capacity(summary.configurations);
    let mut fits = Vec::new();
    let mut expectations = Vec::new();
    for outcome in outcomes {
        rows.extend(outcome.rows);
        fits.extend(outcome.fits);
        expectations.extend(outcome.expectations);
    }

    Report {
        meta: build_report_meta(report_config(config)),
        rows,
        fits,
        expectations,
        summary,
    }
}

/// Runner settings as recorded in report metadata
pub fn report_config(config: &TrialConfig) -> ReportConfig {
    let runner = &config.runner;
    ReportConfig {
        timeout_ms: config
            .timeout()
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default(),
        jobs: runner.jobs,
        min_fit_points: runner.min_fit_points,
        bootstrap_iterations: runner.bootstrap_iterations,
        confidence_level: runner.confidence_level,
        seed: runner.seed,
    }
}

/// Tally row statuses, trials and verdicts
pub fn summarize(outcomes: &[ExperimentOutcome], total_duration_ms: f64) -> ReportSummary {
    let mut summary = ReportSummary {
        experiments: outcomes.len(),
        total_duration_ms,
        ..Default::default()
    };

    for outcome in outcomes {
        for row in &outcome.rows {
            summary.configurations += 1;
            summary.trials += row.count;
            summary.skipped_lines += row.skipped;
            match row.status {
                RowStatus::Ok => summary.ok += 1,
                RowStatus::Failed(_) => summary.failed += 1,
                RowStatus::Skipped(_) => summary.skipped += 1,
            }
        }

        for fit in &outcome.fits {
            if fit.result.is_some() {
                summary.fits_defined += 1;
            } else {
                summary.fits_undefined += 1;
            }
        }

        for expectation in &outcome.expectations {
            match expectation.verdict {
                Verdict::Passed => summary.expectations_passed += 1,
                Verdict::Failed => summary.expectations_failed += 1,
                Verdict::Undefined => summary.expectations_undefined += 1,
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use trialbench_core::{Configuration, SummaryRow};
    use trialbench_report::{ExpectationResult, FitRecord};
    use trialbench_stats::FitModel;

    fn outcome() -> ExperimentOutcome {
        let cfg = |n| Configuration::new("a", n, 1);
        let ok = SummaryRow {
            count: 5,
            skipped: 1,
            ..SummaryRow::undefined(cfg(1), RowStatus::Ok)
        };
        ExperimentOutcome {
            name: "e".to_string(),
            rows: vec![
                ok.clone(),
                SummaryRow::undefined(cfg(2), RowStatus::Failed("boom".into())),
                SummaryRow::undefined(cfg(3), RowStatus::Skipped("gone".into())),
            ],
            fits: vec![FitRecord {
                experiment: "e".to_string(),
                label: "rate ~ n [power-law]".to_string(),
                x: "n".to_string(),
                y: "rate".to_string(),
                model: FitModel::PowerLaw,
                result: None,
                error: Some("insufficient".to_string()),
            }],
            expectations: vec![ExpectationResult {
                experiment: "e".to_string(),
                label: "rate ~ n [power-law]".to_string(),
                expected: -0.5,
                tolerance: 0.1,
                observed: None,
                verdict: Verdict::Undefined,
                message: String::new(),
            }],
        }
    }

    #[test]
    fn test_summary_counts() {
        let summary = summarize(&[outcome()], 12.0);

        assert_eq!(summary.experiments, 1);
        assert_eq!(summary.configurations, 3);
        assert_eq!((summary.ok, summary.failed, summary.skipped), (1, 1, 1));
        assert_eq!(summary.trials, 5);
        assert_eq!(summary.skipped_lines, 1);
        assert_eq!(summary.fits_undefined, 1);
        assert_eq!(summary.expectations_undefined, 1);
        assert!(summary.has_failures());
    }

    #[test]
    fn test_report_concatenates_experiments() {
        let config: TrialConfig = toml::from_str("").unwrap();
        let report = build_report(vec![outcome(), outcome()], &config, 1.0);

        assert_eq!(report.rows.len(), 6);
        assert_eq!(report.rows[3].configuration.n, 1);
        assert_eq!(report.fits.len(), 2);
        assert_eq!(report.meta.config.timeout_ms, 60_000);
    }
}
