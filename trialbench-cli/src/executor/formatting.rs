//! Output Formatting
//!
//! Human-readable output formatting for experiment reports.
//!
//! Generates terminal-friendly output with:
//! - Rows grouped by experiment with status icons (✓/✗/⊘)
//! - Success rate, metric mean and spread, timing percentiles
//! - Bootstrap confidence intervals where defined
//! - Scaling fits and expectation verdicts

use trialbench_core::{RowStatus, SummaryRow};
use trialbench_report::{Report, Verdict};

/// Format a report for human-readable terminal display
///
/// Undefined statistics render as `-`.
pub fn format_human_output(report: &Report) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("Trialbench Results\n");
    output.push_str(&"=".repeat(60));
    output.push_str("\n\n");

    // Rows arrive grouped by experiment; keep that order
    let mut groups: Vec<(&str, Vec<&SummaryRow>)> = Vec::new();
    for row in &report.rows {
        let name = row.experiment.as_deref().unwrap_or("");
        match groups.last_mut() {
            Some((current, rows)) if *current == name => rows.push(row),
            _ => groups.push((name, vec![row])),
        }
    }

    for (experiment, rows) in groups {
        output.push_str(&format!("Experiment: {}\n", experiment));
        output.push_str(&"-".repeat(60));
        output.push('\n');

        for row in rows {
            let status_icon = match row.status {
                RowStatus::Ok => "✓",
                RowStatus::Failed(_) => "✗",
                RowStatus::Skipped(_) => "⊘",
            };
            output.push_str(&format!("  {} {}\n", status_icon, row.configuration));

            match row.status.reason() {
                Some(reason) => output.push_str(&format!("      {}: {}\n", row.status, reason)),
                None => {
                    output.push_str(&format!(
                        "      trials: {}  skipped lines: {}  rate: {}\n",
                        row.count,
                        row.skipped,
                        value(row.rate)
                    ));
                    output.push_str(&format!(
                        "      mean: {}  stddev: {}",
                        value(row.mean),
                        value(row.std_dev)
                    ));
                    if let (Some(lower), Some(upper)) = (row.ci_lower, row.ci_upper) {
                        output.push_str(&format!(
                            "  CI: [{}, {}]",
                            value(Some(lower)),
                            value(Some(upper))
                        ));
                    }
                    output.push('\n');
                    output.push_str(&format!(
                        "      time: mean {} us  median {} us  p95 {} us\n",
                        value(row.mean_time_us),
                        value(row.median_time_us),
                        value(row.p95_time_us)
                    ));
                }
            }
        }
        output.push('\n');
    }

    if !report.fits.is_empty() {
        output.push_str("Scaling Fits\n");
        output.push_str(&"-".repeat(60));
        output.push('\n');

        for fit in &report.fits {
            match (&fit.result, &fit.error) {
                (Some(result), _) => output.push_str(&format!(
                    "  {} {}: slope {:.4}  intercept {:.4}  r² {}  ({} points)\n",
                    fit.experiment,
                    fit.label,
                    result.slope,
                    result.intercept,
                    value(result.r_squared),
                    result.points
                )),
                (None, error) => output.push_str(&format!(
                    "  {} {}: undefined ({})\n",
                    fit.experiment,
                    fit.label,
                    error.as_deref().unwrap_or("no result")
                )),
            }
        }
    }

    if !report.expectations.is_empty() {
        output.push_str("\nExpectations\n");
        output.push_str(&"-".repeat(60));
        output.push('\n');

        for e in &report.expectations {
            let icon = match e.verdict {
                Verdict::Passed => "✓",
                Verdict::Failed => "✗",
                Verdict::Undefined => "⊘",
            };
            output.push_str(&format!("  {} {} : {}\n", icon, e.experiment, e.message));
        }
    }

    // Summary
    let summary = &report.summary;
    output.push_str("\nSummary\n");
    output.push_str(&"-".repeat(60));
    output.push('\n');
    output.push_str(&format!(
        "  Configurations: {}  Ok: {}  Failed: {}  Skipped: {}\n",
        summary.configurations, summary.ok, summary.failed, summary.skipped
    ));
    output.push_str(&format!(
        "  Trials: {}  Skipped lines: {}\n",
        summary.trials, summary.skipped_lines
    ));
    if summary.expectations_passed + summary.expectations_failed + summary.expectations_undefined
        > 0
    {
        output.push_str(&format!(
            "  Expectations: {} passed  {} failed  {} undefined\n",
            summary.expectations_passed,
            summary.expectations_failed,
            summary.expectations_undefined
        ));
    }
    output.push_str(&format!(
        "  Duration: {:.2} ms\n",
        summary.total_duration_ms
    ));

    output
}

/// Render an optional statistic, `-` when undefined
fn value(v: Option<f64>) -> String {
    match v {
        None => "-".to_string(),
        Some(v) if v != 0.0 && (v.abs() >= 1_000_000.0 || v.abs() < 0.001) => {
            format!("{:.3e}", v)
        }
        Some(v) => format!("{:.4}", v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::metadata::build_report_meta;
    use trialbench_core::Configuration;
    use trialbench_report::{ReportConfig, ReportSummary};

    fn report(rows: Vec<SummaryRow>) -> Report {
        Report {
            meta: build_report_meta(ReportConfig {
                timeout_ms: 1000,
                jobs: 1,
                min_fit_points: 2,
                bootstrap_iterations: 0,
                confidence_level: 0.95,
                seed: 0,
            }),
            rows,
            fits: Vec::new(),
            expectations: Vec::new(),
            summary: ReportSummary::default(),
        }
    }

    #[test]
    fn test_undefined_statistics_render_as_dash() {
        let row = SummaryRow {
            count: 1,
            mean: Some(2.0),
            ..SummaryRow::undefined(Configuration::new("pie", 10, 1), RowStatus::Ok)
        }
        .in_experiment("pi");
        let text = format_human_output(&report(vec![row]));

        assert!(text.contains("Experiment: pi"));
        assert!(text.contains("✓ pie n=10 k=1"));
        assert!(text.contains("mean: 2.0000  stddev: -"));
    }

    #[test]
    fn test_failed_row_shows_reason() {
        let row = SummaryRow::undefined(
            Configuration::new("pie", 10, 1),
            RowStatus::Failed("Subject timed out after 1s".to_string()),
        );
        let text = format_human_output(&report(vec![row]));

        assert!(text.contains("✗ pie n=10 k=1"));
        assert!(text.contains("timed out"));
    }

    #[test]
    fn test_value_formatting() {
        assert_eq!(value(None), "-");
        assert_eq!(value(Some(0.0)), "0.0000");
        assert_eq!(value(Some(0.25)), "0.2500");
        assert_eq!(value(Some(0.0001)), "1.000e-4");
    }
}
