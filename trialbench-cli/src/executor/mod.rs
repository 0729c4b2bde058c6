//! Experiment Executor
//!
//! Runs experiment matrices against subjects and turns the collected trials
//! into a report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ExperimentPlan (cells from trialbench.toml)
//!       │
//!       ▼
//! ┌─────────────┐
//! │  execution  │  Invoke subject per cell, collect + aggregate (worker pool)
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ statistics  │  Bootstrap intervals per row (parallel), row fields, fits
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │verification │  Scaling fits, expectation verdicts
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   report    │  Build Report with summary counts
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ formatting  │  Human-readable output
//! └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`execution`] - Suite execution with failure isolation
//! - [`statistics`] - Row fields, row filters, fits across rows, intervals
//! - [`verification`] - Expectation processing
//! - [`report`] - Report building
//! - [`formatting`] - Human-readable output formatting
//! - [`metadata`] - System metadata collection

mod execution;
mod formatting;
mod metadata;
mod report;
mod statistics;
mod verification;

// Re-export public API
pub use execution::{CellResult, ExperimentOutcome, ExperimentSuite, SuiteConfig};
pub use formatting::format_human_output;
pub use metadata::build_report_meta;
pub use report::{build_report, report_config, summarize};
pub use statistics::{
    RowField, RowFilter, Selector, attach_intervals, fit_across_rows, fit_across_rows_with_min,
};
pub use verification::{evaluate_expectations, judge};
