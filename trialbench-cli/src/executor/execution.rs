//! Experiment Execution
//!
//! Runs every cell of an experiment matrix against one subject and reduces
//! each cell to a summary row.
//!
//! ## Failure Handling
//!
//! - A failed invocation marks only its own row `failed`; the suite continues.
//! - A missing subject program is fatal for the experiment: it is reported
//!   once and every cell not yet started is marked `skipped`.
//!
//! ## Data Flow
//!
//! ```text
//!   MatrixCell (configuration + input)
//!        │
//!        ▼
//! ┌──────────────────┐
//! │ collect          │  invoke subject, parse trials, count skipped lines
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │ aggregate        │  rate, mean, std-dev, timing percentiles
//! └────────┬─────────┘
//!          ▼
//!  CellResult (row + metric values for the bootstrap)
//! ```

use super::statistics::attach_intervals;
use super::verification::evaluate_expectations;
use crate::config::ExpectConfig;
use crate::planner::MatrixCell;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use std::sync::OnceLock;
use tracing::{error, warn};
use trialbench_core::{
    AggregateSpec, Configuration, FieldLayout, RowStatus, SubjectUnderTest, SummaryRow,
    aggregate_collection, collect,
};
use trialbench_report::{ExpectationResult, FitRecord};
use trialbench_stats::{BootstrapConfig, MIN_FIT_POINTS};

/// Configuration for suite execution
#[derive(Debug, Clone)]
pub struct SuiteConfig {
    /// Cells run concurrently (0 = all cores)
    pub jobs: usize,
    /// Column layout of the subject's output
    pub layout: FieldLayout,
    /// How trials are reduced
    pub aggregate: AggregateSpec,
    /// Bootstrap settings for row intervals; `None` disables them
    pub bootstrap: Option<BootstrapConfig>,
    /// Minimum rows for a scaling fit
    pub min_fit_points: usize,
    /// Draw a progress bar
    pub progress: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            jobs: 1,
            layout: FieldLayout::default(),
            aggregate: AggregateSpec::default(),
            bootstrap: None,
            min_fit_points: MIN_FIT_POINTS,
            progress: false,
        }
    }
}

/// Summary row of one cell plus the metric values it was computed from
#[derive(Debug, Clone)]
pub struct CellResult {
    /// Aggregated row
    pub row: SummaryRow,
    /// Metric values, kept for the bootstrap pass
    pub metric_values: Vec<f64>,
}

/// Everything produced by one experiment
#[derive(Debug, Clone)]
pub struct ExperimentOutcome {
    /// Experiment name
    pub name: String,
    /// Rows in matrix order
    pub rows: Vec<SummaryRow>,
    /// Scaling fits
    pub fits: Vec<FitRecord>,
    /// Expectation verdicts
    pub expectations: Vec<ExpectationResult>,
}

/// Runs a matrix of configurations against a subject
pub struct ExperimentSuite {
    config: SuiteConfig,
    name: Option<String>,
}

impl ExperimentSuite {
    /// Create a suite
    pub fn new(config: SuiteConfig) -> Self {
        Self { config, name: None }
    }

    /// Tag produced rows with an experiment name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Run every cell and return one row per cell, in matrix order
    pub fn run<S: SubjectUnderTest + ?Sized>(
        &self,
        matrix: &[MatrixCell],
        subject: &S,
    ) -> Vec<SummaryRow> {
        let results = self.execute(matrix, subject);
        attach_intervals(results, self.config.bootstrap.as_ref())
    }

    /// Run configurations that need no input file
    pub fn run_configurations<S: SubjectUnderTest + ?Sized>(
        &self,
        configurations: &[Configuration],
        subject: &S,
    ) -> Vec<SummaryRow> {
        let matrix: Vec<MatrixCell> = configurations
            .iter()
            .cloned()
            .map(MatrixCell::new)
            .collect();
        self.run(&matrix, subject)
    }

    /// Run the matrix, then fit and check expectations across the rows
    pub fn run_experiment<S: SubjectUnderTest + ?Sized>(
        &self,
        matrix: &[MatrixCell],
        subject: &S,
        expects: &[ExpectConfig],
    ) -> ExperimentOutcome {
        let name = self.name.clone().unwrap_or_default();
        let rows = self.run(matrix, subject);
        let (fits, expectations) =
            evaluate_expectations(&name, &rows, expects, self.config.min_fit_points);

        ExperimentOutcome {
            name,
            rows,
            fits,
            expectations,
        }
    }

    /// Collect and aggregate every cell without bootstrap intervals
    pub fn execute<S: SubjectUnderTest + ?Sized>(
        &self,
        matrix: &[MatrixCell],
        subject: &S,
    ) -> Vec<CellResult> {
        let pb = self.progress_bar(matrix.len());
        let fatal = OnceLock::new();

        let run_cell = |index: usize, cell: &MatrixCell| {
            pb.set_message(cell.configuration.to_string());
            let result = self.execute_cell(cell, subject, &fatal);
            pb.inc(1);
            (index, result)
        };

        let mut indexed_results: Vec<(usize, CellResult)> =
            if self.config.jobs == 1 || matrix.len() <= 1 {
                matrix
                    .iter()
                    .enumerate()
                    .map(|(index, cell)| run_cell(index, cell))
                    .collect()
            } else {
                match ThreadPoolBuilder::new().num_threads(self.config.jobs).build() {
                    Ok(pool) => pool.install(|| {
                        matrix
                            .par_iter()
                            .enumerate()
                            .map(|(index, cell)| run_cell(index, cell))
                            .collect()
                    }),
                    Err(e) => {
                        warn!("Failed to build worker pool ({}), running serially", e);
                        matrix
                            .iter()
                            .enumerate()
                            .map(|(index, cell)| run_cell(index, cell))
                            .collect()
                    }
                }
            };

        pb.finish_with_message("Complete");

        indexed_results.sort_by_key(|(index, _)| *index);
        indexed_results
            .into_iter()
            .map(|(_, result)| result)
            .collect()
    }

    /// Execute a single cell
    fn execute_cell<S: SubjectUnderTest + ?Sized>(
        &self,
        cell: &MatrixCell,
        subject: &S,
        fatal: &OnceLock<String>,
    ) -> CellResult {
        let configuration = &cell.configuration;

        if let Some(reason) = fatal.get() {
            return self.finish(CellResult {
                row: SummaryRow::undefined(
                    configuration.clone(),
                    RowStatus::Skipped(format!("subject unavailable: {}", reason)),
                ),
                metric_values: Vec::new(),
            });
        }

        let result = match collect(
            subject,
            configuration,
            cell.input.as_deref(),
            &self.config.layout,
        ) {
            Ok(collection) => CellResult {
                row: aggregate_collection(configuration, &collection, &self.config.aggregate),
                metric_values: self.config.aggregate.metric_values(&collection.trials),
            },
            Err(err) => {
                if err.is_fatal() && fatal.set(err.cause.to_string()).is_ok() {
                    error!(
                        "{}: {}; skipping its remaining configurations",
                        self.name.as_deref().unwrap_or("experiment"),
                        err
                    );
                } else {
                    warn!("{}", err);
                }
                CellResult {
                    row: SummaryRow::undefined(
                        configuration.clone(),
                        RowStatus::Failed(err.cause.to_string()),
                    ),
                    metric_values: Vec::new(),
                }
            }
        };

        self.finish(result)
    }

    fn finish(&self, mut result: CellResult) -> CellResult {
        result.row.experiment = self.name.clone();
        result
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.config.progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        if let Some(name) = &self.name {
            pb.println(format!("Experiment: {}", name));
        }
        pb
    }
}
