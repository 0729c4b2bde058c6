#![warn(missing_docs)]
//! # Trialbench
//!
//! Empirical validation harness for randomized algorithms.
//!
//! Trialbench runs a subject program over a matrix of configurations
//! (algorithm × problem size `n` × repetition count `k`), collects one trial
//! per output line and reduces each configuration to a summary row:
//! - **Failure isolation**: a crashing or hanging configuration becomes a
//!   `failed` row; the rest of the suite still runs
//! - **Undefined, not NaN**: statistics without enough data are absent
//! - **Success rates and timing**: rate of a positive outcome, metric mean and
//!   standard deviation, median and p95 elapsed time
//! - **Bootstrap intervals**: seeded percentile confidence intervals per row
//! - **Scaling fits**: power-law, linear and exponential least squares across
//!   rows, checked against theoretical slopes
//!
//! ## Quick Start
//!
//! ```ignore
//! use trialbench::prelude::*;
//!
//! let subject = from_fn(|cfg: &Configuration, _input: Option<&Path>| {
//!     Ok(format!("subject,result,elapsed\n0,1,{}\n", cfg.n))
//! });
//! let rows = ExperimentSuite::new(SuiteConfig::default())
//!     .run_configurations(&[Configuration::new("pie", 1000, 1)], &subject);
//! ```
//!
//! ## External Subjects
//!
//! ```ignore
//! let subject = ProcessSubject::new("bin/primality_test")
//!     .with_args(["--algo", "{algorithm}", "--k", "{k}", "--file", "{input}"])
//!     .with_timeout(Duration::from_secs(30));
//! ```

// Re-export core types
pub use trialbench_core::{
    AggregateSpec, Collection, Configuration, FieldLayout, FnSubject, InvocationError, Metric,
    RowStatus, SubjectInvocationError, SubjectUnderTest, SummaryRow, TimeUnit, Trial, aggregate,
    aggregate_collection, collect, from_fn, parse_output,
};

// Re-export stats
pub use trialbench_stats::{
    BootstrapConfig, BootstrapResult, FitError, FitModel, FitResult, compute_bootstrap,
    compute_summary, fit,
};

// Re-export report types
pub use trialbench_report::{OutputFormat, Report, Verdict, write_summary_table};

// Re-export the harness
pub use trialbench_cli::{
    ExperimentSuite, ProcessSubject, RowField, RowFilter, Selector, SuiteConfig, TrialConfig,
    fit_across_rows,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Configuration, ExperimentSuite, FieldLayout, ProcessSubject, RowField, SubjectUnderTest,
        SuiteConfig, SummaryRow, from_fn,
    };
    pub use std::path::Path;
    pub use std::time::Duration;
}

/// Run the Trialbench CLI harness.
///
/// ```ignore
/// fn main() -> anyhow::Result<()> {
///     trialbench::run()
/// }
/// ```
pub use trialbench_cli::run;
