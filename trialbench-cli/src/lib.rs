#![warn(missing_docs)]
//! Trialbench CLI Library
//!
//! Loads `trialbench.toml`, runs each selected experiment against its
//! subject program and writes the summary table and report.
//!
//! # Example
//!
//! ```ignore
//! fn main() -> anyhow::Result<()> {
//!     trialbench_cli::run()
//! }
//! ```

mod config;
mod executor;
mod planner;
mod supervisor;

pub use config::*;
pub use executor::{
    CellResult, ExperimentOutcome, ExperimentSuite, RowField, RowFilter, Selector, SuiteConfig,
    attach_intervals, build_report, build_report_meta, evaluate_expectations, fit_across_rows,
    fit_across_rows_with_min, format_human_output, judge, report_config, summarize,
};
pub use planner::{
    ExecutionPlan, ExperimentPlan, MatrixCell, Placeholders, build_plan, expand_matrix,
};
pub use supervisor::*;

use anyhow::Context;
use clap::{Parser, Subcommand};
use regex::Regex;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use trialbench_core::SubjectUnderTest;
use trialbench_report::{
    OutputFormat, Report, generate_csv_report, generate_json_report, write_summary_table,
};
use trialbench_stats::BootstrapConfig;

/// Trialbench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "trialbench")]
#[command(
    author,
    version,
    about = "Trialbench - empirical validation of randomized algorithms"
)]
pub struct Cli {
    /// Optional subcommand (Run, List, Init); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Filter experiments by regex pattern
    #[arg(default_value = ".*")]
    pub filter: String,

    /// Configuration file (searched upwards from the current directory if not given)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format: human, json, csv (overrides the configuration)
    #[arg(long, global = true)]
    pub format: Option<String>,

    /// Output file (stdout if not specified)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Configurations run concurrently, 0 = all cores (overrides the configuration)
    #[arg(short, long, global = true)]
    pub jobs: Option<usize>,

    /// Per-invocation timeout, e.g. "30s" (overrides the configuration)
    #[arg(long, global = true)]
    pub timeout: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Exit successfully even when configurations or expectations fail
    #[arg(long, global = true)]
    pub no_fail: bool,
}

impl Cli {
    /// Experiment filter, from the subcommand when one was given
    pub fn pattern(&self) -> &str {
        match &self.command {
            Some(Commands::Run { filter }) | Some(Commands::List { filter }) => filter.as_str(),
            _ => self.filter.as_str(),
        }
    }
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run experiments (default)
    Run {
        /// Filter experiments by regex pattern
        #[arg(default_value = ".*")]
        filter: String,
    },
    /// List the expanded configuration matrix of each experiment
    List {
        /// Filter experiments by regex pattern
        #[arg(default_value = ".*")]
        filter: String,
    },
    /// Print a commented default configuration
    Init,
}

/// Run the Trialbench CLI with process arguments.
///
/// # Returns
/// Returns `Ok(())` on success, or an error if something goes wrong.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the Trialbench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("trialbench=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("trialbench=info")
            .init();
    }

    if let Some(Commands::Init) = cli.command {
        print!("{}", TrialConfig::default_toml());
        return Ok(());
    }

    let config = load_config(&cli)?;
    let pattern = cli.pattern();
    let filter = Regex::new(pattern)
        .with_context(|| format!("Invalid experiment filter '{}'", pattern))?;

    match cli.command {
        Some(Commands::List { .. }) => list_experiments(&config, &filter),
        _ => run_experiments(&cli, &config, &filter),
    }
}

/// Load configuration and layer CLI overrides on top: trialbench.toml → CLI flags.
fn load_config(cli: &Cli) -> anyhow::Result<TrialConfig> {
    let mut config = match &cli.config {
        Some(path) => TrialConfig::load(path)?,
        None => TrialConfig::discover()?.with_context(|| {
            format!(
                "No {} found in this or any parent directory (see `trialbench init`)",
                CONFIG_FILE
            )
        })?,
    };

    if let Some(jobs) = cli.jobs {
        config.runner.jobs = jobs;
    }
    if let Some(timeout) = &cli.timeout {
        config.runner.timeout = timeout.clone();
    }
    if let Some(format) = &cli.format {
        config.output.format = format.clone();
    }

    config.validate()?;
    Ok(config)
}

fn list_experiments(config: &TrialConfig, filter: &Regex) -> anyhow::Result<()> {
    let plan = build_plan(config, Some(filter));

    println!("Trialbench Plan:");
    for experiment in &plan.experiments {
        println!(
            "├── experiment: {} ({})",
            experiment.experiment.name, experiment.experiment.subject.program
        );
        for cell in &experiment.cells {
            match &cell.input {
                Some(input) => {
                    println!("│   ├── {} < {}", cell.configuration, input.display())
                }
                None => println!("│   ├── {}", cell.configuration),
            }
        }
    }
    println!(
        "{} configurations in {} experiments.",
        plan.cell_count(),
        plan.experiments.len()
    );

    Ok(())
}

fn run_experiments(cli: &Cli, config: &TrialConfig, filter: &Regex) -> anyhow::Result<()> {
    let format: OutputFormat = config
        .output
        .format
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    if build_plan(config, Some(filter)).is_empty() {
        println!("No experiments matched '{}'.", filter.as_str());
        return Ok(());
    }

    let report = execute(config, Some(filter), true)?;

    let table_path = write_table(config, &report)?;
    info!("Summary table written to {}", table_path.display());

    let output = match format {
        OutputFormat::Json => generate_json_report(&report)?,
        OutputFormat::Csv => generate_csv_report(&report)?,
        OutputFormat::Human => format_human_output(&report),
    };

    if let Some(ref path) = cli.output {
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        file.write_all(output.as_bytes())?;
        println!("Report written to: {}", path.display());
    } else {
        print!("{}", output);
    }

    let summary = &report.summary;
    if summary.has_failures() && !cli.no_fail {
        if summary.failed > 0 {
            eprintln!("\n{} configuration(s) failed", summary.failed);
        }
        if summary.expectations_failed > 0 {
            eprintln!(
                "\n{} scaling expectation(s) violated",
                summary.expectations_failed
            );
        }
        std::process::exit(1);
    }

    Ok(())
}

/// Run every selected experiment and build the report
///
/// Each experiment gets a [`ProcessSubject`] built from its `subject`
/// section. Failed configurations stay in the report as `failed` or
/// `skipped` rows.
pub fn execute(
    config: &TrialConfig,
    filter: Option<&Regex>,
    show_progress: bool,
) -> anyhow::Result<Report> {
    let start_time = Instant::now();
    let plan = build_plan(config, filter);
    let runner = &config.runner;

    let bootstrap = (runner.bootstrap_iterations > 0).then(|| BootstrapConfig {
        iterations: runner.bootstrap_iterations,
        confidence_level: runner.confidence_level,
        seed: runner.seed,
        parallel: false,
    });

    let mut outcomes = Vec::with_capacity(plan.experiments.len());
    for ExperimentPlan { experiment, cells } in &plan.experiments {
        let subject = ProcessSubject::from_config(&experiment.subject, config)?;
        info!(
            "Running {} ({} configurations) with {}",
            experiment.name,
            cells.len(),
            subject.describe()
        );

        let suite = ExperimentSuite::new(SuiteConfig {
            jobs: runner.jobs,
            layout: experiment.layout.clone(),
            aggregate: experiment.aggregate.clone(),
            bootstrap: bootstrap.clone(),
            min_fit_points: runner.min_fit_points,
            progress: show_progress,
        })
        .named(experiment.name.clone());

        outcomes.push(suite.run_experiment(cells, &subject, &experiment.expect));
    }

    let total_duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
    Ok(build_report(outcomes, config, total_duration_ms))
}

/// Persist the summary table to `output.directory/output.table`
pub fn write_table(config: &TrialConfig, report: &Report) -> anyhow::Result<PathBuf> {
    let dir = config.resolve_path(&config.output.directory);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let path = dir.join(&config.output.table);
    let file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_summary_table(&report.rows, file)?;
    Ok(path)
}
