//! Experiment Planner
//!
//! Builds the execution plan by selecting experiments and expanding each into
//! its configuration matrix.
//!
//! Filtering: regex pattern matching on the experiment name.
//!
//! Ordering: experiments keep declaration order. Inside an experiment the
//! matrix is algorithms × sizes × repetitions with repetitions varying fastest,
//! or the explicit `cells` list as written. Duplicate configurations keep
//! their first position.

use crate::config::{ExperimentConfig, TrialConfig};
use regex::{Captures, Regex};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use trialbench_core::Configuration;

/// One configuration of an experiment, with its resolved input path
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixCell {
    /// Configuration to run
    pub configuration: Configuration,
    /// Input file the subject reads, if any
    pub input: Option<PathBuf>,
}

impl MatrixCell {
    /// A cell without input
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            input: None,
        }
    }
}

/// A selected experiment and its cells
pub struct ExperimentPlan<'a> {
    /// Experiment definition
    pub experiment: &'a ExperimentConfig,
    /// Cells in matrix order
    pub cells: Vec<MatrixCell>,
}

/// Execution plan for a configuration file
pub struct ExecutionPlan<'a> {
    /// Selected experiments in declaration order
    pub experiments: Vec<ExperimentPlan<'a>>,
}

impl ExecutionPlan<'_> {
    /// Total number of cells across experiments
    pub fn cell_count(&self) -> usize {
        self.experiments.iter().map(|e| e.cells.len()).sum()
    }

    /// Whether nothing was selected
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }
}

/// Substitutes `{algorithm}`, `{n}`, `{k}`, `{input}` and `{output}` in templates
#[derive(Debug, Clone, Copy)]
pub struct Placeholders<'a> {
    /// Configuration being run
    pub configuration: &'a Configuration,
    /// Resolved input path
    pub input: Option<&'a Path>,
    /// Resolved output path
    pub output: Option<&'a Path>,
}

impl<'a> Placeholders<'a> {
    /// Placeholders for a configuration without paths
    pub fn new(configuration: &'a Configuration) -> Self {
        Self {
            configuration,
            input: None,
            output: None,
        }
    }

    /// Render a template. Placeholders without a value become empty strings.
    pub fn render(&self, template: &str) -> String {
        static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();
        // Safety: this regex literal is guaranteed to compile
        let re = PLACEHOLDER_RE
            .get_or_init(|| Regex::new(r"\{(algorithm|n|k|input|output)\}").unwrap());

        let path = |p: Option<&Path>| p.map(|p| p.display().to_string()).unwrap_or_default();

        // Single pass: substituted values are never scanned again.
        re.replace_all(template, |caps: &Captures| match &caps[1] {
            "algorithm" => self.configuration.algorithm.clone(),
            "n" => self.configuration.n.to_string(),
            "k" => self.configuration.k.to_string(),
            "input" => path(self.input),
            _ => path(self.output),
        })
        .into_owned()
    }
}

/// Expand an experiment into its configurations, in matrix order
pub fn expand_matrix(experiment: &ExperimentConfig) -> Vec<Configuration> {
    let configurations: Vec<Configuration> = match &experiment.cells {
        Some(cells) => cells.clone(),
        None => experiment
            .algorithms
            .iter()
            .flat_map(|algorithm| {
                experiment.sizes.iter().flat_map(move |&n| {
                    experiment
                        .repetitions
                        .iter()
                        .map(move |&k| Configuration::new(algorithm.clone(), n, k))
                })
            })
            .collect(),
    };

    let mut seen = HashSet::new();
    configurations
        .into_iter()
        .filter(|c| seen.insert(c.clone()))
        .collect()
}

/// Build execution plan from configuration
///
/// Selects experiments whose name matches `filter` and expands their matrices.
pub fn build_plan<'a>(config: &'a TrialConfig, filter: Option<&Regex>) -> ExecutionPlan<'a> {
    let experiments = config
        .experiments
        .iter()
        .filter(|e| filter.is_none_or(|re| re.is_match(&e.name)))
        .map(|experiment| {
            let cells = expand_matrix(experiment)
                .into_iter()
                .map(|configuration| {
                    let input = experiment.input.as_deref().map(|template| {
                        config.resolve_path(Placeholders::new(&configuration).render(template))
                    });
                    MatrixCell {
                        configuration,
                        input,
                    }
                })
                .collect();
            ExperimentPlan { experiment, cells }
        })
        .collect();

    ExecutionPlan { experiments }
}
