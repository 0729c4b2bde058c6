//! Configuration loading from trialbench.toml
//!
//! Experiments are declared in a `trialbench.toml` file in the project root.
//! The configuration is automatically discovered by walking up from the current directory.
//! Relative paths inside the file (subject program, input and output templates,
//! output directory) resolve against the directory containing it.

use crate::executor::{RowField, RowFilter};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use trialbench_core::{AggregateSpec, Configuration, FieldLayout, Metric};
use trialbench_stats::FitModel;

/// Name of the configuration file
pub const CONFIG_FILE: &str = "trialbench.toml";

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid duration {0:?}: {1}")]
    Duration(String, String),

    #[error("Experiment '{experiment}': {message}")]
    Experiment { experiment: String, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Trialbench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrialConfig {
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
    /// Experiments, in declaration order
    #[serde(default, rename = "experiment")]
    pub experiments: Vec<ExperimentConfig>,
    /// Directory relative paths resolve against
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// Runner configuration for experiment execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Timeout for a single subject invocation (e.g., "60s", "5m")
    #[serde(default = "default_timeout")]
    pub timeout: String,
    /// Time between SIGTERM and SIGKILL on timeout
    #[serde(default = "default_grace_period")]
    pub grace_period: String,
    /// Configurations run concurrently (0 = all cores)
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    /// Minimum number of rows a scaling fit needs
    #[serde(default = "default_min_fit_points")]
    pub min_fit_points: usize,
    /// Number of bootstrap iterations (0 disables intervals)
    #[serde(default = "default_bootstrap_iterations")]
    pub bootstrap_iterations: usize,
    /// Confidence level (e.g., 0.95 for 95%)
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
    /// Bootstrap RNG seed
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            grace_period: default_grace_period(),
            jobs: default_jobs(),
            min_fit_points: default_min_fit_points(),
            bootstrap_iterations: default_bootstrap_iterations(),
            confidence_level: default_confidence_level(),
            seed: default_seed(),
        }
    }
}

fn default_timeout() -> String {
    "60s".to_string()
}
fn default_grace_period() -> String {
    "500ms".to_string()
}
fn default_jobs() -> usize {
    1
}
fn default_min_fit_points() -> usize {
    trialbench_stats::MIN_FIT_POINTS
}
fn default_bootstrap_iterations() -> usize {
    trialbench_stats::DEFAULT_BOOTSTRAP_ITERATIONS
}
fn default_confidence_level() -> f64 {
    trialbench_stats::DEFAULT_CONFIDENCE_LEVEL
}
fn default_seed() -> u64 {
    42
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format: "human", "json", "csv"
    #[serde(default = "default_format")]
    pub format: String,
    /// Output directory for the persisted summary table
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// File name of the summary table inside `directory`
    #[serde(default = "default_table")]
    pub table: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            directory: default_output_dir(),
            table: default_table(),
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}
fn default_output_dir() -> String {
    "target/trialbench".to_string()
}
fn default_table() -> String {
    "summary.csv".to_string()
}

/// One experiment: a matrix of configurations run against one subject
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Unique experiment name
    pub name: String,
    /// Algorithm identifiers
    #[serde(default)]
    pub algorithms: Vec<String>,
    /// Problem sizes `n`
    #[serde(default)]
    pub sizes: Vec<u64>,
    /// Repetition counts `k`
    #[serde(default)]
    pub repetitions: Vec<u64>,
    /// Explicit cells, replacing the cartesian product when present
    #[serde(default)]
    pub cells: Option<Vec<Configuration>>,
    /// Input file template, e.g. `data/primes_{n}.txt`
    #[serde(default)]
    pub input: Option<String>,
    /// Subject invocation
    pub subject: SubjectConfig,
    /// Output column layout
    #[serde(default)]
    pub layout: FieldLayout,
    /// Aggregation settings
    #[serde(default)]
    pub aggregate: AggregateSpec,
    /// Scaling fits and expectations
    #[serde(default)]
    pub expect: Vec<ExpectConfig>,
}

/// How to run the subject-under-test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectConfig {
    /// Program path or name on `PATH`
    pub program: String,
    /// Argument templates
    #[serde(default)]
    pub args: Vec<String>,
    /// Read trials from this file template instead of stdout
    #[serde(default)]
    pub output: Option<String>,
}

/// A scaling fit across the rows of an experiment, optionally checked
/// against a theoretical slope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectConfig {
    /// Independent variable
    pub x: RowField,
    /// Dependent statistic
    pub y: RowField,
    /// Model to fit
    #[serde(default = "default_model")]
    pub model: FitModel,
    /// Theoretical slope; without it the fit is only reported
    #[serde(default)]
    pub expected: Option<f64>,
    /// Accepted absolute deviation from `expected`
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Rows the fit applies to
    #[serde(flatten)]
    pub filter: RowFilter,
}

fn default_model() -> FitModel {
    FitModel::PowerLaw
}
fn default_tolerance() -> f64 {
    0.1
}

impl ExpectConfig {
    /// Label such as `rate ~ k [exponential] algorithm=miller`
    pub fn label(&self) -> String {
        let filter = self.filter.describe();
        if filter.is_empty() {
            format!("{} ~ {} [{}]", self.y, self.x, self.model)
        } else {
            format!("{} ~ {} [{}] {}", self.y, self.x, self.model, filter)
        }
    }
}

impl TrialConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let absolute = std::path::absolute(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        config.base_dir = absolute.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Find `trialbench.toml` by walking up from the current directory
    pub fn discover_path() -> Option<PathBuf> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Discover and load configuration, if a file exists
    pub fn discover() -> Result<Option<Self>, ConfigError> {
        Self::discover_path().map(Self::load).transpose()
    }

    /// Resolve a configured path against the configuration's directory
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Per-invocation timeout
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        Self::parse_duration(&self.runner.timeout)
    }

    /// Grace period between SIGTERM and SIGKILL
    pub fn grace_period(&self) -> Result<Duration, ConfigError> {
        Self::parse_duration(&self.runner.grace_period)
    }

    /// Check the configuration for mistakes that would only surface mid-run
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timeout()?;
        self.grace_period()?;

        let level = self.runner.confidence_level;
        if !(level > 0.0 && level < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "confidence_level must be between 0 and 1, got {}",
                level
            )));
        }

        let mut names = HashSet::new();
        for experiment in &self.experiments {
            let fail = |message: &str| ConfigError::Experiment {
                experiment: experiment.name.clone(),
                message: message.to_string(),
            };

            if experiment.name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "experiment name must not be empty".into(),
                ));
            }
            if !names.insert(experiment.name.as_str()) {
                return Err(fail("duplicate experiment name"));
            }
            if experiment.subject.program.trim().is_empty() {
                return Err(fail("subject.program must not be empty"));
            }
            match &experiment.cells {
                Some(cells) if cells.is_empty() => return Err(fail("cells must not be empty")),
                Some(_) => {}
                None => {
                    if experiment.algorithms.is_empty()
                        || experiment.sizes.is_empty()
                        || experiment.repetitions.is_empty()
                    {
                        return Err(fail(
                            "needs either cells or non-empty algorithms, sizes and repetitions",
                        ));
                    }
                }
            }
            if experiment.aggregate.metric == Metric::AbsError
                && experiment.aggregate.reference.is_none()
            {
                return Err(fail("metric \"abs-error\" requires aggregate.reference"));
            }
            for expect in &experiment.expect {
                if !(expect.tolerance.is_finite() && expect.tolerance >= 0.0) {
                    return Err(fail("expect.tolerance must be a non-negative number"));
                }
            }
        }

        Ok(())
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# Trialbench Configuration

[runner]
# Timeout for a single subject invocation
timeout = "60s"
# Time between SIGTERM and SIGKILL when a subject times out
grace_period = "500ms"
# Configurations run concurrently (0 = all cores)
jobs = 1
# Minimum rows for a scaling fit
min_fit_points = 2
# Bootstrap iterations for confidence intervals (0 disables)
bootstrap_iterations = 2000
# Confidence level (0.0 to 1.0)
confidence_level = 0.95
# Bootstrap RNG seed
seed = 42

[output]
# Default output format: human, json, csv
format = "human"
# Directory for the persisted summary table
directory = "target/trialbench"
# Summary table file name
table = "summary.csv"

# Probabilistic primality: failure rate against rounds k
[[experiment]]
name = "miller-convergence"
algorithms = ["miller"]
sizes = [2048]
repetitions = [1, 2, 3, 4, 5]
input = "data/carmichael.txt"

[experiment.subject]
program = "bin/primality_test"
args = ["--algo", "{algorithm}", "--file", "{input}", "--k", "{k}"]
# Read trials from a file instead of stdout (uncomment to enable)
# output = "out/{algorithm}_{n}_{k}.csv"

[experiment.layout]
# First line is a header
header = true
# Columns of subject, result and elapsed time
subject = 0
result = 1
elapsed = 2
# Reject lines with extra fields
strict = false
# Unit of the elapsed column: ns, us, ms, s
time_unit = "us"

[experiment.aggregate]
# Result value counted by the rate
positive_outcome = "1"
# Metric for mean and std-dev: elapsed, result, abs-error
metric = "elapsed"
# Reference value for abs-error (uncomment to enable)
# reference = 3.14159265358979

# Error bound 4^-k: slope -log10(4) in semi-log space
[[experiment.expect]]
x = "k"
y = "rate"
model = "exponential"
expected = -0.60206
tolerance = 0.25
"#
        .to_string()
    }

    /// Parse duration string (e.g., "3s", "500ms", "2m")
    pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
        let invalid = |reason: &str| ConfigError::Duration(s.to_string(), reason.to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty duration"));
        }

        let (num_part, unit_part) = trimmed
            .char_indices()
            .find(|(_, c)| c.is_alphabetic() || *c == 'µ')
            .map(|(i, _)| trimmed.split_at(i))
            .unwrap_or((trimmed, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| invalid("not a number"))?;
        if !value.is_finite() || value < 0.0 {
            return Err(invalid("must be a non-negative number"));
        }

        let multiplier: u64 = match unit_part.to_lowercase().as_str() {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" | "" => 1_000_000_000,
            "m" | "min" => 60_000_000_000,
            _ => return Err(invalid("unknown unit")),
        };

        Ok(Duration::from_nanos(
            (value * multiplier as f64).round() as u64,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Selector;
    use trialbench_core::TimeUnit;

    fn experiment_toml(extra: &str) -> String {
        format!(
            r#"
            [[experiment]]
            name = "pi"
            algorithms = ["monte-carlo"]
            sizes = [100, 1000]
            repetitions = [1]

            [experiment.subject]
            program = "bin/pi"
            {}
            "#,
            extra
        )
    }

    #[test]
    fn test_default_config() {
        let config = TrialConfig::default();
        assert_eq!(config.runner.timeout, "60s");
        assert_eq!(config.runner.jobs, 1);
        assert_eq!(config.runner.min_fit_points, 2);
        assert_eq!(config.output.table, "summary.csv");
        assert!(config.experiments.is_empty());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(
            TrialConfig::parse_duration("3s").unwrap(),
            Duration::from_secs(3)
        );
        assert_eq!(
            TrialConfig::parse_duration("500ms").unwrap(),
            Duration::from_millis(500)
        );
        assert_eq!(
            TrialConfig::parse_duration("100us").unwrap(),
            Duration::from_micros(100)
        );
        assert_eq!(
            TrialConfig::parse_duration("2m").unwrap(),
            Duration::from_secs(120)
        );
        assert_eq!(
            TrialConfig::parse_duration("1.5s").unwrap(),
            Duration::from_millis(1500)
        );
        assert_eq!(
            TrialConfig::parse_duration("10").unwrap(),
            Duration::from_secs(10)
        );
        assert!(TrialConfig::parse_duration("").is_err());
        assert!(TrialConfig::parse_duration("fast").is_err());
        assert!(TrialConfig::parse_duration("3h").is_err());
        assert!(TrialConfig::parse_duration("-1s").is_err());
    }

    #[test]
    fn test_parse_toml_with_defaults() {
        let config: TrialConfig = toml::from_str(&experiment_toml("")).unwrap();
        let experiment = &config.experiments[0];

        assert_eq!(experiment.sizes, vec![100, 1000]);
        assert!(experiment.layout.header);
        assert_eq!(experiment.layout.time_unit, TimeUnit::Us);
        assert_eq!(experiment.aggregate.metric, Metric::Elapsed);
        assert!(experiment.aggregate.positive_outcome.is_none());
        assert_eq!(config.output.format, "human");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_expectation_with_filters() {
        let extra = r#"
            [[experiment.expect]]
            x = "work"
            y = "mean-time-us"
            model = "linear"
            algorithm = "monte-carlo"
            k = "max"
            "#;
        let config: TrialConfig = toml::from_str(&experiment_toml(extra)).unwrap();
        let expect = &config.experiments[0].expect[0];

        assert_eq!(expect.x, RowField::Work);
        assert_eq!(expect.y, RowField::MeanTimeUs);
        assert_eq!(expect.model, FitModel::Linear);
        assert_eq!(expect.expected, None);
        assert_eq!(expect.filter.k, Some(Selector::Max));
        assert_eq!(
            expect.label(),
            "mean-time-us ~ work [linear] algorithm=monte-carlo k=max"
        );
    }

    #[test]
    fn test_explicit_cells() {
        let toml_str = r#"
            [[experiment]]
            name = "mincut"
            cells = [
                { algorithm = "karger", n = 8, k = 10 },
                { algorithm = "ks", n = 8, k = 1 },
            ]

            [experiment.subject]
            program = "bin/mincut"
        "#;
        let config: TrialConfig = toml::from_str(toml_str).unwrap();
        let cells = config.experiments[0].cells.as_ref().unwrap();

        assert_eq!(cells[1], Configuration::new("ks", 8, 1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_abs_error_without_reference() {
        let extra = r#"
            [experiment.aggregate]
            metric = "abs-error"
            "#;
        let config: TrialConfig = toml::from_str(&experiment_toml(extra)).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Experiment { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_matrix() {
        let toml_str = r#"
            [[experiment]]
            name = "empty"
            algorithms = ["a"]

            [experiment.subject]
            program = "bin/a"
        "#;
        let config: TrialConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let mut config: TrialConfig = toml::from_str(&experiment_toml("")).unwrap();
        let duplicate = config.experiments[0].clone();
        config.experiments.push(duplicate);

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_validate_rejects_bad_timeout() {
        let mut config = TrialConfig::default();
        config.runner.timeout = "soon".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Duration(..))));
    }

    #[test]
    fn test_resolve_path() {
        let config = TrialConfig {
            base_dir: Some(PathBuf::from("/work/project")),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_path("bin/pi"),
            PathBuf::from("/work/project/bin/pi")
        );
        assert_eq!(
            config.resolve_path("/usr/bin/env"),
            PathBuf::from("/usr/bin/env")
        );
    }

    #[test]
    fn test_default_toml_parses() {
        let default_toml = TrialConfig::default_toml();
        let config: TrialConfig = toml::from_str(&default_toml).unwrap();

        assert_eq!(config.runner.timeout, "60s");
        assert_eq!(config.experiments.len(), 1);
        assert_eq!(config.experiments[0].repetitions, vec![1, 2, 3, 4, 5]);
        assert_eq!(config.experiments[0].expect[0].model, FitModel::Exponential);
        assert!(config.validate().is_ok());
    }
}
