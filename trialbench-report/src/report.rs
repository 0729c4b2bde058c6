//! Report Data Structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trialbench_core::SummaryRow;
use trialbench_stats::{FitModel, FitResult};

/// Complete experiment report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub meta: ReportMeta,
    /// Summary rows in matrix order, experiments concatenated
    pub rows: Vec<SummaryRow>,
    pub fits: Vec<FitRecord>,
    pub expectations: Vec<ExpectationResult>,
    pub summary: ReportSummary,
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    pub schema_version: u32,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub git_commit: Option<String>,
    pub git_branch: Option<String>,
    pub system: SystemInfo,
    pub config: ReportConfig,
}

/// Runner configuration captured in report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub timeout_ms: u64,
    pub jobs: usize,
    pub min_fit_points: usize,
    pub bootstrap_iterations: usize,
    pub confidence_level: f64,
    pub seed: u64,
}

/// System information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub cpu: String,
    pub cpu_cores: u32,
    pub memory_gb: f64,
}

/// One scaling fit across the rows of an experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitRecord {
    pub experiment: String,
    /// Human-readable description, e.g. `rate ~ k [exponential] algorithm=miller`
    pub label: String,
    pub x: String,
    pub y: String,
    pub model: FitModel,
    /// Fitted result, absent when the fit is undefined
    pub result: Option<FitResult>,
    /// Why the fit is undefined
    pub error: Option<String>,
}

impl FitRecord {
    /// Fitted slope, if defined
    pub fn slope(&self) -> Option<f64> {
        self.result.map(|r| r.slope)
    }
}

/// Verdict of a scaling expectation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Observed slope within tolerance of the expected value
    Passed,
    /// Observed slope outside tolerance
    Failed,
    /// The fit is undefined, nothing to compare
    Undefined,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Passed => write!(f, "passed"),
            Verdict::Failed => write!(f, "failed"),
            Verdict::Undefined => write!(f, "undefined"),
        }
    }
}

/// Comparison of a fitted slope against a theoretical value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectationResult {
    pub experiment: String,
    pub label: String,
    pub expected: f64,
    pub tolerance: f64,
    pub observed: Option<f64>,
    pub verdict: Verdict,
    pub message: String,
}

/// Report summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub experiments: usize,
    pub configurations: usize,
    pub ok: usize,
    pub failed: usize,
    pub skipped: usize,
    pub trials: usize,
    pub skipped_lines: usize,
    pub fits_defined: usize,
    pub fits_undefined: usize,
    pub expectations_passed: usize,
    pub expectations_failed: usize,
    pub expectations_undefined: usize,
    pub total_duration_ms: f64,
}

impl ReportSummary {
    /// Whether any configuration failed or any expectation was violated
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.expectations_failed > 0
    }
}
