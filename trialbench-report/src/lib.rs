#![warn(missing_docs)]
//! Trialbench Report - Output Formats
//!
//! Report structures shared by the runner and its consumers:
//! - JSON (machine-readable, full report)
//! - CSV (the persisted summary table consumed by plotting)
//! - Human-readable terminal output is rendered by the CLI

mod csv;
mod json;
mod report;

pub use crate::csv::{SUMMARY_COLUMNS, UNDEFINED, generate_csv_report, write_summary_table};
pub use json::{ReportSchema, SCHEMA_VERSION, generate_json_report, parse_json_report};
pub use report::{
    ExpectationResult, FitRecord, Report, ReportConfig, ReportMeta, ReportSummary, SystemInfo,
    Verdict,
};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// JSON with full schema
    Json,
    /// Summary table as CSV
    Csv,
    /// Human-readable terminal output
    #[default]
    Human,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Human => write!(f, "human"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Human);
        assert!("html".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Csv.to_string(), "csv");
    }
}
