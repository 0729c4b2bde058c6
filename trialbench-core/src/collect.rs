//! Sample Collection
//!
//! Invokes a subject once per configuration and parses its output into
//! trials. The output is line-oriented CSV:
//!
//! ```text
//! subject,result,elapsed        <- header, discarded when `header = true`
//! 5,1,100
//! 7,0,120
//! ```
//!
//! Lines that cannot be turned into a trial are counted, never fatal.

use crate::subject::{InvocationError, SubjectUnderTest};
use crate::{Configuration, Trial};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Unit of the elapsed column as printed by the subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Nanoseconds
    Ns,
    /// Microseconds
    #[default]
    Us,
    /// Milliseconds
    Ms,
    /// Seconds
    S,
}

impl TimeUnit {
    /// Convert a value in this unit to microseconds
    pub fn to_micros(self, value: f64) -> f64 {
        match self {
            TimeUnit::Ns => value / 1_000.0,
            TimeUnit::Us => value,
            TimeUnit::Ms => value * 1_000.0,
            TimeUnit::S => value * 1_000_000.0,
        }
    }
}

/// Column layout of the subject's per-trial output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldLayout {
    /// Discard the first line
    pub header: bool,
    /// Column of the subject value
    pub subject: usize,
    /// Column of the result value
    pub result: usize,
    /// Column of the elapsed time
    pub elapsed: usize,
    /// Reject lines with more fields than the layout uses
    pub strict: bool,
    /// Unit of the elapsed column
    pub time_unit: TimeUnit,
}

impl Default for FieldLayout {
    fn default() -> Self {
        Self {
            header: true,
            subject: 0,
            result: 1,
            elapsed: 2,
            strict: false,
            time_unit: TimeUnit::Us,
        }
    }
}

impl FieldLayout {
    /// Number of fields a line needs to be parseable
    pub fn required_fields(&self) -> usize {
        self.subject.max(self.result).max(self.elapsed) + 1
    }

    fn parse_line(&self, line: &str) -> Option<Trial> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let required = self.required_fields();
        if fields.len() < required || (self.strict && fields.len() != required) {
            return None;
        }

        let elapsed = fields[self.elapsed].parse::<f64>().ok()?;
        if !elapsed.is_finite() || elapsed < 0.0 {
            return None;
        }

        Some(Trial {
            subject: fields[self.subject].to_string(),
            result: fields[self.result].to_string(),
            elapsed_us: self.time_unit.to_micros(elapsed),
        })
    }
}

/// Trials parsed from one invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    /// Successfully parsed trials, in output order
    pub trials: Vec<Trial>,
    /// Number of non-blank lines that could not be parsed
    pub skipped: usize,
}

/// A subject invocation failed for one configuration
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invocation failed for {configuration}")]
pub struct SubjectInvocationError {
    /// Configuration that was being collected
    pub configuration: Configuration,
    /// What went wrong
    #[source]
    pub cause: InvocationError,
}

impl SubjectInvocationError {
    /// Whether further configurations of the same subject should be skipped
    pub fn is_fatal(&self) -> bool {
        self.cause.is_fatal()
    }
}

/// Parse raw subject output into trials
pub fn parse_output(raw: &str, layout: &FieldLayout) -> Collection {
    let mut collection = Collection::default();
    let body = raw.lines().skip(usize::from(layout.header));

    for line in body {
        if line.trim().is_empty() {
            continue;
        }
        match layout.parse_line(line) {
            Some(trial) => collection.trials.push(trial),
            None => collection.skipped += 1,
        }
    }

    collection
}

/// Invoke `subject` for `configuration` and parse its output.
///
/// When an input path is given it must be readable before the subject runs.
pub fn collect<S: SubjectUnderTest + ?Sized>(
    subject: &S,
    configuration: &Configuration,
    input: Option<&Path>,
    layout: &FieldLayout,
) -> Result<Collection, SubjectInvocationError> {
    let fail = |cause| SubjectInvocationError {
        configuration: configuration.clone(),
        cause,
    };

    if let Some(path) = input {
        check_readable(path).map_err(fail)?;
    }

    debug!("Invoking {} for {}", subject.describe(), configuration);
    let raw = subject.invoke(configuration, input).map_err(fail)?;
    let collection = parse_output(&raw, layout);

    if collection.skipped > 0 {
        warn!(
            "{}: skipped {} malformed line(s), kept {} trial(s)",
            configuration,
            collection.skipped,
            collection.trials.len()
        );
    }

    Ok(collection)
}

fn check_readable(path: &Path) -> Result<(), InvocationError> {
    let unavailable = |reason: String| InvocationError::InputUnavailable {
        path: path.to_path_buf(),
        reason,
    };

    if path.is_dir() {
        return Err(unavailable("is a directory".to_string()));
    }
    File::open(path).map(drop).map_err(|e| unavailable(e.to_string()))
}
