//! Subject-Under-Test Abstraction
//!
//! A subject turns a configuration (and optionally an input file) into raw
//! textual trial output. The process-backed implementation lives in the CLI
//! crate; `FnSubject` runs a closure in-process.

use crate::Configuration;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Why a subject invocation produced no output
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvocationError {
    /// The subject program does not exist or is not executable
    #[error("Subject program not found: {program}")]
    NotFound {
        /// Program as configured
        program: String,
    },

    /// The subject could not be started
    #[error("Failed to spawn {program}: {reason}")]
    Spawn {
        /// Program as configured
        program: String,
        /// OS error text
        reason: String,
    },

    /// The subject exited unsuccessfully
    #[error("Subject exited with {status}{}", stderr_suffix(.stderr))]
    NonZeroExit {
        /// Exit status description
        status: String,
        /// Captured standard error (trimmed)
        stderr: String,
    },

    /// The subject ran past its deadline and was terminated
    #[error("Subject timed out after {0:?}")]
    Timeout(Duration),

    /// The input source was missing or unreadable before invocation
    #[error("Input source unavailable: {}: {reason}", .path.display())]
    InputUnavailable {
        /// Resolved input path
        path: PathBuf,
        /// I/O error text
        reason: String,
    },

    /// Output could not be read back (not UTF-8, missing output file)
    #[error("Subject output unreadable: {0}")]
    OutputUnreadable(String),

    /// In-process subject reported a failure
    #[error("{0}")]
    Failed(String),
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr)
    }
}

impl InvocationError {
    /// A fatal error means no configuration of the same subject can succeed
    pub fn is_fatal(&self) -> bool {
        matches!(self, InvocationError::NotFound { .. })
    }
}

/// Something that can be invoked with a configuration to produce trial output
pub trait SubjectUnderTest: Send + Sync {
    /// Run once for `configuration`, returning the raw textual output
    fn invoke(
        &self,
        configuration: &Configuration,
        input: Option<&Path>,
    ) -> Result<String, InvocationError>;

    /// Short human-readable description for logs
    fn describe(&self) -> String {
        "in-process subject".to_string()
    }
}

impl<S: SubjectUnderTest + ?Sized> SubjectUnderTest for &S {
    fn invoke(
        &self,
        configuration: &Configuration,
        input: Option<&Path>,
    ) -> Result<String, InvocationError> {
        (**self).invoke(configuration, input)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<S: SubjectUnderTest + ?Sized> SubjectUnderTest for Box<S> {
    fn invoke(
        &self,
        configuration: &Configuration,
        input: Option<&Path>,
    ) -> Result<String, InvocationError> {
        (**self).invoke(configuration, input)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// In-process subject backed by a closure
pub struct FnSubject<F> {
    func: F,
}

/// Wrap a closure as a subject
pub fn from_fn<F>(func: F) -> FnSubject<F>
where
    F: Fn(&Configuration, Option<&Path>) -> Result<String, InvocationError> + Send + Sync,
{
    FnSubject { func }
}

impl<F> SubjectUnderTest for FnSubject<F>
where
    F: Fn(&Configuration, Option<&Path>) -> Result<String, InvocationError> + Send + Sync,
{
    fn invoke(
        &self,
        configuration: &Configuration,
        input: Option<&Path>,
    ) -> Result<String, InvocationError> {
        (self.func)(configuration, input)
    }
}
