//! Subject Process Supervisor
//!
//! Runs an external subject-under-test once per configuration and captures
//! its trial output.
//!
//! Each invocation gets its own process group. On timeout the whole group
//! receives SIGTERM, then SIGKILL once the grace period has passed, so shell
//! wrappers cannot leave their children running.

use crate::config::{ConfigError, SubjectConfig, TrialConfig};
use crate::planner::Placeholders;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};
use tracing::debug;
use trialbench_core::{Configuration, InvocationError, SubjectUnderTest};

#[cfg(unix)]
use std::os::unix::process::CommandExt;

/// Interval between exit checks while a subject runs
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Longest stderr excerpt carried in an error
const STDERR_LIMIT: usize = 512;

/// Default per-invocation timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default time between SIGTERM and SIGKILL
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(500);

/// Send a signal to a process group. Returns `Err` if the signal could not be delivered.
#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) -> Result<(), std::io::Error> {
    let ret = unsafe { libc::kill(-(pid as libc::pid_t), signal) };
    if ret == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Subject backed by an external program
#[derive(Debug, Clone)]
pub struct ProcessSubject {
    program: String,
    program_path: PathBuf,
    args: Vec<String>,
    output: Option<String>,
    base_dir: Option<PathBuf>,
    timeout: Duration,
    grace_period: Duration,
}

impl ProcessSubject {
    /// Subject running `program`. Bare names are looked up on `PATH`.
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        Self {
            program_path: PathBuf::from(&program),
            program,
            args: Vec::new(),
            output: None,
            base_dir: None,
            timeout: DEFAULT_TIMEOUT,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Build from an experiment's subject section
    pub fn from_config(subject: &SubjectConfig, config: &TrialConfig) -> Result<Self, ConfigError> {
        let mut process = Self::new(subject.program.clone())
            .with_args(subject.args.clone())
            .with_timeout(config.timeout()?)
            .with_grace_period(config.grace_period()?);
        if let Some(output) = &subject.output {
            process = process.with_output(output.clone());
        }
        if let Some(base_dir) = &config.base_dir {
            process = process.with_base_dir(base_dir.clone());
        }
        Ok(process)
    }

    /// Argument templates
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Read trials from this file template instead of stdout
    pub fn with_output(mut self, template: impl Into<String>) -> Self {
        self.output = Some(template.into());
        self
    }

    /// Resolve relative program and output paths against `dir`
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let program = Path::new(&self.program);
        if program.components().count() > 1 && program.is_relative() {
            self.program_path = dir.join(program);
        }
        self.base_dir = Some(dir);
        self
    }

    /// Per-invocation timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Time between SIGTERM and SIGKILL on timeout
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    fn resolve(&self, path: String) -> PathBuf {
        let path = PathBuf::from(path);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }

    fn spawn(&self, args: &[String]) -> Result<Child, InvocationError> {
        let mut command = Command::new(&self.program_path);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.base_dir {
            command.current_dir(dir);
        }
        #[cfg(unix)]
        command.process_group(0);

        command.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                InvocationError::NotFound {
                    program: self.program.clone(),
                }
            }
            _ => InvocationError::Spawn {
                program: self.program.clone(),
                reason: e.to_string(),
            },
        })
    }

    /// Wait for exit until the deadline, then terminate the process group
    fn wait_until(
        &self,
        child: &mut Child,
        deadline: Instant,
    ) -> Result<ExitStatus, InvocationError> {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if Instant::now() >= deadline => break,
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    return Err(InvocationError::Spawn {
                        program: self.program.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.terminate(child);
        Err(InvocationError::Timeout(self.timeout))
    }

    /// Wait for a drained pipe until the deadline
    ///
    /// Group members that outlive the subject keep the pipe open; they are
    /// terminated like a hanging subject.
    fn collect_pipe(
        &self,
        child: &mut Child,
        pipe: Receiver<std::io::Result<Vec<u8>>>,
        deadline: Instant,
    ) -> Result<Vec<u8>, InvocationError> {
        match pipe.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(Ok(buf)) => Ok(buf),
            Ok(Err(e)) => Err(InvocationError::OutputUnreadable(e.to_string())),
            Err(RecvTimeoutError::Timeout) => {
                self.terminate(child);
                Err(InvocationError::Timeout(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(InvocationError::OutputUnreadable(
                "output reader panicked".to_string(),
            )),
        }
    }

    /// SIGTERM → grace period → SIGKILL
    fn terminate(&self, child: &mut Child) {
        #[cfg(unix)]
        {
            let pid = child.id();
            let _ = signal_group(pid, libc::SIGTERM);

            let grace_deadline = Instant::now() + self.grace_period;
            while Instant::now() < grace_deadline {
                if matches!(child.try_wait(), Ok(Some(_))) {
                    break;
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            // Leftover group members still hold the pipes.
            let _ = signal_group(pid, libc::SIGKILL);
        }

        let _ = child.kill();
        let _ = child.wait();
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<std::io::Result<Vec<u8>>> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let result = match pipe {
            Some(mut pipe) => pipe.read_to_end(&mut buf).map(|_| buf),
            None => Ok(buf),
        };
        let _ = tx.send(result);
    });
    rx
}

fn excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    match text.char_indices().nth(STDERR_LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

impl SubjectUnderTest for ProcessSubject {
    fn invoke(
        &self,
        configuration: &Configuration,
        input: Option<&Path>,
    ) -> Result<String, InvocationError> {
        let placeholders = Placeholders {
            configuration,
            input,
            output: None,
        };
        let output_path = self
            .output
            .as_deref()
            .map(|template| self.resolve(placeholders.render(template)));

        if let Some(path) = &output_path {
            // A file from an earlier run must not pass for this one.
            let _ = std::fs::remove_file(path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    InvocationError::OutputUnreadable(format!("{}: {}", parent.display(), e))
                })?;
            }
        }

        let placeholders = Placeholders {
            output: output_path.as_deref(),
            ..placeholders
        };
        let args: Vec<String> = self.args.iter().map(|a| placeholders.render(a)).collect();

        debug!(
            "Spawning {} {}",
            self.program_path.display(),
            args.join(" ")
        );
        let mut child = self.spawn(&args)?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        // Reader threads are left to finish on their own after a timeout.
        let deadline = Instant::now() + self.timeout;
        let status = self.wait_until(&mut child, deadline)?;
        let stdout = self.collect_pipe(&mut child, stdout, deadline)?;
        let stderr = self.collect_pipe(&mut child, stderr, deadline)?;

        if !status.success() {
            return Err(InvocationError::NonZeroExit {
                status: status.to_string(),
                stderr: excerpt(&stderr),
            });
        }

        match output_path {
            Some(path) => std::fs::read_to_string(&path).map_err(|e| {
                InvocationError::OutputUnreadable(format!("{}: {}", path.display(), e))
            }),
            None => String::from_utf8(stdout)
                .map_err(|e| InvocationError::OutputUnreadable(e.to_string())),
        }
    }

    fn describe(&self) -> String {
        self.program.clone()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Script run through `/bin/sh`, so the freshly written file is never exec'd
    fn sh(dir: &Path, name: &str, body: &str) -> (PathBuf, ProcessSubject) {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        let subject = ProcessSubject::new("/bin/sh").with_args([path.display().to_string()]);
        (path, subject)
    }

    fn with_more_args(subject: ProcessSubject, extra: &[&str]) -> ProcessSubject {
        let mut args = subject.args.clone();
        args.extend(extra.iter().map(|a| a.to_string()));
        ProcessSubject { args, ..subject }
    }

    fn cfg() -> Configuration {
        Configuration::new("karger", 8, 3)
    }

    #[test]
    fn test_captures_stdout_with_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let (_, subject) = sh(
            dir.path(),
            "echo.sh",
            "echo \"header\"\necho \"$1,$2,$3\"\n",
        );
        let subject = with_more_args(subject, &["{algorithm}", "{n}", "{k}"]);

        let out = subject.invoke(&cfg(), None).unwrap();
        assert_eq!(out, "header\nkarger,8,3\n");
    }

    #[test]
    fn test_missing_program_is_not_found() {
        let subject = ProcessSubject::new("/nonexistent/trialbench/subject");
        let err = subject.invoke(&cfg(), None).unwrap_err();

        assert!(err.is_fatal());
        assert!(matches!(err, InvocationError::NotFound { .. }));
    }

    #[test]
    fn test_non_zero_exit_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let (_, subject) = sh(dir.path(), "fail.sh", "echo 'bad graph' >&2\nexit 3\n");
        let err = subject.invoke(&cfg(), None).unwrap_err();

        match err {
            InvocationError::NonZeroExit { stderr, .. } => assert_eq!(stderr, "bad graph"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_timeout_terminates_process() {
        let dir = tempfile::tempdir().unwrap();
        let (_, subject) = sh(dir.path(), "hang.sh", "sleep 30\n");
        let subject = subject
            .with_timeout(Duration::from_millis(200))
            .with_grace_period(Duration::from_millis(100));

        let start = Instant::now();
        let err = subject.invoke(&cfg(), None).unwrap_err();

        assert_eq!(err, InvocationError::Timeout(Duration::from_millis(200)));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_timeout_covers_background_children_holding_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let (_, subject) = sh(dir.path(), "fork.sh", "sleep 5 &\necho h\necho 1,1,5\n");
        let subject = subject
            .with_timeout(Duration::from_millis(300))
            .with_grace_period(Duration::from_millis(100));

        let start = Instant::now();
        let err = subject.invoke(&cfg(), None).unwrap_err();

        assert_eq!(err, InvocationError::Timeout(Duration::from_millis(300)));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_reads_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let (_, subject) = sh(dir.path(), "write.sh", "printf 'h\\n1,1,5\\n' > \"$1\"\n");
        let subject = with_more_args(subject, &["{output}"])
            .with_base_dir(dir.path())
            .with_output("out/{algorithm}_{n}_{k}.csv");

        let out = subject.invoke(&cfg(), None).unwrap();
        assert_eq!(out, "h\n1,1,5\n");
        assert!(dir.path().join("out/karger_8_3.csv").exists());
    }

    #[test]
    fn test_missing_output_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let (_, subject) = sh(dir.path(), "noop.sh", "exit 0\n");
        let subject = subject.with_base_dir(dir.path()).with_output("never.csv");

        assert!(matches!(
            subject.invoke(&cfg(), None),
            Err(InvocationError::OutputUnreadable(_))
        ));
    }

    #[test]
    fn test_input_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("primes.txt");
        std::fs::write(&input, "7\n11\n").unwrap();
        let (_, subject) = sh(dir.path(), "cat.sh", "cat \"$1\"\n");
        let subject = with_more_args(subject, &["{input}"]);

        let out = subject.invoke(&cfg(), Some(&input)).unwrap();
        assert_eq!(out, "7\n11\n");
    }

    #[test]
    fn test_relative_program_resolves_against_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("bin")).unwrap();
        let path = dir.path().join("bin/ok.sh");
        std::fs::write(&path, "#!/bin/sh\necho ok\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let subject = ProcessSubject::new("bin/ok.sh").with_base_dir(dir.path());
        assert_eq!(subject.program_path, path);
        assert_eq!(subject.describe(), "bin/ok.sh");

        let bare = ProcessSubject::new("sh").with_base_dir(dir.path());
        assert_eq!(bare.program_path, PathBuf::from("sh"));
    }

    #[test]
    fn test_stderr_excerpt_is_bounded() {
        let long = "x".repeat(STDERR_LIMIT * 2);
        let text = excerpt(long.as_bytes());
        assert_eq!(text.len(), STDERR_LIMIT + 3);
    }
}
