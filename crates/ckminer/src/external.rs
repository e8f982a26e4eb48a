//! Subprocess collaborators: the indenter (soft dependency) and the C
//! compiler used as a check-only verifier (spec.md §4.E, §5, §6).
//!
//! `run_with_timeout` is the one place this crate spins up a thread — it
//! races a subprocess against a wall-clock deadline so a pathological input
//! can never wedge the pipeline (spec.md §5's suspension-point note).

use std::fmt;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Sentinel stored in `KernelMeta::clang_returncode` when the compiler check
/// did not finish inside its timeout (spec.md §5).
pub const CLANG_RETURNCODE_TIMEOUT: i32 = -1;

/// Infrastructural failure launching or communicating with a subprocess
/// (spec.md §7's "propagate up" row) — never used for a non-zero exit code,
/// which is itself meaningful output, not a fault.
#[derive(Debug)]
pub enum SpawnError {
    Io(std::io::Error),
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnError::Io(e) => write!(f, "failed to run subprocess: {e}"),
        }
    }
}

impl std::error::Error for SpawnError {}

impl From<std::io::Error> for SpawnError {
    fn from(e: std::io::Error) -> Self {
        SpawnError::Io(e)
    }
}

/// Result of racing a subprocess against a timeout.
pub enum RunOutcome {
    Completed { stdout: String, exit_code: i32 },
    TimedOut,
}

/// Run `command`, feeding `stdin_data` on its stdin and collecting stdout,
/// killing it with `SIGKILL` if it outlives `timeout`.
pub fn run_with_timeout(
    mut command: Command,
    stdin_data: &str,
    timeout: Duration,
) -> Result<RunOutcome, SpawnError> {
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdin = child.stdin.take();
    let pid = child.id();
    let stdin_data = stdin_data.to_string();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        if let Some(mut stdin) = stdin {
            // Writing and waiting must happen on the same side of the
            // timeout race: a subprocess that fills its stdout/stderr pipe
            // before draining stdin would otherwise deadlock this call on
            // `write_all` before `recv_timeout` below ever gets armed. A
            // subprocess that never reads stdin (or dies mid-write) should
            // not turn a broken pipe into an infrastructural failure either
            // way — the timeout/exit-code path already covers that case.
            let _ = stdin.write_all(stdin_data.as_bytes());
            drop(stdin);
        }
        let _ = tx.send(child.wait_with_output());
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(output)) => {
            tracing::debug!(
                stderr = %String::from_utf8_lossy(&output.stderr),
                "subprocess finished"
            );
            Ok(RunOutcome::Completed {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                exit_code: output.status.code().unwrap_or(CLANG_RETURNCODE_TIMEOUT),
            })
        }
        Ok(Err(e)) => Err(SpawnError::Io(e)),
        Err(mpsc::RecvTimeoutError::Timeout | mpsc::RecvTimeoutError::Disconnected) => {
            // Best-effort: the worker thread still owns the Child and will
            // reap it once killed, regardless of whether we wait for that.
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGKILL);
            }
            tracing::debug!(%pid, "subprocess exceeded timeout, sent SIGKILL");
            Ok(RunOutcome::TimedOut)
        }
    }
}

/// Wraps an external pretty-printer. Soft dependency per spec.md §4.E step
/// 4: an absent binary, a non-zero exit, or a timeout all fall back to
/// passing the input through unchanged rather than failing the kernel.
#[derive(Debug, Clone)]
pub struct Indenter {
    binary: String,
    timeout: Duration,
}

impl Indenter {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Indenter {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn format(&self, source: &str) -> String {
        let command = Command::new(&self.binary);
        match run_with_timeout(command, source, self.timeout) {
            Ok(RunOutcome::Completed { stdout, exit_code: 0 }) => stdout,
            Ok(RunOutcome::Completed { .. }) | Ok(RunOutcome::TimedOut) => {
                tracing::debug!(binary = %self.binary, "indenter did not succeed, passing text through");
                source.to_string()
            }
            Err(e) => {
                tracing::debug!(binary = %self.binary, error = %e, "indenter unavailable, passing text through");
                source.to_string()
            }
        }
    }
}

/// Wraps a C compiler invoked in parse-and-compile-only mode (spec.md §6:
/// `<cc> -x c -c -`). The exit code is the only observed output; unlike the
/// indenter this is not a soft dependency — a missing compiler binary
/// propagates as `SpawnError`, since there is then no returncode to
/// synthesise, sentinel or otherwise (spec.md §4.E expansion).
#[derive(Debug, Clone)]
pub struct CCompiler {
    binary: String,
    timeout: Duration,
}

impl CCompiler {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        CCompiler {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn check(&self, source: &str) -> Result<i32, SpawnError> {
        let mut command = Command::new(&self.binary);
        command.args(["-x", "c", "-c", "-", "-o", "/dev/null"]);
        match run_with_timeout(command, source, self.timeout)? {
            RunOutcome::Completed { exit_code, .. } => Ok(exit_code),
            RunOutcome::TimedOut => Ok(CLANG_RETURNCODE_TIMEOUT),
        }
    }
}
