//! Subprocess execution.
//!
//! Provides utilities for running external commands with:
//! - No shell interpretation (direct exec)
//! - Enforced timeouts and cooperative cancellation
//! - Captured stdout/stderr
//! - Environment control

use std::collections::BTreeMap;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{CommandErrorKind, ServiceError};

use super::cancel::CancelToken;

/// Result of a subprocess execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubprocessResult {
    /// Whether the command exited successfully (exit code 0).
    pub success: bool,
    /// The exit code, if available.
    pub exit_code: Option<i32>,
    /// Captured stdout as a string.
    pub stdout: String,
    /// Captured stderr as a string.
    pub stderr: String,
}

/// Builder for subprocess execution.
///
/// The builder doubles as the description of an invocation: a
/// [`CommandRunner`](super::CommandRunner) receives it whole and may
/// inspect it instead of running it.
#[derive(Debug, Clone)]
pub struct SubprocessBuilder {
    id: Uuid,
    program: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    timeout: Duration,
    cancel: Option<CancelToken>,
}

impl SubprocessBuilder {
    /// Create a new subprocess builder.
    pub fn new(program: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            program: program.to_string(),
            args: Vec::new(),
            env: BTreeMap::new(),
            timeout: Duration::from_secs(60),
            cancel: None,
        }
    }

    /// Add arguments to the command.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args.extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Set the timeout for the command.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Attach a cancellation token.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    pub fn time_limit(&self) -> Duration {
        self.timeout
    }

    pub fn has_cancel_token(&self) -> bool {
        self.cancel.is_some()
    }

    /// `program arg1 arg2`, as used in logs.
    pub fn display_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    fn timed_out(&self) -> ServiceError {
        ServiceError::Command {
            kind: CommandErrorKind::Timeout {
                timeout_secs: self.timeout.as_secs(),
            },
        }
    }

    fn cancelled() -> ServiceError {
        ServiceError::Command {
            kind: CommandErrorKind::Cancelled,
        }
    }

    /// Execute the command and wait for completion.
    ///
    /// If the process exceeds the configured timeout, or the attached
    /// token is cancelled, it is killed and an error is returned. The
    /// deadline also covers reading output after the process exits, so
    /// a background child holding the pipes open cannot stall the call.
    /// A non-zero exit is NOT an error here; callers decide.
    pub fn run(self) -> Result<SubprocessResult, ServiceError> {
        debug!(
            invocation_id = %self.id,
            program = %self.program,
            args = ?self.args,
            timeout_secs = self.timeout.as_secs(),
            "Executing subprocess"
        );

        if self.is_cancelled() {
            return Err(Self::cancelled());
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|e| {
            ServiceError::execution_failed(format!("Failed to spawn {}: {}", self.program, e))
        })?;

        // Drain pipes concurrently so a chatty child cannot block on a full pipe.
        let (tx, rx) = mpsc::channel();
        let mut pending = 0;
        if let Some(pipe) = child.stdout.take() {
            drain(pipe, Stream::Stdout, tx.clone());
            pending += 1;
        }
        if let Some(pipe) = child.stderr.take() {
            drain(pipe, Stream::Stderr, tx.clone());
            pending += 1;
        }
        drop(tx);

        let start = Instant::now();

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() > self.timeout {
                        warn!(
                            invocation_id = %self.id,
                            program = %self.program,
                            timeout_secs = self.timeout.as_secs(),
                            "Process timed out, killing"
                        );
                        kill_and_reap(&mut child);
                        return Err(self.timed_out());
                    }
                    if self.is_cancelled() {
                        warn!(
                            invocation_id = %self.id,
                            program = %self.program,
                            "Process cancelled, killing"
                        );
                        kill_and_reap(&mut child);
                        return Err(Self::cancelled());
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    kill_and_reap(&mut child);
                    return Err(ServiceError::execution_failed(format!(
                        "Failed to check process status: {}",
                        e
                    )));
                }
            }
        };

        let (stdout, stderr) = self.collect_output(&rx, pending, start)?;
        let result = SubprocessResult {
            success: status.success(),
            exit_code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        };

        debug!(
            invocation_id = %self.id,
            success = result.success,
            exit_code = ?result.exit_code,
            duration_ms = start.elapsed().as_millis(),
            "Subprocess completed"
        );

        Ok(result)
    }

    /// Wait for the drain threads, bounded by the remaining time limit.
    ///
    /// Pipes stay open while any process that inherited them is alive,
    /// even after the direct child has exited.
    fn collect_output(
        &self,
        rx: &Receiver<(Stream, Vec<u8>)>,
        mut pending: usize,
        start: Instant,
    ) -> Result<(Vec<u8>, Vec<u8>), ServiceError> {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        while pending > 0 {
            let remaining = self.timeout.saturating_sub(start.elapsed());
            match rx.recv_timeout(remaining.min(POLL_INTERVAL)) {
                Ok((Stream::Stdout, buf)) => {
                    stdout = buf;
                    pending -= 1;
                }
                Ok((Stream::Stderr, buf)) => {
                    stderr = buf;
                    pending -= 1;
                }
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    if start.elapsed() >= self.timeout {
                        warn!(
                            invocation_id = %self.id,
                            program = %self.program,
                            timeout_secs = self.timeout.as_secs(),
                            "Output still open after process exit, giving up"
                        );
                        return Err(self.timed_out());
                    }
                    if self.is_cancelled() {
                        warn!(
                            invocation_id = %self.id,
                            program = %self.program,
                            "Cancelled while reading output"
                        );
                        return Err(Self::cancelled());
                    }
                }
            }
        }

        Ok((stdout, stderr))
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(50);

enum Stream {
    Stdout,
    Stderr,
}

fn drain<R>(mut pipe: R, stream: Stream, tx: Sender<(Stream, Vec<u8>)>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = Vec::new();
        // A read error leaves whatever was captured so far.
        let _ = pipe.read_to_end(&mut buf);
        // The receiver is gone if the caller already gave up.
        let _ = tx.send((stream, buf));
    });
}

fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!(error = %e, "Failed to kill process");
    }
    let _ = child.wait();
}
