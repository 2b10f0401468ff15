//! External command execution
//!
//! Every build tool (composer, php, npm, mysql, git, the install driver)
//! is run through a shell by a [`CommandRunner`]. Output is captured in
//! full and, while the process runs, streamed chunk by chunk into an
//! [`OutputSink`] that may stop the process early.

use async_trait::async_trait;
use std::borrow::Cow;
use std::io;
use std::ops::ControlFlow;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::debug;

/// Captured output of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// Whether a success marker appears in the captured stdout
    pub fn contains(&self, marker: &str) -> bool {
        self.stdout.contains(marker)
    }
}

/// Errors raised while running an external command
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read output of '{command}': {source}")]
    Stream {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The output sink asked for the process to be stopped
    #[error("'{command}' was stopped: {reason}")]
    Interrupted {
        command: String,
        reason: String,
        output: CommandOutput,
    },
}

/// Receives command output while the process is still running
///
/// Returning `ControlFlow::Break(reason)` kills the process and makes the
/// run fail with [`CommandError::Interrupted`].
pub trait OutputSink: Send {
    fn on_stdout(&mut self, _chunk: &str) -> ControlFlow<String> {
        ControlFlow::Continue(())
    }

    fn on_stderr(&mut self, _chunk: &str) -> ControlFlow<String> {
        ControlFlow::Continue(())
    }
}

/// Sink that ignores all output
pub struct DiscardOutput;

impl OutputSink for DiscardOutput {}

/// Runs shell command lines
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs a command, streaming its output into `sink`
    ///
    /// Completes once the process exits. A non-zero exit status is not an
    /// error; callers decide success from the captured output.
    async fn run_with_sink(
        &self,
        command: &str,
        sink: &mut dyn OutputSink,
    ) -> Result<CommandOutput, CommandError>;

    /// Runs a command and returns its captured output
    async fn run(&self, command: &str) -> Result<CommandOutput, CommandError> {
        self.run_with_sink(command, &mut DiscardOutput).await
    }
}

/// Runs commands through `sh -c`
#[derive(Debug, Clone, Default)]
pub struct ShellCommandRunner {
    verbose: bool,
}

impl ShellCommandRunner {
    /// Creates a runner; `verbose` mirrors every command and its output
    /// to the terminal
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run_with_sink(
        &self,
        command: &str,
        sink: &mut dyn OutputSink,
    ) -> Result<CommandOutput, CommandError> {
        debug!("Running: {}", command);
        if self.verbose {
            println!("-----\n{}\n-----", command.replace("; ", "\n"));
        }

        let stream_error = |source: io::Error| CommandError::Stream {
            command: command.to_string(),
            source,
        };

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommandError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| stream_error(io::Error::other("stdout was not captured")))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| stream_error(io::Error::other("stderr was not captured")))?;

        let mut terminal = tokio::io::stdout();
        let mut out = Vec::new();
        let mut err = Vec::new();
        let mut out_buf = [0u8; 8192];
        let mut err_buf = [0u8; 8192];
        let mut out_open = true;
        let mut err_open = true;
        let mut interrupted = None;

        while out_open || err_open {
            tokio::select! {
                read = stdout.read(&mut out_buf), if out_open => {
                    let n = read.map_err(stream_error)?;
                    if n == 0 {
                        out_open = false;
                        continue;
                    }
                    let chunk = &out_buf[..n];
                    out.extend_from_slice(chunk);
                    if self.verbose {
                        let _ = terminal.write_all(chunk).await;
                        let _ = terminal.flush().await;
                    }
                    if let ControlFlow::Break(reason) = sink.on_stdout(&String::from_utf8_lossy(chunk)) {
                        interrupted = Some(reason);
                        break;
                    }
                }
                read = stderr.read(&mut err_buf), if err_open => {
                    let n = read.map_err(stream_error)?;
                    if n == 0 {
                        err_open = false;
                        continue;
                    }
                    let chunk = &err_buf[..n];
                    err.extend_from_slice(chunk);
                    if self.verbose {
                        let _ = terminal.write_all(chunk).await;
                        let _ = terminal.flush().await;
                    }
                    if let ControlFlow::Break(reason) = sink.on_stderr(&String::from_utf8_lossy(chunk)) {
                        interrupted = Some(reason);
                        break;
                    }
                }
            }
        }

        if let Some(reason) = interrupted {
            debug!("Stopping '{}': {}", command, reason);
            let _ = child.start_kill();
            let status = child.wait().await.ok();
            return Err(CommandError::Interrupted {
                command: command.to_string(),
                reason,
                output: CommandOutput {
                    stdout: String::from_utf8_lossy(&out).into_owned(),
                    stderr: String::from_utf8_lossy(&err).into_owned(),
                    exit_code: status.and_then(|s| s.code()),
                },
            });
        }

        let status = child.wait().await.map_err(stream_error)?;
        debug!("'{}' exited with {:?}", command, status.code());

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&out).into_owned(),
            stderr: String::from_utf8_lossy(&err).into_owned(),
            exit_code: status.code(),
        })
    }
}

/// Quotes one shell word
///
/// NUL bytes cannot be passed through a shell and are dropped.
pub fn quote(word: &str) -> String {
    let cleaned = word.replace('\0', "");
    shlex::try_quote(&cleaned)
        .map(Cow::into_owned)
        .unwrap_or(cleaned)
}
