// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External command execution.
//!
//! Kubedoc never talks to a Kubernetes cluster directly. Instead, it shells
//! out to kubectl through the [`CommandExecutor`] trait. The trait takes an
//! argument vector plus optional standard input, and hands back the exit
//! code with whatever was written to stdout and stderr. Thus, the adapter
//! logic built on top of it can be exercised without a live cluster by
//! swapping in a fake executor.

use crate::context::{Context, ContextError};

use std::{
    ffi::OsStr,
    fmt::{Display, Formatter, Result as FmtResult},
    io::{self, Read, Write},
    process::{Child, Command, Stdio},
    thread::{self, JoinHandle},
    time::Duration,
};
use tracing::{debug, instrument, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Command to execute.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

impl CommandRequest {
    /// Construct new command request for target program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Append argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append listing of arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Feed data through standard input.
    pub fn stdin(mut self, data: impl Into<String>) -> Self {
        self.stdin = Some(data.into());
        self
    }
}

impl Display for CommandRequest {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(fmt, " {arg:?}")?;
            } else {
                write!(fmt, " {arg}")?;
            }
        }

        Ok(())
    }
}

/// Result of finished command.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, or `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Check if command exited with zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Execute external commands.
pub trait CommandExecutor {
    /// Run command to completion.
    ///
    /// A non-zero exit is NOT an error at this level. Callers classify the
    /// returned [`CommandOutput`] themselves.
    fn run(&self, ctx: &Context, request: &CommandRequest) -> Result<CommandOutput>;

    /// Run command to completion, and fail on non-zero exit.
    ///
    /// # Errors
    ///
    /// - Return [`ExecError::Failed`] if the command does not exit with zero.
    fn run_checked(&self, ctx: &Context, request: &CommandRequest) -> Result<CommandOutput> {
        let output = self.run(ctx, request)?;
        if !output.success() {
            return Err(ExecError::Failed {
                command: request.to_string(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim_end().to_owned(),
            });
        }

        Ok(output)
    }
}

impl<E> CommandExecutor for &E
where
    E: CommandExecutor + ?Sized,
{
    fn run(&self, ctx: &Context, request: &CommandRequest) -> Result<CommandOutput> {
        (**self).run(ctx, request)
    }
}

/// Command execution through child processes of the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl SystemExecutor {
    /// Construct new system executor.
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for SystemExecutor {
    /// Spawn command as child process, and wait for it.
    ///
    /// The child is killed if the context gets cancelled, or reaches its
    /// deadline, before the child exits.
    ///
    /// # Errors
    ///
    /// - Return [`ExecError::Cancelled`] if the context is done.
    /// - Return [`ExecError::Spawn`] if the child cannot be started.
    /// - Return [`ExecError::Io`] if the child cannot be waited on.
    #[instrument(skip(self, ctx, request), fields(command = %request), level = "debug")]
    fn run(&self, ctx: &Context, request: &CommandRequest) -> Result<CommandOutput> {
        ctx.check().map_err(|reason| ExecError::Cancelled {
            command: request.to_string(),
            reason,
        })?;

        debug!("spawn child process");
        let stdin = match request.stdin {
            Some(_) => Stdio::piped(),
            None => Stdio::null(),
        };
        let mut child = Command::new(OsStr::new(&request.program))
            .args(&request.args)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecError::Spawn {
                command: request.to_string(),
                source,
            })?;

        // INVARIANT: Feed and drain pipes concurrently so the child never
        //   blocks on a full pipe while we poll it.
        let writer = match (child.stdin.take(), request.stdin.clone()) {
            (Some(mut pipe), Some(data)) => Some(thread::spawn(move || {
                pipe.write_all(data.as_bytes())
            })),
            _ => None,
        };
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(err) => {
                    warn!("kill {request}: {err}");
                    abandon(&mut child);
                    return Err(err.into());
                }
            }

            if let Err(reason) = ctx.check() {
                warn!("kill {request}: {reason}");
                abandon(&mut child);
                return Err(ExecError::Cancelled {
                    command: request.to_string(),
                    reason,
                });
            }

            thread::sleep(POLL_INTERVAL);
        };

        if let Some(writer) = writer {
            if let Ok(Err(err)) = writer.join() {
                // Child may exit without reading all of its input.
                debug!("failed to write stdin: {err}");
            }
        }

        let output = CommandOutput {
            exit_code: status.code(),
            stdout: join_reader(stdout)?,
            stderr: join_reader(stderr)?,
        };
        debug!("child exited with {:?}", output.exit_code);

        Ok(output)
    }
}

// Reaping the child closes its pipes, which lets the reader threads finish.
fn abandon(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn spawn_reader<R>(pipe: Option<R>) -> JoinHandle<io::Result<String>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buffer)?;
        }
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    })
}

fn join_reader(handle: JoinHandle<io::Result<String>>) -> Result<String> {
    let output = handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("pipe reader panicked")))?;
    Ok(output)
}

/// Command execution error types.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// Child process cannot be started.
    #[error("failed to spawn {command:?}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Command was abandoned because its context is done.
    #[error("command {command:?} abandoned")]
    Cancelled {
        command: String,
        #[source]
        reason: ContextError,
    },

    /// Command exited with non-zero.
    #[error("command {command:?} failed with exit code {exit_code:?}:\n{stderr}")]
    Failed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Child process cannot be waited on, or its pipes cannot be read.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = ExecError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn command_request_display() {
        let request = CommandRequest::new("kubectl")
            .args(["get", "pod"])
            .arg("my pod")
            .arg("");
        assert_eq!(request.to_string(), r#"kubectl get pod "my pod" """#);
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_captures_output() -> anyhow::Result<()> {
        let request = CommandRequest::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]);
        let output = SystemExecutor::new().run(&Context::new(), &request)?;
        let expect = CommandOutput {
            exit_code: Some(3),
            stdout: "out\n".into(),
            stderr: "err\n".into(),
        };
        assert_eq!(output, expect);

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_feeds_stdin() -> anyhow::Result<()> {
        let request = CommandRequest::new("cat").stdin("kind: Pod\n");
        let output = SystemExecutor::new().run_checked(&Context::new(), &request)?;
        assert_eq!(output.stdout, "kind: Pod\n");

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_run_checked_fails_on_non_zero() {
        let request = CommandRequest::new("sh").args(["-c", "echo nope >&2; exit 1"]);
        let result = SystemExecutor::new().run_checked(&Context::new(), &request);
        match result {
            Err(ExecError::Failed {
                exit_code, stderr, ..
            }) => {
                assert_eq!(exit_code, Some(1));
                assert_eq!(stderr, "nope");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_kills_child_past_deadline() {
        let ctx = Context::new().with_timeout(Duration::from_millis(100));
        let request = CommandRequest::new("sleep").arg("30");
        let result = SystemExecutor::new().run(&ctx, &request);
        assert!(matches!(
            result,
            Err(ExecError::Cancelled {
                reason: ContextError::DeadlineExceeded,
                ..
            })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn abandon_reaps_child() -> anyhow::Result<()> {
        let mut child = Command::new("sleep")
            .arg("30")
            .stdout(Stdio::piped())
            .spawn()?;
        let stdout = spawn_reader(child.stdout.take());

        abandon(&mut child);
        assert!(child.try_wait()?.is_some());
        assert_eq!(join_reader(stdout)?, "");

        Ok(())
    }

    #[test]
    fn system_executor_refuses_cancelled_context() {
        let ctx = Context::new();
        ctx.cancel_token().cancel();
        let result = SystemExecutor::new().run(&ctx, &CommandRequest::new("true"));
        assert!(matches!(
            result,
            Err(ExecError::Cancelled {
                reason: ContextError::Cancelled,
                ..
            })
        ));
    }

    #[test]
    fn system_executor_missing_program() {
        let request = CommandRequest::new("kubedoc-no-such-program-here");
        let result = SystemExecutor::new().run(&Context::new(), &request);
        assert!(matches!(result, Err(ExecError::Spawn { .. })));
    }
}
