//! Running external commands while streaming and capturing their output.

use std::fmt;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Sender};
use std::thread;

use tracing::{debug, info};

use crate::error::{Result, TransactionError};

/// Output captured from a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code, or `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
    /// Standard output and standard error interleaved in arrival order.
    pub output: String,
}

impl ExecutionResult {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Executes a single command on behalf of a transaction.
pub trait CommandRunner {
    /// Run `command` to completion.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::CommandFailed`] when `check` is set and the
    /// command exits unsuccessfully, and [`TransactionError::Spawn`] when the
    /// command cannot be started or waited on.
    fn run(&self, command: &str, check: bool) -> Result<ExecutionResult>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, command: &str, check: bool) -> Result<ExecutionResult> {
        (**self).run(command, check)
    }
}

/// Target of the events carrying command output in [`OutputEcho::Log`] mode.
pub const OUTPUT_TARGET: &str = "releasetx::output";

/// Where a running command's output is forwarded while it is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputEcho {
    /// Write to this process's own stdout and stderr.
    #[default]
    Inherit,
    /// Write to this process's stdout and stderr, and also emit each
    /// non-empty line as an `info` event with target [`OUTPUT_TARGET`].
    ///
    /// The terminal copy does not depend on any log filter. Subscribers that
    /// print events to the terminal should drop [`OUTPUT_TARGET`].
    Log,
    /// Capture only.
    Silent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

impl OutputEcho {
    fn emit(self, stream: Stream, line: &str) {
        if self == Self::Silent {
            return;
        }

        // A closed terminal must not fail the step.
        let _ = match stream {
            Stream::Stdout => write_flushed(&mut std::io::stdout().lock(), line),
            Stream::Stderr => write_flushed(&mut std::io::stderr().lock(), line),
        };

        if self == Self::Log {
            let trimmed = line.trim_end_matches(['\r', '\n']);
            if !trimmed.is_empty() {
                info!(target: OUTPUT_TARGET, "{trimmed}");
            }
        }
    }
}

fn write_flushed(out: &mut impl Write, line: &str) -> std::io::Result<()> {
    out.write_all(line.as_bytes())?;
    out.flush()
}

/// Runs commands through a shell (`sh -c <command>` by default).
#[derive(Clone)]
pub struct ShellRunner {
    shell: String,
    working_dir: Option<PathBuf>,
    env: Vec<(String, String)>,
    echo: OutputEcho,
}

impl fmt::Debug for ShellRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env: Vec<&str> = self.env.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("ShellRunner")
            .field("shell", &self.shell)
            .field("working_dir", &self.working_dir)
            .field("env", &env)
            .field("echo", &self.echo)
            .finish()
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellRunner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shell: String::from("sh"),
            working_dir: None,
            env: Vec::new(),
            echo: OutputEcho::default(),
        }
    }

    /// Use `shell` instead of `sh`. It is invoked as `<shell> -c <command>`.
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Export `key=value` to every command. Values are never logged.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_echo(mut self, echo: OutputEcho) -> Self {
        self.echo = echo;
        self
    }

    fn spawn_error(command: &str, source: std::io::Error) -> TransactionError {
        TransactionError::Spawn {
            command: command.to_string(),
            source,
        }
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str, check: bool) -> Result<ExecutionResult> {
        info!("--> {command}");

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd.envs(self.env.iter().map(|(k, v)| (k, v)));

        let mut child = cmd
            .spawn()
            .map_err(|source| Self::spawn_error(command, source))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let mut result = ExecutionResult::default();

        thread::scope(|scope| {
            let (tx, rx) = mpsc::channel();
            if let Some(out) = stdout {
                let tx = tx.clone();
                scope.spawn(move || forward_lines(out, Stream::Stdout, &tx));
            }
            if let Some(err) = stderr {
                let tx = tx.clone();
                scope.spawn(move || forward_lines(err, Stream::Stderr, &tx));
            }
            drop(tx);

            for (stream, line) in rx {
                self.echo.emit(stream, &line);
                match stream {
                    Stream::Stdout => result.stdout.push_str(&line),
                    Stream::Stderr => result.stderr.push_str(&line),
                }
                result.output.push_str(&line);
            }
        });

        let status = child
            .wait()
            .map_err(|source| Self::spawn_error(command, source))?;
        result.code = status.code();
        debug!(code = ?result.code, "'{command}' finished");

        if check && !result.success() {
            return Err(TransactionError::CommandFailed {
                command: command.to_string(),
                code: result.code,
                output: result.output,
            });
        }

        Ok(result)
    }
}

fn forward_lines(reader: impl Read, stream: Stream, tx: &Sender<(Stream, String)>) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).into_owned();
                if tx.send((stream, line)).is_err() {
                    break;
                }
            }
        }
    }
}
