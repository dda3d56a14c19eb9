// Copyright 2022 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Execution of the external tools that do the actual decoding.
//!
//! Decoders never spawn processes themselves, they go through a [`ProcessRunner`]. This lets
//! the harness substitute the runner, and tests replace the external tool altogether.

use std::io;
use std::io::Read;
use std::io::Write;
use std::process::Child;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use thiserror::Error;

/// How often a running child is polled for completion when a timeout applies.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Result of a process that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, or `None` if the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Captured stdout followed by stderr, lossily converted to UTF-8.
    pub fn combined(&self) -> String {
        let mut out = String::from_utf8_lossy(&self.stdout).into_owned();
        out.push_str(&String::from_utf8_lossy(&self.stderr));
        out
    }
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("empty command line")]
    EmptyCommand,
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("process did not finish within {0:?}")]
    TimedOut(Duration),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Runs external commands on behalf of a decoder.
pub trait ProcessRunner: Send + Sync {
    /// Runs `argv` to completion and returns its exit code and captured output.
    ///
    /// A non-zero exit code is not an error at this level. If `timeout` elapses the process is
    /// killed along with its children and [`RunError::TimedOut`] is returned. When `verbose` is
    /// set the captured output is also forwarded to our own stdout and stderr.
    fn run(
        &self,
        argv: &[String],
        timeout: Option<Duration>,
        verbose: bool,
    ) -> Result<ProcessOutput, RunError>;
}

/// [`ProcessRunner`] spawning real processes with `std::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandRunner;

impl ProcessRunner for CommandRunner {
    fn run(
        &self,
        argv: &[String],
        timeout: Option<Duration>,
        verbose: bool,
    ) -> Result<ProcessOutput, RunError> {
        let (program, args) = argv.split_first().ok_or(RunError::EmptyCommand)?;

        if verbose {
            log::info!("Running: {}", argv.join(" "));
        } else {
            log::debug!("Running: {}", argv.join(" "));
        }

        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Lead a new process group so a timeout can take down the whole pipeline.
            command.process_group(0);
        }

        let mut child = command
            .spawn()
            .map_err(|source| RunError::Spawn { program: program.clone(), source })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let waited = wait_timeout(&mut child, timeout);
        // On error the readers are left to finish on their own once the pipes close.
        let status = settle(&mut child, waited, timeout)?;

        let output = ProcessOutput {
            code: status.code(),
            stdout: collect(stdout)?,
            stderr: collect(stderr)?,
        };

        if verbose {
            forward(&output, &mut io::stdout().lock(), &mut io::stderr().lock());
        }

        Ok(output)
    }
}

/// Reads `pipe` to its end on a separate thread, so the child never blocks on a full pipe.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

/// Turns the outcome of waiting for `child` into its exit status. A child that timed out, or
/// that could not be waited for, is killed along with its process group and reaped.
fn settle(
    child: &mut Child,
    waited: io::Result<Option<ExitStatus>>,
    timeout: Option<Duration>,
) -> Result<ExitStatus, RunError> {
    match waited {
        Ok(Some(status)) => Ok(status),
        Ok(None) => {
            kill_group(child);
            Err(RunError::TimedOut(timeout.unwrap_or_default()))
        }
        Err(e) => {
            kill_group(child);
            Err(e.into())
        }
    }
}

/// Echoes the captured output of a child. Write failures are logged, not returned.
fn forward(output: &ProcessOutput, stdout: &mut impl Write, stderr: &mut impl Write) {
    if let Err(e) = stdout.write_all(&output.stdout).and_then(|()| stdout.flush()) {
        log::warn!("Failed to forward process stdout: {}", e);
    }
    if let Err(e) = stderr.write_all(&output.stderr).and_then(|()| stderr.flush()) {
        log::warn!("Failed to forward process stderr: {}", e);
    }
}

fn collect(reader: JoinHandle<io::Result<Vec<u8>>>) -> io::Result<Vec<u8>> {
    reader.join().map_err(|_| io::Error::new(io::ErrorKind::Other, "output reader panicked"))?
}

/// Waits for `child` to exit. Returns `None` if it is still running after `timeout`.
fn wait_timeout(child: &mut Child, timeout: Option<Duration>) -> io::Result<Option<ExitStatus>> {
    let Some(timeout) = timeout else {
        return child.wait().map(Some);
    };

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    let killed = {
        use nix::sys::signal::killpg;
        use nix::sys::signal::Signal;
        use nix::unistd::Pid;

        match killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to kill process group {}: {}", child.id(), e);
                false
            }
        }
    };
    #[cfg(not(unix))]
    let killed = false;

    if !killed {
        let _ = child.kill();
    }
    let _ = child.wait();
}

/// Splits `command_line` into arguments following POSIX shell quoting rules.
///
/// Returns `None` if the quoting is malformed.
pub fn split_command_line(command_line: &str) -> Option<Vec<String>> {
    shlex::split(command_line)
}

/// Adapts the program name at the start of `cmd` to the host, i.e. appends `.exe` on Windows.
pub fn normalize_binary_cmd(cmd: &str) -> String {
    if cfg!(windows) {
        let (program, rest) = cmd.split_once(' ').unwrap_or((cmd, ""));
        let mut normalized = program.to_string();
        if !normalized.ends_with(".exe") {
            normalized.push_str(".exe");
        }
        if !rest.is_empty() {
            normalized.push(' ');
            normalized.push_str(rest);
        }
        normalized
    } else {
        cmd.to_string()
    }
}
