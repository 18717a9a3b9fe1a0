//! Runs the git binary as a child process.
//!
//! Output pipes are drained on helper threads so a chatty command can never
//! block on a full pipe while we poll it for completion. Polling lets the
//! runner notice cancellation and kill the child mid-flight.

use std::ffi::OsStr;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::context::Context;
use crate::error::{Error, Result};

const MIN_POLL: Duration = Duration::from_millis(1);
const MAX_POLL: Duration = Duration::from_millis(25);

/// How the child's standard streams are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdioMode {
    /// stdin is null, stdout and stderr are captured.
    Captured,
    /// All streams are inherited from this process (interactive commands).
    Attached,
}

/// Raw result of a git invocation that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// The command line, for diagnostics.
    pub command: String,
    /// Exit code, or -1 when terminated by a signal.
    pub exit_code: i32,
    /// Captured stdout (empty when attached), invalid UTF-8 replaced.
    pub stdout: String,
    /// Captured stderr (empty when attached).
    pub stderr: String,
}

impl CommandOutput {
    /// Whether git exited with status 0.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Turn a non-zero exit into [`Error::CommandFailed`], returning stdout otherwise.
    ///
    /// # Errors
    /// Returns `CommandFailed` carrying git's stderr when the exit code is non-zero.
    pub fn into_stdout(self) -> Result<String> {
        if self.success() {
            Ok(self.stdout)
        } else {
            Err(Error::CommandFailed {
                command: self.command,
                exit_code: self.exit_code,
                stderr: self.stderr,
            })
        }
    }
}

/// Run `program args...` in `cwd`, honouring cancellation from `ctx`.
///
/// A non-zero exit is *not* an error here; callers that care use
/// [`CommandOutput::into_stdout`].
///
/// # Errors
/// Returns `Cancelled` if the context fires before or during the run,
/// `Spawn` if the binary cannot be started, and `Io` if the output cannot
/// be read. Output that is not UTF-8 (file names, commit text) is decoded
/// lossily.
pub fn exec<S: AsRef<str>>(
    ctx: &Context,
    program: &OsStr,
    cwd: &Path,
    args: &[S],
    stdio: StdioMode,
) -> Result<CommandOutput> {
    let command = command_line(args);
    if ctx.is_cancelled() {
        return Err(Error::Cancelled { command });
    }

    let mut cmd = Command::new(program);
    cmd.args(args.iter().map(AsRef::as_ref))
        .current_dir(cwd)
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("LC_ALL", "C");

    match stdio {
        StdioMode::Captured => {
            // Nobody can answer an editor without a terminal.
            cmd.env("GIT_EDITOR", "true")
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
        }
        StdioMode::Attached => {
            cmd.stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        }
    }

    debug!(%command, cwd = %cwd.display(), "running git");

    let mut child = cmd.spawn().map_err(|source| Error::Spawn {
        command: command.clone(),
        source,
    })?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let mut poll = MIN_POLL;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if ctx.is_cancelled() {
            // Readers are left detached; they finish once the pipes close.
            let _ = child.kill();
            let _ = child.wait();
            warn!(%command, "git invocation cancelled, process killed");
            return Err(Error::Cancelled { command });
        }
        thread::sleep(poll);
        poll = (poll * 2).min(MAX_POLL);
    };

    let exit_code = status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&collect(stdout)?).into_owned();
    let stderr = String::from_utf8_lossy(&collect(stderr)?).into_owned();

    debug!(%command, exit_code, "git finished");

    Ok(CommandOutput {
        command,
        exit_code,
        stdout,
        stderr,
    })
}

fn command_line<S: AsRef<str>>(args: &[S]) -> String {
    let mut line = String::from("git");
    for arg in args {
        line.push(' ');
        line.push_str(arg.as_ref());
    }
    line
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>) -> Result<Vec<u8>> {
    let Some(handle) = handle else {
        return Ok(Vec::new());
    };
    let bytes = handle
        .join()
        .map_err(|_| std::io::Error::other("output reader thread panicked"))??;
    Ok(bytes)
}
