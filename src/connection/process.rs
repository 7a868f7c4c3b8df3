//! Spawning transport processes and collecting their output.

use std::os::fd::AsRawFd;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStdin, Command};
use tracing::debug;

use super::escalation::{handshake, Escalation};
use super::{CommandResult, ConnectionError, ConnectionResult};

/// Boxed output stream of a running command.
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// A command running on a host.
///
/// In the escalation path stderr is merged into `stdout` so the prompt can be
/// seen, and `stderr` is an empty stream.
pub struct RemoteProcess {
    host: String,
    child: Child,
    /// Input to the remote command
    pub stdin: Option<ChildStdin>,
    /// Output of the remote command
    pub stdout: OutputStream,
    /// Error output of the remote command
    pub stderr: OutputStream,
}

impl std::fmt::Debug for RemoteProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteProcess")
            .field("host", &self.host)
            .field("pid", &self.child.id())
            .finish()
    }
}

impl RemoteProcess {
    /// Host this process runs against
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Close stdin, drain both streams and wait for exit.
    pub async fn wait_with_output(mut self) -> ConnectionResult<CommandResult> {
        drop(self.stdin.take());

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let (out, err) = tokio::join!(
            self.stdout.read_to_end(&mut stdout),
            self.stderr.read_to_end(&mut stderr)
        );
        out.map_err(|e| ConnectionError::execution(&self.host, e))?;
        err.map_err(|e| ConnectionError::execution(&self.host, e))?;

        let status = self
            .child
            .wait()
            .await
            .map_err(|e| ConnectionError::execution(&self.host, e))?;

        let exit_code = status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&stdout).to_string();
        let stderr = String::from_utf8_lossy(&stderr).to_string();
        debug!(host = %self.host, exit_code, "Command completed");

        if status.success() {
            Ok(CommandResult::success(stdout, stderr))
        } else {
            Ok(CommandResult::failure(exit_code, stdout, stderr))
        }
    }
}

/// Spawn `cmd` with separate stdin, stdout and stderr pipes.
pub(crate) fn spawn_plain(mut cmd: Command, host: &str) -> ConnectionResult<RemoteProcess> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| spawn_error(host, e))?;
    let stdin = child.stdin.take();
    let stdout: OutputStream = match child.stdout.take() {
        Some(out) => Box::new(out),
        None => Box::new(tokio::io::empty()),
    };
    let stderr: OutputStream = match child.stderr.take() {
        Some(err) => Box::new(err),
        None => Box::new(tokio::io::empty()),
    };

    Ok(RemoteProcess {
        host: host.to_string(),
        child,
        stdin,
        stdout,
        stderr,
    })
}

/// Spawn an escalated command with stdout and stderr merged into one pipe.
///
/// When `password` is set the prompt handshake runs before returning;
/// otherwise the process is handed back untouched.
pub(crate) async fn spawn_escalated(
    mut cmd: Command,
    escalation: &Escalation,
    password: Option<&str>,
    per_wait: Duration,
    host: &str,
) -> ConnectionResult<RemoteProcess> {
    let (read_end, write_end) = nix::unistd::pipe().map_err(|e| spawn_error(host, e))?;
    for fd in [&read_end, &write_end] {
        nix::fcntl::fcntl(
            fd.as_raw_fd(),
            nix::fcntl::FcntlArg::F_SETFD(nix::fcntl::FdFlag::FD_CLOEXEC),
        )
        .map_err(|e| spawn_error(host, e))?;
    }

    let write_out = std::fs::File::from(write_end);
    let write_err = write_out.try_clone().map_err(|e| spawn_error(host, e))?;

    cmd.stdin(Stdio::piped())
        .stdout(Stdio::from(write_out))
        .stderr(Stdio::from(write_err))
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| spawn_error(host, e))?;
    // Release the parent's copies of the write end so EOF can arrive
    drop(cmd);

    let mut reader =
        tokio::net::unix::pipe::Receiver::from_file(std::fs::File::from(read_end))
            .map_err(|e| spawn_error(host, e))?;
    let mut stdin = child.stdin.take();

    if let (Some(password), Some(writer)) = (password, stdin.as_mut()) {
        handshake(
            &mut reader,
            writer,
            &escalation.prompt,
            password,
            per_wait,
            host,
        )
        .await?;
    }

    Ok(RemoteProcess {
        host: host.to_string(),
        child,
        stdin,
        stdout: Box::new(reader),
        stderr: Box::new(tokio::io::empty()),
    })
}

fn spawn_error(host: &str, err: impl std::fmt::Display) -> ConnectionError {
    ConnectionError::SpawnFailed {
        host: host.to_string(),
        message: err.to_string(),
    }
}
