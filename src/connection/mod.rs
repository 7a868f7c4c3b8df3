//! Connection layer for remote host communication.
//!
//! This module provides a unified interface for executing commands and
//! transferring files on one host. All transports implement the
//! [`Connection`] trait.
//!
//! # Supported Transports
//!
//! - **SSH**: drives the external `ssh` and `sftp` clients; hostexec owns
//!   argument construction, the escalation handshake and result handling
//! - **Local**: direct execution on the control node
//!
//! A connection is built per (host, port) for one operation and is never
//! shared between hosts.
//!
//! # Example
//!
//! ```rust,ignore
//! use hostexec::connection::{connect, ConnectionConfig, ExecuteOptions};
//!
//! let config = Arc::new(ConnectionConfig::from_config(&cfg)?);
//! let conn = connect(cfg.transport, "web1", Some(22), config);
//! let result = conn
//!     .execute("systemctl restart app", &ExecuteOptions::new().with_escalation(None))
//!     .await?;
//! println!("{}", result.stdout);
//! ```

pub mod config;
pub mod escalation;
pub mod local;
pub mod process;
pub mod ssh;

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

pub use config::ConnectionConfig;
pub use escalation::{await_prompt, handshake, Escalation};
pub use local::LocalConnection;
pub use process::RemoteProcess;
pub use ssh::SshConnection;

use crate::config::Transport;

/// Errors that can occur during connection operations.
///
/// Every variant names the host or path it concerns.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The transport program could not be started.
    #[error("failed to spawn transport for {host}: {message}")]
    SpawnFailed { host: String, message: String },

    /// No escalation prompt arrived within one wait.
    #[error("{host}: timed out waiting for sudo password prompt")]
    PromptTimeout { host: String },

    /// Output closed before the escalation prompt appeared.
    #[error("{host}: connection closed waiting for sudo password prompt")]
    PromptClosed { host: String },

    /// Reading from or writing to the transport failed.
    #[error("{host}: {message}")]
    ExecutionFailed { host: String, message: String },

    /// Local side of a transfer is missing.
    #[error("file or directory does not exist: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The transfer client reported failure.
    #[error("failed to transfer file {path}:\n{stdout}\n{stderr}")]
    TransferFailed {
        path: String,
        stdout: String,
        stderr: String,
    },

    /// Configuration is invalid or incomplete.
    #[error("invalid connection configuration: {0}")]
    InvalidConfig(String),
}

impl ConnectionError {
    pub(crate) fn execution(host: &str, err: impl std::fmt::Display) -> Self {
        Self::ExecutionFailed {
            host: host.to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type for connection operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// The result of executing a command on a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    /// Exit code of the command (0 typically indicates success).
    pub exit_code: i32,
    /// Content written to standard output.
    pub stdout: String,
    /// Content written to standard error.
    pub stderr: String,
    /// Convenience flag: `true` if `exit_code == 0`.
    pub success: bool,
}

impl CommandResult {
    /// Create a new successful command result
    pub fn success(stdout: String, stderr: String) -> Self {
        Self {
            exit_code: 0,
            stdout,
            stderr,
            success: true,
        }
    }

    /// Create a new failed command result
    pub fn failure(exit_code: i32, stdout: String, stderr: String) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            success: false,
        }
    }

    /// Get the combined output (stdout + stderr)
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Options for command execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Run command with privilege escalation
    pub escalate: bool,
    /// User to escalate to (defaults to the configured sudo user)
    pub escalate_user: Option<String>,
}

impl ExecuteOptions {
    /// Create new execute options
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable privilege escalation
    pub fn with_escalation(mut self, user: Option<String>) -> Self {
        self.escalate = true;
        self.escalate_user = user;
        self
    }
}

/// The connection trait that all transports implement
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the connection identifier (`user@host` or host name)
    fn identifier(&self) -> &str;

    /// Start a command and return its live handles.
    ///
    /// With escalation and a configured password the escalation prompt has
    /// already been answered when this returns.
    async fn exec_command(
        &self,
        command: &str,
        options: &ExecuteOptions,
    ) -> ConnectionResult<RemoteProcess>;

    /// Run a command to completion.
    async fn execute(
        &self,
        command: &str,
        options: &ExecuteOptions,
    ) -> ConnectionResult<CommandResult> {
        let process = self.exec_command(command, options).await?;
        process.wait_with_output().await
    }

    /// Copy a local file to the host
    async fn put_file(&self, local_path: &Path, remote_path: &str) -> ConnectionResult<()>;

    /// Copy a file from the host to a local path
    async fn fetch_file(&self, remote_path: &str, local_path: &Path) -> ConnectionResult<()>;

    /// Close the connection
    async fn close(&self) -> ConnectionResult<()> {
        Ok(())
    }
}

/// Build the connection for `host` over `transport`.
pub fn connect(
    transport: Transport,
    host: &str,
    port: Option<u16>,
    config: Arc<ConnectionConfig>,
) -> Box<dyn Connection> {
    match transport {
        Transport::Ssh => Box::new(SshConnection::new(host, port, config)),
        Transport::Local => Box::new(LocalConnection::new(host, config)),
    }
}

/// Check that the directory a local destination will be written into exists.
pub(crate) fn ensure_parent_dir(path: &Path) -> ConnectionResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if parent.is_dir() {
        Ok(())
    } else {
        Err(ConnectionError::FileNotFound(parent.to_path_buf()))
    }
}
