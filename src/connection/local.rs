//! Local connection module
//!
//! Runs commands on the control node through `sh -c` and transfers files by
//! copying them on the local filesystem.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

use super::escalation::Escalation;
use super::process::{spawn_escalated, spawn_plain, RemoteProcess};
use super::{
    ensure_parent_dir, Connection, ConnectionConfig, ConnectionError, ConnectionResult,
    ExecuteOptions,
};

/// Local connection for executing commands on the current host
#[derive(Debug, Clone)]
pub struct LocalConnection {
    /// Inventory name this connection stands in for
    identifier: String,
    config: Arc<ConnectionConfig>,
}

impl LocalConnection {
    /// Create a local connection standing in for `host`
    pub fn new(host: impl Into<String>, config: Arc<ConnectionConfig>) -> Self {
        Self {
            identifier: host.into(),
            config,
        }
    }

    fn shell(command: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }

    async fn copy(&self, src: &Path, dst: &Path) -> ConnectionResult<()> {
        tokio::fs::copy(src, dst)
            .await
            .map(|_| ())
            .map_err(|e| ConnectionError::TransferFailed {
                path: dst.display().to_string(),
                stdout: String::new(),
                stderr: format!("failed to copy {}: {}", src.display(), e),
            })
    }
}

#[async_trait]
impl Connection for LocalConnection {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn exec_command(
        &self,
        command: &str,
        options: &ExecuteOptions,
    ) -> ConnectionResult<RemoteProcess> {
        debug!(host = %self.identifier, command = %command, "Executing local command");

        if !options.escalate {
            return spawn_plain(Self::shell(command), &self.identifier);
        }

        let user = options
            .escalate_user
            .as_deref()
            .unwrap_or(self.config.sudo_user.as_str());
        let escalation = Escalation::new(command, user);
        spawn_escalated(
            Self::shell(&escalation.command),
            &escalation,
            self.config.sudo_password.as_deref(),
            self.config.timeout,
            &self.identifier,
        )
        .await
    }

    async fn put_file(&self, local_path: &Path, remote_path: &str) -> ConnectionResult<()> {
        if !local_path.exists() {
            return Err(ConnectionError::FileNotFound(local_path.to_path_buf()));
        }
        debug!(src = %local_path.display(), dst = %remote_path, "Copying file locally");
        self.copy(local_path, Path::new(remote_path)).await
    }

    async fn fetch_file(&self, remote_path: &str, local_path: &Path) -> ConnectionResult<()> {
        ensure_parent_dir(local_path)?;
        debug!(src = %remote_path, dst = %local_path.display(), "Copying file locally");
        self.copy(Path::new(remote_path), local_path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> LocalConnection {
        LocalConnection::new("localhost", Arc::new(ConnectionConfig::default()))
    }

    #[tokio::test]
    async fn test_execute_simple() {
        let result = conn()
            .execute("echo hello", &ExecuteOptions::new())
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_execute_failure() {
        let result = conn()
            .execute("echo oops >&2; exit 7", &ExecuteOptions::new())
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, 7);
        assert_eq!(result.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_put_and_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.txt");
        std::fs::write(&src, "payload").unwrap();

        let dst = dir.path().join("dst.txt");
        let conn = conn();
        conn.put_file(&src, &dst.to_string_lossy()).await.unwrap();
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "payload");

        let back = dir.path().join("back.txt");
        conn.fetch_file(&dst.to_string_lossy(), &back).await.unwrap();
        assert_eq!(std::fs::read_to_string(&back).unwrap(), "payload");
    }

    #[tokio::test]
    async fn test_transfer_errors() {
        let dir = tempfile::tempdir().unwrap();
        let conn = conn();

        let err = conn
            .put_file(&dir.path().join("missing"), "/tmp/x")
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::FileNotFound(_)));

        let err = conn
            .fetch_file("/etc/hostname", &dir.path().join("no/such/dir/file"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::FileNotFound(_)));

        let err = conn
            .fetch_file(
                &dir.path().join("absent").to_string_lossy(),
                &dir.path().join("out"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::TransferFailed { .. }));
    }
}
