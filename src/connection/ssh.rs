//! SSH transport built on the external `ssh` and `sftp` clients.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::escalation::Escalation;
use super::process::{spawn_escalated, spawn_plain, RemoteProcess};
use super::{
    ensure_parent_dir, Connection, ConnectionConfig, ConnectionError, ConnectionResult,
    ExecuteOptions,
};

/// Direction of an sftp transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transfer {
    Put,
    Get,
}

/// A session against one host through the system ssh client
#[derive(Debug, Clone)]
pub struct SshConnection {
    host: String,
    port: Option<u16>,
    userhost: String,
    common_args: Vec<String>,
    config: Arc<ConnectionConfig>,
}

impl SshConnection {
    /// Prepare a session for `host`, computing the shared client arguments.
    pub fn new(host: impl Into<String>, port: Option<u16>, config: Arc<ConnectionConfig>) -> Self {
        let host = host.into();

        let mut common_args = vec!["-o".to_string(), "StrictHostKeyChecking=no".to_string()];
        if let Some(port) = port {
            common_args.push("-o".to_string());
            common_args.push(format!("Port={}", port));
        }
        if let Some(key) = &config.private_key_file {
            common_args.push("-o".to_string());
            common_args.push(format!("IdentityFile={}", key.display()));
        }
        common_args.extend(config.extra_args.iter().cloned());

        let userhost = format!("{}@{}", config.remote_user, host);
        debug!(host = %host, args = ?common_args, "Prepared ssh arguments");

        Self {
            host,
            port,
            userhost,
            common_args,
            config,
        }
    }

    /// Host name
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port override, if any
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Arguments shared by ssh and sftp invocations
    pub fn common_args(&self) -> &[String] {
        &self.common_args
    }

    /// Full ssh argument list for running `remote_command`.
    pub fn ssh_args(&self, remote_command: &str) -> Vec<String> {
        let mut args = vec!["-tt".to_string()];
        args.extend(self.common_args.iter().cloned());
        args.push(self.userhost.clone());
        args.push(remote_command.to_string());
        args
    }

    async fn sftp(&self, direction: Transfer, src: &str, dst: &str) -> ConnectionResult<()> {
        let verb = match direction {
            Transfer::Put => "put",
            Transfer::Get => "get",
        };
        let script = format!("{} {} {}\nquit\n", verb, sftp_quote(src), sftp_quote(dst));
        debug!(host = %self.host, %verb, %src, %dst, "Running sftp transfer");

        let mut child = Command::new(&self.config.sftp_executable)
            .args(&self.common_args)
            .arg(&self.userhost)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ConnectionError::SpawnFailed {
                host: self.host.clone(),
                message: e.to_string(),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(script.as_bytes())
                .await
                .map_err(|e| ConnectionError::execution(&self.host, e))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ConnectionError::execution(&self.host, e))?;

        if output.status.success() {
            Ok(())
        } else {
            let path = match direction {
                Transfer::Put => dst,
                Transfer::Get => src,
            };
            Err(ConnectionError::TransferFailed {
                path: path.to_string(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            })
        }
    }
}

/// Quote a path for an sftp batch line when it needs it.
fn sftp_quote(path: &str) -> String {
    if path.chars().any(|c| c.is_whitespace() || c == '"') {
        format!("\"{}\"", path.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        path.to_string()
    }
}

#[async_trait]
impl Connection for SshConnection {
    fn identifier(&self) -> &str {
        &self.userhost
    }

    async fn exec_command(
        &self,
        command: &str,
        options: &ExecuteOptions,
    ) -> ConnectionResult<RemoteProcess> {
        if !options.escalate {
            let mut cmd = Command::new(&self.config.ssh_executable);
            cmd.args(self.ssh_args(command));
            return spawn_plain(cmd, &self.host);
        }

        let user = options
            .escalate_user
            .as_deref()
            .unwrap_or(self.config.sudo_user.as_str());
        let escalation = Escalation::new(command, user);

        let mut cmd = Command::new(&self.config.ssh_executable);
        cmd.args(self.ssh_args(&escalation.command));
        spawn_escalated(
            cmd,
            &escalation,
            self.config.sudo_password.as_deref(),
            self.config.timeout,
            &self.host,
        )
        .await
    }

    async fn put_file(&self, local_path: &Path, remote_path: &str) -> ConnectionResult<()> {
        if !local_path.exists() {
            return Err(ConnectionError::FileNotFound(local_path.to_path_buf()));
        }
        self.sftp(Transfer::Put, &local_path.to_string_lossy(), remote_path)
            .await
    }

    async fn fetch_file(&self, remote_path: &str, local_path: &Path) -> ConnectionResult<()> {
        ensure_parent_dir(local_path)?;
        self.sftp(Transfer::Get, remote_path, &local_path.to_string_lossy())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config() -> Arc<ConnectionConfig> {
        Arc::new(ConnectionConfig {
            remote_user: "deploy".to_string(),
            private_key_file: Some(PathBuf::from("/keys/id")),
            extra_args: vec!["-C".to_string()],
            ..ConnectionConfig::default()
        })
    }

    #[test]
    fn test_argument_construction() {
        let conn = SshConnection::new("web1", Some(2222), config());
        assert_eq!(conn.identifier(), "deploy@web1");
        assert_eq!(
            conn.ssh_args("uptime"),
            vec![
                "-tt",
                "-o",
                "StrictHostKeyChecking=no",
                "-o",
                "Port=2222",
                "-o",
                "IdentityFile=/keys/id",
                "-C",
                "deploy@web1",
                "uptime",
            ]
        );
    }

    #[test]
    fn test_no_port_override() {
        let conn = SshConnection::new("web1", None, Arc::new(ConnectionConfig::default()));
        assert_eq!(
            conn.common_args(),
            &["-o".to_string(), "StrictHostKeyChecking=no".to_string()]
        );
    }

    #[test]
    fn test_sftp_quote() {
        assert_eq!(sftp_quote("/tmp/a"), "/tmp/a");
        assert_eq!(sftp_quote("/tmp/a b"), "\"/tmp/a b\"");
    }

    #[tokio::test]
    async fn test_put_missing_source_fails_fast() {
        let conn = SshConnection::new("web1", None, config());
        let err = conn
            .put_file(Path::new("/nonexistent/source"), "/tmp/dest")
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::FileNotFound(_)));
    }
}
