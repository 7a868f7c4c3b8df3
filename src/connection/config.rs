//! Per-run connection settings.
//!
//! Derived once from [`Config`] and shared read-only by every session.

use std::path::PathBuf;
use std::time::Duration;

use super::{ConnectionError, ConnectionResult};
use crate::config::Config;

/// Settings every connection reads
#[derive(Clone)]
pub struct ConnectionConfig {
    /// ssh client program
    pub ssh_executable: String,
    /// sftp client program
    pub sftp_executable: String,
    /// Remote login user
    pub remote_user: String,
    /// Identity file, with `~` and variables expanded
    pub private_key_file: Option<PathBuf>,
    /// Extra ssh arguments, already split shell-style
    pub extra_args: Vec<String>,
    /// Escalation target when a call does not name one
    pub sudo_user: String,
    /// Password answered at the escalation prompt
    pub sudo_password: Option<String>,
    /// Bound on each wait for escalation prompt output
    pub timeout: Duration,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("ssh_executable", &self.ssh_executable)
            .field("sftp_executable", &self.sftp_executable)
            .field("remote_user", &self.remote_user)
            .field("private_key_file", &self.private_key_file)
            .field("extra_args", &self.extra_args)
            .field("sudo_user", &self.sudo_user)
            .field("sudo_password", &self.sudo_password.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            ssh_executable: "ssh".to_string(),
            sftp_executable: "sftp".to_string(),
            remote_user: "root".to_string(),
            private_key_file: None,
            extra_args: Vec::new(),
            sudo_user: "root".to_string(),
            sudo_password: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl ConnectionConfig {
    /// Derive connection settings from the run configuration.
    pub fn from_config(config: &Config) -> ConnectionResult<Self> {
        let extra_args = shell_words::split(&config.ssh_args).map_err(|e| {
            ConnectionError::InvalidConfig(format!("ssh_args '{}': {}", config.ssh_args, e))
        })?;

        Ok(Self {
            ssh_executable: config.ssh_executable.clone(),
            sftp_executable: config.sftp_executable.clone(),
            remote_user: config.remote_user.clone(),
            private_key_file: config.private_key_file.as_deref().map(expand_path),
            extra_args,
            sudo_user: config.sudo_user.clone(),
            sudo_password: None,
            timeout: config.timeout_duration(),
        })
    }

    /// Set the escalation password
    pub fn with_sudo_password(mut self, password: impl Into<String>) -> Self {
        self.sudo_password = Some(password.into());
        self
    }
}

/// Expand `~` and environment variables in a path
fn expand_path(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or_else(|_| path.into());
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_splits_args() {
        let config = Config {
            ssh_args: r#"-o ControlPath="/tmp/cm %h" -C"#.to_string(),
            private_key_file: Some("/keys/id_ed25519".to_string()),
            timeout: 3,
            ..Config::default()
        };
        let conn = ConnectionConfig::from_config(&config).unwrap();
        assert_eq!(conn.extra_args, vec!["-o", "ControlPath=/tmp/cm %h", "-C"]);
        assert_eq!(
            conn.private_key_file,
            Some(PathBuf::from("/keys/id_ed25519"))
        );
        assert_eq!(conn.timeout, Duration::from_secs(3));
        assert!(conn.sudo_password.is_none());
    }

    #[test]
    fn test_unbalanced_quotes_rejected() {
        let config = Config {
            ssh_args: "-o 'broken".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            ConnectionConfig::from_config(&config),
            Err(ConnectionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_password_redacted_in_debug() {
        let conn = ConnectionConfig::default().with_sudo_password("hunter2");
        assert!(!format!("{:?}", conn).contains("hunter2"));
    }
}
