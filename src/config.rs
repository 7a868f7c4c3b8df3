//! Configuration module for hostexec
//!
//! Handles loading configuration from:
//! - Default values
//! - An optional configuration file (TOML, YAML or JSON)
//! - Environment variables
//!
//! Command-line flags are applied on top by the binary. The resulting
//! [`Config`] is passed by reference into the inventory and connection
//! constructors; nothing else reads the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("unknown transport '{0}' (expected 'ssh' or 'local')")]
    UnknownTransport(String),
}

/// How commands reach a host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// External `ssh`/`sftp` clients
    #[default]
    Ssh,
    /// Run on the control node itself
    Local,
}

impl std::str::FromStr for Transport {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ssh" => Ok(Self::Ssh),
            "local" => Ok(Self::Local),
            other => Err(ConfigError::UnknownTransport(other.to_string())),
        }
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ssh => write!(f, "ssh"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inventory source: file, executable or inline `host,host`
    pub host_list: String,

    /// Module search path
    pub module_path: PathBuf,

    /// Temporary directory on managed hosts
    pub remote_tmp: String,

    /// Default module name
    pub module_name: String,

    /// Default host pattern
    pub pattern: String,

    /// Number of concurrent sessions
    pub forks: usize,

    /// Default module arguments
    pub module_args: String,

    /// Per-wait timeout in seconds
    pub timeout: u64,

    /// Poll interval in seconds for background jobs
    pub poll_interval: u64,

    /// Remote login user
    pub remote_user: String,

    /// Private key passed to the transport
    pub private_key_file: Option<String>,

    /// Escalation target user
    pub sudo_user: String,

    /// Default remote port
    pub remote_port: u16,

    /// Transport to use
    pub transport: Transport,

    /// Extra arguments appended to every ssh invocation
    pub ssh_args: String,

    /// ssh client program
    pub ssh_executable: String,

    /// sftp client program
    pub sftp_executable: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host_list: "/etc/hostexec/hosts".to_string(),
            module_path: PathBuf::from("/usr/share/hostexec"),
            remote_tmp: "$HOME/.hostexec/tmp".to_string(),
            module_name: "command".to_string(),
            pattern: "*".to_string(),
            forks: 5,
            module_args: String::new(),
            timeout: 10,
            poll_interval: 15,
            remote_user: "root".to_string(),
            private_key_file: None,
            sudo_user: "root".to_string(),
            remote_port: 22,
            transport: Transport::Ssh,
            ssh_args: String::new(),
            ssh_executable: "ssh".to_string(),
            sftp_executable: "sftp".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// An explicit path must exist. Without one, `HOSTEXEC_CONFIG` and then
    /// `~/.hostexec.toml` are tried if present.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_file(config_path) {
            Some(path) => Self::from_file(&path)?,
            None => Config::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn find_config_file(explicit_path: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit_path {
            return Some(path.to_path_buf());
        }

        if let Ok(env_config) = std::env::var("HOSTEXEC_CONFIG") {
            return Some(PathBuf::from(env_config));
        }

        dirs::home_dir()
            .map(|home| home.join(".hostexec.toml"))
            .filter(|path| path.exists())
    }

    /// Load from a specific file over the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let parse_error = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };

        // Determine format based on extension
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string())),
            "json" => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string())),
            "toml" => toml::from_str(&content).map_err(|e| parse_error(e.to_string())),
            _ => toml::from_str(&content)
                .or_else(|_| serde_yaml::from_str(&content))
                .map_err(|e| parse_error(e.to_string())),
        }
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup. Values that fail to
    /// parse are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(value: Option<String>, slot: &mut T) {
            if let Some(v) = value.and_then(|v| v.trim().parse().ok()) {
                *slot = v;
            }
        }

        if let Some(hosts) = lookup("HOSTEXEC_HOSTS") {
            self.host_list = hosts;
        }
        if let Some(library) = lookup("HOSTEXEC_LIBRARY") {
            self.module_path = PathBuf::from(library);
        }
        if let Some(tmp) = lookup("HOSTEXEC_REMOTE_TMP") {
            self.remote_tmp = tmp;
        }
        parsed(lookup("HOSTEXEC_FORKS"), &mut self.forks);
        if let Some(args) = lookup("HOSTEXEC_MODULE_ARGS") {
            self.module_args = args;
        }
        parsed(lookup("HOSTEXEC_TIMEOUT"), &mut self.timeout);
        parsed(lookup("HOSTEXEC_POLL_INTERVAL"), &mut self.poll_interval);
        if let Some(user) = lookup("HOSTEXEC_REMOTE_USER") {
            self.remote_user = user;
        }
        if let Some(file) = lookup("HOSTEXEC_PRIVATE_KEY_FILE") {
            self.private_key_file = Some(file);
        }
        if let Some(user) = lookup("HOSTEXEC_SUDO_USER") {
            self.sudo_user = user;
        }
        parsed(lookup("HOSTEXEC_REMOTE_PORT"), &mut self.remote_port);
        parsed(lookup("HOSTEXEC_TRANSPORT"), &mut self.transport);
        if let Some(args) = lookup("HOSTEXEC_SSH_ARGS") {
            self.ssh_args = args;
        }
    }

    /// Per-wait timeout as a duration
    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout)
    }
}
