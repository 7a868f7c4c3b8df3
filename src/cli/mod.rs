//! CLI module for hostexec
//!
//! Argument parsing, configuration overrides and subcommand dispatch.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use hostexec::config::{Config, Transport};
use std::path::PathBuf;

/// hostexec - run commands across an inventory of hosts over ssh
#[derive(Parser, Debug, Clone)]
#[command(name = "hostexec")]
#[command(author = "Hostexec Contributors")]
#[command(version)]
#[command(about = "Run commands across an inventory of hosts over ssh", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Inventory: a comma separated host list, an executable or a file
    #[arg(short = 'i', long, global = true)]
    pub inventory: Option<String>,

    /// Number of parallel sessions
    #[arg(short = 'f', long, global = true)]
    pub forks: Option<usize>,

    /// Remote user to connect as
    #[arg(short = 'u', long = "user", global = true)]
    pub remote_user: Option<String>,

    /// Seconds to wait for each piece of remote output
    #[arg(short = 'T', long, global = true)]
    pub timeout: Option<u64>,

    /// Transport to use (ssh or local)
    #[arg(short = 'c', long, global = true)]
    pub transport: Option<Transport>,

    /// Private key file for ssh
    #[arg(long = "private-key", global = true)]
    pub private_key: Option<String>,

    /// Run commands through sudo
    #[arg(short = 's', long, global = true)]
    pub sudo: bool,

    /// User to sudo to (implies --sudo)
    #[arg(short = 'U', long = "sudo-user", global = true)]
    pub sudo_user: Option<String>,

    /// Sudo password
    #[arg(
        long = "sudo-pass",
        global = true,
        env = "HOSTEXEC_SUDO_PASS",
        hide_env_values = true
    )]
    pub sudo_pass: Option<String>,

    /// Prompt for the sudo password
    #[arg(short = 'K', long = "ask-sudo-pass", global = true)]
    pub ask_sudo_pass: bool,

    /// Restrict every selection to the hosts matched by this pattern
    #[arg(short = 'l', long, global = true)]
    pub limit: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run a command on every matched host
    Run(commands::run::RunArgs),

    /// Copy a local file to every matched host
    Put(commands::run::PutArgs),

    /// Copy a remote file from every matched host into <dest>/<host>/
    Fetch(commands::run::FetchArgs),

    /// List hosts matched by a pattern
    #[command(name = "list-hosts")]
    ListHosts(commands::inventory::ListHostsArgs),

    /// List inventory groups
    #[command(name = "list-groups")]
    ListGroups,

    /// Show the merged variables of a host
    #[command(name = "host-vars")]
    HostVars(commands::inventory::HostVarsArgs),

    /// Render a template against a host's variables
    Render(commands::inventory::RenderArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Whether commands should run through sudo
    pub fn escalate(&self) -> bool {
        self.sudo || self.sudo_user.is_some()
    }

    /// Apply command-line overrides on top of loaded configuration
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(inventory) = &self.inventory {
            config.host_list = inventory.clone();
        }
        if let Some(forks) = self.forks {
            config.forks = forks;
        }
        if let Some(user) = &self.remote_user {
            config.remote_user = user.clone();
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(transport) = self.transport {
            config.transport = transport;
        }
        if let Some(key) = &self.private_key {
            config.private_key_file = Some(key.clone());
        }
        if let Some(user) = &self.sudo_user {
            config.sudo_user = user.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "hostexec", "-i", "a,b", "-f", "2", "-u", "deploy", "-c", "local", "-U", "app",
            "run", "all", "uptime",
        ]);
        let mut config = Config::default();
        cli.apply_to(&mut config);

        assert_eq!(config.host_list, "a,b");
        assert_eq!(config.forks, 2);
        assert_eq!(config.remote_user, "deploy");
        assert_eq!(config.transport, Transport::Local);
        assert_eq!(config.sudo_user, "app");
        assert!(cli.escalate());
    }

    #[test]
    fn test_unknown_transport_rejected() {
        let result = Cli::try_parse_from(["hostexec", "-c", "telnet", "list-groups"]);
        assert!(result.is_err());
    }
}
