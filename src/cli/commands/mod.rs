//! Subcommands module for hostexec CLI
//!
//! This module contains all the subcommand implementations.

pub mod inventory;
pub mod run;

use crate::cli::output::OutputFormatter;
use crate::cli::{Cli, Commands};
use anyhow::{Context, Result};
use hostexec::config::Config;
use hostexec::connection::ConnectionConfig;
use hostexec::inventory::Inventory;
use std::io::{self, BufRead, Write};
use tracing::debug;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration after file, environment and flag overrides
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
    /// Limit pattern
    pub limit: Option<String>,
    /// Run commands through sudo
    pub escalate: bool,
    /// Explicit sudo user from the command line
    pub sudo_user: Option<String>,
    /// Sudo password, if one was supplied
    pub sudo_password: Option<String>,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &Cli, config: Config, output: OutputFormatter) -> Result<Self> {
        let sudo_password = match (&cli.sudo_pass, cli.ask_sudo_pass) {
            (Some(password), _) => Some(password.clone()),
            (None, true) => Some(
                prompt_password("sudo password: ").context("failed to read sudo password")?,
            ),
            (None, false) => None,
        };

        Ok(Self {
            config,
            output,
            limit: cli.limit.clone(),
            escalate: cli.escalate(),
            sudo_user: cli.sudo_user.clone(),
            sudo_password,
        })
    }

    /// Load the inventory and apply `--limit`
    pub fn inventory(&self) -> hostexec::Result<Inventory> {
        let mut inventory = Inventory::from_config(&self.config)?;
        if let Some(limit) = &self.limit {
            let names = inventory.list_hosts(limit);
            debug!(limit = %limit, hosts = names.len(), "Restricting inventory");
            inventory.restrict_to(names);
        }
        Ok(inventory)
    }

    /// Session settings, including the sudo password if supplied
    pub fn connection_config(&self) -> hostexec::Result<ConnectionConfig> {
        let mut connection = ConnectionConfig::from_config(&self.config)?;
        if let Some(password) = &self.sudo_password {
            connection = connection.with_sudo_password(password.clone());
        }
        Ok(connection)
    }
}

/// Trait for runnable commands
#[async_trait::async_trait]
pub trait Runnable {
    /// Execute the command, returning the process exit code
    async fn execute(&self, ctx: &CommandContext) -> Result<i32>;
}

/// Dispatch the parsed subcommand
pub async fn dispatch(cli: &Cli, ctx: &CommandContext) -> Result<i32> {
    match &cli.command {
        Commands::Run(args) => args.execute(ctx).await,
        Commands::Put(args) => args.execute(ctx).await,
        Commands::Fetch(args) => args.execute(ctx).await,
        Commands::ListHosts(args) => args.execute(ctx).await,
        Commands::ListGroups => inventory::list_groups(ctx),
        Commands::HostVars(args) => args.execute(ctx).await,
        Commands::Render(args) => args.execute(ctx).await,
    }
}

/// Read a password from the terminal with echo disabled.
fn prompt_password(prompt: &str) -> io::Result<String> {
    use nix::sys::termios::{tcgetattr, tcsetattr, LocalFlags, SetArg};

    let stdin = io::stdin();
    eprint!("{}", prompt);
    io::stderr().flush()?;

    // Not a terminal: read the line as is.
    let original = tcgetattr(&stdin).ok();
    if let Some(original) = &original {
        let mut silent = original.clone();
        silent.local_flags.remove(LocalFlags::ECHO);
        silent.local_flags.insert(LocalFlags::ECHONL);
        tcsetattr(&stdin, SetArg::TCSANOW, &silent).map_err(io::Error::from)?;
    }

    let mut line = String::new();
    let read = stdin.lock().read_line(&mut line);

    if let Some(original) = &original {
        tcsetattr(&stdin, SetArg::TCSANOW, original).map_err(io::Error::from)?;
    }
    read?;

    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
