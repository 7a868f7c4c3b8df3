//! # hostexec - agentless command execution across an inventory of hosts
//!
//! hostexec resolves a host selection pattern against an inventory, renders
//! a command template with each host's variables and runs the result on
//! every host through the system `ssh` client, answering sudo password
//! prompts when asked to escalate.
//!
//! ## Architecture Overview
//!
//! ```text
//!   pattern ──► Inventory::select_hosts ──► [Host, ...]
//!                                              │
//!                   Inventory::host_variables ◄┘
//!                              │
//!                              ▼
//!                   template::render(command, vars)
//!                              │
//!                              ▼
//!              Connection::exec_command / put_file / fetch_file
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use hostexec::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> hostexec::Result<()> {
//!     let config = Config::load(None)?;
//!     let inventory = Inventory::from_config(&config)?;
//!     let connection = ConnectionConfig::from_config(&config)?;
//!
//!     let summary = Runner::new(&inventory, &config, connection)
//!         .run("webservers:!web3", &Action::Command("uptime".into()))
//!         .await?;
//!
//!     for (host, result) in &summary.contacted {
//!         println!("{host}: {}", result.stdout.trim());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::config::{Config, Transport};
    pub use crate::connection::{
        connect, CommandResult, Connection, ConnectionConfig, ConnectionError, ExecuteOptions,
        RemoteProcess,
    };
    pub use crate::error::{Error, Result};
    pub use crate::inventory::{Group, Host, Inventory, InventorySource, Restriction};
    pub use crate::runner::{Action, RunSummary, Runner};
    pub use crate::template::{render, template, ExpressionRenderer, MiniJinjaRenderer};
    pub use crate::vars::Variables;
}

/// Configuration loaded from defaults, a file and the environment.
pub mod config;

/// Transports: external ssh/sftp and local execution, with sudo handshake.
pub mod connection;

/// Crate-level error type.
pub mod error;

/// Hosts, groups, selection patterns and variable resolution.
pub mod inventory;

/// Select, render and execute across a fork pool.
pub mod runner;

/// `$name` / `${path}` substitution and the brace-expression seam.
pub mod template;

/// Variable mappings.
pub mod vars;

pub use error::{Error, Result};

/// Returns the current version of hostexec.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
