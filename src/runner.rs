//! Pipeline driver: select hosts, resolve their variables, render the
//! command and run it on every host with bounded concurrency.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{Config, Transport};
use crate::connection::{connect, CommandResult, ConnectionConfig, ExecuteOptions};
use crate::error::{Error, Result};
use crate::inventory::{Host, Inventory};
use crate::template::{self, ExpressionRenderer};

/// What to do on each selected host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Run a command template
    Command(String),
    /// Copy a local file to a (templated) remote path
    Put { src: PathBuf, dest: String },
    /// Copy a (templated) remote path into `<dest>/<host>/<file name>`
    Fetch { src: String, dest: PathBuf },
}

/// Outcome of a run, keyed by host name
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Hosts that were reached, with their command results
    pub contacted: BTreeMap<String, CommandResult>,
    /// Hosts that could not be reached, with the reason
    pub dark: BTreeMap<String, String>,
}

impl RunSummary {
    /// Whether any reached host reported failure
    pub fn has_failures(&self) -> bool {
        self.contacted.values().any(|r| !r.success)
    }

    /// Whether any host was unreachable
    pub fn has_dark(&self) -> bool {
        !self.dark.is_empty()
    }

    /// CLI exit status: 3 with dark hosts, 2 with failed hosts, else 0.
    pub fn exit_code(&self) -> i32 {
        if self.has_dark() {
            3
        } else if self.has_failures() {
            2
        } else {
            0
        }
    }
}

/// Drives one action across the hosts of an inventory
pub struct Runner<'a> {
    inventory: &'a Inventory,
    transport: Transport,
    remote_port: u16,
    forks: usize,
    connection: Arc<ConnectionConfig>,
    options: ExecuteOptions,
    engine: Option<Arc<dyn ExpressionRenderer>>,
}

impl<'a> Runner<'a> {
    /// Create a runner using the transport, port and fork settings of
    /// `config`.
    pub fn new(inventory: &'a Inventory, config: &Config, connection: ConnectionConfig) -> Self {
        Self {
            inventory,
            transport: config.transport,
            remote_port: config.remote_port,
            forks: config.forks.max(1),
            connection: Arc::new(connection),
            options: ExecuteOptions::default(),
            engine: None,
        }
    }

    /// Run commands under privilege escalation
    pub fn with_escalation(mut self, user: Option<String>) -> Self {
        self.options = self.options.with_escalation(user);
        self
    }

    /// Render brace expressions with `engine`
    pub fn with_engine(mut self, engine: Arc<dyn ExpressionRenderer>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Override the number of concurrent sessions
    pub fn with_forks(mut self, forks: usize) -> Self {
        self.forks = forks.max(1);
        self
    }

    /// Run `action` on every host matched by `pattern`.
    pub async fn run(&self, pattern: &str, action: &Action) -> Result<RunSummary> {
        let hosts = self.inventory.select_hosts(pattern);
        if hosts.is_empty() {
            return Err(Error::NoHostsMatched(pattern.to_string()));
        }
        info!(pattern, hosts = hosts.len(), forks = self.forks, "Starting run");

        let tasks: Vec<_> = hosts
            .into_iter()
            .map(|host| async move {
                let outcome = self.run_host(host, action).await;
                (host.name.clone(), outcome)
            })
            .collect();
        let results: Vec<(String, std::result::Result<CommandResult, String>)> =
            stream::iter(tasks)
                .buffer_unordered(self.forks)
                .collect()
                .await;

        let mut summary = RunSummary::default();
        for (host, outcome) in results {
            match outcome {
                Ok(result) => {
                    summary.contacted.insert(host, result);
                }
                Err(message) => {
                    warn!(host = %host, error = %message, "Host unreachable");
                    summary.dark.insert(host, message);
                }
            }
        }
        Ok(summary)
    }

    async fn run_host(
        &self,
        host: &Host,
        action: &Action,
    ) -> std::result::Result<CommandResult, String> {
        let vars = self
            .inventory
            .host_variables(&host.name)
            .await
            .map_err(|e| e.to_string())?;
        let render = |text: &str| {
            template::template(text, &vars, self.engine.as_deref()).map_err(|e| e.to_string())
        };

        let port = host.port.or(Some(self.remote_port));
        let conn = connect(self.transport, &host.name, port, Arc::clone(&self.connection));

        let result = match action {
            Action::Command(command) => {
                let command = render(command.as_str())?;
                debug!(host = %host.name, command = %command, "Rendered command");
                conn.execute(&command, &self.options).await
            }
            Action::Put { src, dest } => {
                let dest = render(dest.as_str())?;
                conn.put_file(src, &dest)
                    .await
                    .map(|()| transferred(&src.display().to_string(), &dest))
            }
            Action::Fetch { src, dest } => {
                let src = render(src.as_str())?;
                let local = fetch_destination(dest, &host.name, &src);
                if let Some(parent) = local.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| e.to_string())?;
                }
                conn.fetch_file(&src, &local)
                    .await
                    .map(|()| transferred(&src, &local.display().to_string()))
            }
        };

        if let Err(e) = conn.close().await {
            warn!(host = %host.name, error = %e, "Failed to close connection");
        }
        result.map_err(|e| e.to_string())
    }
}

fn transferred(src: &str, dest: &str) -> CommandResult {
    CommandResult::success(format!("{} -> {}", src, dest), String::new())
}

/// `<dest>/<host>/<file name of src>`
pub fn fetch_destination(dest: &Path, host: &str, src: &str) -> PathBuf {
    let name = Path::new(src)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(src.trim_matches('/')));
    dest.join(host).join(name)
}
