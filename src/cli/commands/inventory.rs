//! Inventory commands - list hosts and groups, show variables, render
//!
//! This module implements the `list-hosts`, `list-groups`, `host-vars` and
//! `render` subcommands.

use super::{CommandContext, Runnable};
use anyhow::{Context, Result};
use clap::Args;
use hostexec::template::{self, MiniJinjaRenderer};

/// Arguments for list-hosts command
#[derive(Args, Debug, Clone)]
pub struct ListHostsArgs {
    /// Host pattern (defaults to the configured pattern)
    pub pattern: Option<String>,
}

/// Arguments for host-vars command
#[derive(Args, Debug, Clone)]
pub struct HostVarsArgs {
    /// Host name
    pub host: String,
}

/// Arguments for render command
#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Host whose variables are in scope
    pub host: String,

    /// Template text
    pub template: String,
}

#[async_trait::async_trait]
impl Runnable for ListHostsArgs {
    async fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        let inventory = ctx.inventory()?;
        let pattern = self.pattern.as_deref().unwrap_or(&ctx.config.pattern);
        let hosts = inventory.list_hosts(pattern);
        ctx.output.list("hosts", &hosts);
        Ok(0)
    }
}

/// `list-groups`
pub fn list_groups(ctx: &CommandContext) -> Result<i32> {
    let inventory = ctx.inventory()?;
    ctx.output.list("groups", &inventory.list_groups());
    Ok(0)
}

#[async_trait::async_trait]
impl Runnable for HostVarsArgs {
    async fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        let inventory = ctx.inventory()?;
        let vars = inventory
            .host_variables(&self.host)
            .await
            .map_err(hostexec::Error::from)?;

        if ctx.output.is_json() {
            ctx.output.json(&vars);
        } else {
            let text = serde_yaml::to_string(&vars).context("failed to encode variables")?;
            ctx.output.text(text.trim_end());
        }
        Ok(0)
    }
}

#[async_trait::async_trait]
impl Runnable for RenderArgs {
    async fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        let inventory = ctx.inventory()?;
        let vars = inventory
            .host_variables(&self.host)
            .await
            .map_err(hostexec::Error::from)?;

        let engine = MiniJinjaRenderer::new();
        let rendered = template::template(&self.template, &vars, Some(&engine))
            .map_err(hostexec::Error::from)?;
        ctx.output.text(&rendered);
        Ok(0)
    }
}
