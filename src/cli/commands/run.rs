//! Execution commands - run, put and fetch
//!
//! Each one builds a [`Runner`] over the loaded inventory and prints the
//! resulting summary.

use super::{CommandContext, Runnable};
use anyhow::Result;
use clap::Args;
use hostexec::runner::{Action, Runner};
use hostexec::template::MiniJinjaRenderer;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for run command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Host pattern, e.g. `webservers:!web3`
    pub pattern: String,

    /// Command template
    pub command: String,
}

/// Arguments for put command
#[derive(Args, Debug, Clone)]
pub struct PutArgs {
    /// Host pattern
    pub pattern: String,

    /// Local source file
    pub src: PathBuf,

    /// Remote destination (templated per host)
    pub dest: String,
}

/// Arguments for fetch command
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Host pattern
    pub pattern: String,

    /// Remote source (templated per host)
    pub src: String,

    /// Local destination directory
    pub dest: PathBuf,
}

async fn run_action(ctx: &CommandContext, pattern: &str, action: Action) -> Result<i32> {
    let inventory = ctx.inventory()?;
    let connection = ctx.connection_config()?;

    let mut runner = Runner::new(&inventory, &ctx.config, connection)
        .with_engine(Arc::new(MiniJinjaRenderer::new()));
    if ctx.escalate {
        runner = runner.with_escalation(ctx.sudo_user.clone());
    }

    let summary = runner.run(pattern, &action).await?;
    ctx.output.summary(&summary);
    Ok(summary.exit_code())
}

#[async_trait::async_trait]
impl Runnable for RunArgs {
    async fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        run_action(ctx, &self.pattern, Action::Command(self.command.clone())).await
    }
}

#[async_trait::async_trait]
impl Runnable for PutArgs {
    async fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        let action = Action::Put {
            src: self.src.clone(),
            dest: self.dest.clone(),
        };
        run_action(ctx, &self.pattern, action).await
    }
}

#[async_trait::async_trait]
impl Runnable for FetchArgs {
    async fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        let action = Action::Fetch {
            src: self.src.clone(),
            dest: self.dest.clone(),
        };
        run_action(ctx, &self.pattern, action).await
    }
}
