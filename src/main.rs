//! hostexec - run commands across an inventory of hosts
//!
//! This is the main entry point for the hostexec CLI.

mod cli;

use anyhow::Result;
use cli::commands::{self, CommandContext};
use cli::output::OutputFormatter;
use cli::Cli;
use hostexec::config::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    if cli.verbosity() >= 2 {
        eprintln!("hostexec v{}", VERSION);
    }

    let exit_code = match run(&cli).await {
        Ok(code) => code,
        Err(err) => {
            OutputFormatter::new(!cli.no_color, cli.json).error(&format!("{:#}", err));
            exit_code_for(&err)
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: &Cli) -> Result<i32> {
    let config = load_config(cli)?;
    let output = OutputFormatter::new(!cli.no_color, cli.json);
    let ctx = CommandContext::new(cli, config, output)?;
    commands::dispatch(cli, &ctx).await
}

/// Load configuration and apply command-line overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).map_err(hostexec::Error::from)?;
    cli.apply_to(&mut config);
    Ok(config)
}

/// Map an error to the process exit status
fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<hostexec::Error>()
        .map_or(1, hostexec::Error::exit_code)
}

/// Initialize logging based on verbosity level
fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(verbosity >= 3))
        .with(env_filter)
        .init();
}
