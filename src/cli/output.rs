//! Output formatting for hostexec
//!
//! Colored human output, or one JSON document per command with `--json`.

use colored::Colorize;
use hostexec::connection::CommandResult;
use hostexec::runner::RunSummary;
use serde::Serialize;
use std::io::{self, Write};

/// Output formatter for human and JSON modes
pub struct OutputFormatter {
    /// Use colored output
    use_color: bool,
    /// JSON output mode
    json_mode: bool,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(use_color: bool, json_mode: bool) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();
        colored::control::set_override(use_color);

        Self {
            use_color,
            json_mode,
        }
    }

    /// Whether JSON output was requested
    pub fn is_json(&self) -> bool {
        self.json_mode
    }

    /// Print any serializable value as pretty JSON
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{}", text),
            Err(e) => self.error(&format!("failed to encode output: {}", e)),
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.json_mode {
            let err = serde_json::json!({
                "type": "error",
                "message": message
            });
            eprintln!("{}", err);
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "ERROR:".red().bold(), message);
        } else {
            eprintln!("ERROR: {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.json_mode {
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "WARNING:".yellow().bold(), message);
        } else {
            eprintln!("WARNING: {}", message);
        }
    }

    /// Print a titled list of items
    pub fn list(&self, title: &str, items: &[String]) {
        if self.json_mode {
            self.json(items);
            return;
        }

        if self.use_color {
            println!("  {} ({}):", title.bright_white().bold(), items.len());
        } else {
            println!("  {} ({}):", title, items.len());
        }
        for item in items {
            println!("    {}", item);
        }
    }

    /// Print raw text
    pub fn text(&self, text: &str) {
        if self.json_mode {
            self.json(text);
        } else {
            println!("{}", text);
        }
    }

    /// Print the per-host results of a run
    pub fn summary(&self, summary: &RunSummary) {
        if self.json_mode {
            self.json(summary);
            return;
        }

        for (host, result) in &summary.contacted {
            self.host_result(host, result);
        }
        for (host, message) in &summary.dark {
            self.host_unreachable(host, message);
        }
        self.flush();
    }

    fn host_result(&self, host: &str, result: &CommandResult) {
        let status = if result.success {
            "success".green().to_string()
        } else {
            "FAILED".red().bold().to_string()
        };
        println!("{} | {} | rc={} >>", host.bold(), status, result.exit_code);

        let stdout = result.stdout.trim_end();
        if !stdout.is_empty() {
            println!("{}", stdout);
        }
        let stderr = result.stderr.trim_end();
        if !stderr.is_empty() {
            eprintln!("{}", stderr.yellow());
        }
    }

    fn host_unreachable(&self, host: &str, message: &str) {
        println!(
            "{} | {} >> {}",
            host.bold(),
            "UNREACHABLE".red().bold(),
            message
        );
    }

    /// Flush stdout
    pub fn flush(&self) {
        let _ = io::stdout().flush();
    }
}
