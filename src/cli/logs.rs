//! CLI handler for viewing logs.
//!
//! This module handles terminal presentation.
//! Core business logic is delegated to the `logs` module.

use crate::config::Config;
use crate::logs::{self, LogsOptions};
use anyhow::Result;

use super::args::LogsCliArgs;

pub fn handle_logs_command(config: &Config, args: LogsCliArgs) -> Result<()> {
    let options = LogsOptions::new(args.lines);
    let result = logs::get_logs(&config.logging, &options)?;

    println!("=== Application Logs (last {} lines) ===\n", args.lines);

    if result.lines.is_empty() {
        println!("No application logs found in {}.", result.path);
    } else {
        for line in &result.lines {
            println!("{}", line);
        }
    }

    Ok(())
}
