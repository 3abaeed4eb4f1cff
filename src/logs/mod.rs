//! Logging setup and log retrieval.
//!
//! Logs go to the console and to `{log_dir}/bot.log`. The same file backs
//! the `logs` CLI command and the `GET /logs` endpoint.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Install the console and file subscribers.
///
/// `RUST_LOG` overrides the level picked from `verbose`. Keep the returned
/// guard alive for the whole process or buffered lines are lost.
pub fn init_logging(verbose: bool, config: &LoggingConfig) -> Result<WorkerGuard> {
    let log_dir = config.dir()?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {log_dir:?}"))?;

    let file_appender = tracing_appender::rolling::never(&log_dir, &config.file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let log_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

/// Console-only logging for one-shot CLI commands.
pub fn init_console(verbose: bool) {
    let log_level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsResult {
    pub path: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogsOptions {
    /// Number of trailing lines to return
    pub lines: usize,
}

impl LogsOptions {
    pub fn new(lines: usize) -> Self {
        Self { lines }
    }
}

/// Last lines of the configured log file.
pub fn get_logs(config: &LoggingConfig, options: &LogsOptions) -> Result<LogsResult> {
    let path = config.file_path()?;
    Ok(LogsResult {
        lines: tail(&path, options.lines)?,
        path: path.to_string_lossy().to_string(),
    })
}

/// Last `lines` non-empty lines of `path`. A missing file has no lines.
pub fn tail(path: &Path, lines: usize) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = std::fs::File::open(path).with_context(|| format!("Failed to open {path:?}"))?;
    let mut window = VecDeque::with_capacity(lines);
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() || lines == 0 {
            continue;
        }
        if window.len() == lines {
            window.pop_front();
        }
        window.push_back(line);
    }
    Ok(window.into_iter().collect())
}
