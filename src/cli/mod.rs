use crate::config::Config;
use anyhow::{Context, Result};
use serde_json::Value;

pub mod args;
pub mod logs;
pub mod recordings;

pub use args::{Cli, CliCommand, LogsCliArgs, RecordingsCliArgs};
pub use logs::handle_logs_command;
pub use recordings::handle_recordings_command;

/// Ask the running service for its recorder status.
pub async fn handle_status_command(config: &Config) -> Result<()> {
    let url = format!("http://{}:{}/status", config.api.host, config.api.port);
    let response = reqwest::get(&url)
        .await
        .with_context(|| format!("Could not reach the service at {url}. Is it running?"))?
        .error_for_status()?;
    let status: Value = response.json().await.context("Invalid status response")?;

    println!("{}", format_status(&status));
    Ok(())
}

pub fn handle_config_command(config: &Config) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}

fn format_status(status: &Value) -> String {
    let field = |name: &str| -> String {
        match status.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "-".to_string(),
            Some(other) => other.to_string(),
        }
    };

    let mut lines = vec![format!("Phase:     {}", field("phase"))];
    if status.get("recording").and_then(Value::as_bool) == Some(true) {
        lines.push(format!(
            "Channel:   {} ({})",
            field("channel_name"),
            field("channel")
        ));
        lines.push(format!("Started:   {}", field("started_at")));
        lines.push(format!("Duration:  {}s", field("duration_seconds")));
    }
    lines.push(format!("Last file: {}", field("last_file")));
    if let Some(Value::String(error)) = status.get("last_error") {
        lines.push(format!("Last error: {}", error));
    }
    lines.push(format!("Sessions:  {}", field("sessions_completed")));
    lines.join("\n")
}
