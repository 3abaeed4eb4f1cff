//! CLI handler for listing saved recordings.

use crate::config::Config;
use crate::recorder::list_recordings;
use anyhow::Result;

use super::args::RecordingsCliArgs;

pub fn handle_recordings_command(config: &Config, args: RecordingsCliArgs) -> Result<()> {
    let dir = config.recorder.recordings_dir()?;
    let entries = list_recordings(&dir, args.limit)?;

    if entries.is_empty() {
        println!("No recordings found in {}.", dir.display());
        return Ok(());
    }

    println!("=== Recordings in {} ===\n", dir.display());
    for entry in &entries {
        let modified = entry
            .modified
            .map(|m| m.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<19}  {:>10}  {}",
            modified,
            format_size(entry.size_bytes),
            entry.name
        );
    }
    println!("\n{} recording(s)", entries.len());

    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
