use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "nouncil")]
#[command(about = "Records voice channels while enough members are present", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the config file (default: {config_dir}/nouncil/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Print version information
    Version,
    /// Show the recorder status of the running service
    Status,
    /// List saved recordings, newest first
    Recordings(RecordingsCliArgs),
    /// View recent application logs
    Logs(LogsCliArgs),
    /// Print the effective configuration
    Config,
}

#[derive(ClapArgs, Debug)]
pub struct RecordingsCliArgs {
    /// Maximum number of recordings to show
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}

#[derive(ClapArgs, Debug)]
pub struct LogsCliArgs {
    /// Number of log lines to show
    #[arg(short = 'n', long, default_value = "30")]
    pub lines: usize,
}
