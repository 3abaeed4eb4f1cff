use anyhow::Result;
use clap::Parser;
use nouncil::{
    app,
    cli::{
        handle_config_command, handle_logs_command, handle_recordings_command,
        handle_status_command, Cli, CliCommand,
    },
    config::Config,
    logs,
};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Some(CliCommand::Version) => {
            println!("Nouncil {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(CliCommand::Status) => {
            let config = load_config(config_path)?;
            logs::init_console(cli.verbose);
            handle_status_command(&config).await
        }
        Some(CliCommand::Recordings(args)) => {
            let config = load_config(config_path)?;
            logs::init_console(cli.verbose);
            handle_recordings_command(&config, args)
        }
        Some(CliCommand::Logs(args)) => {
            let config = load_config(config_path)?;
            logs::init_console(cli.verbose);
            handle_logs_command(&config, args)
        }
        Some(CliCommand::Config) => handle_config_command(&load_config(config_path)?),
        None => {
            let config = load_config(config_path)?;
            let _guard = logs::init_logging(cli.verbose, &config.logging)?;
            app::run_service(config).await
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}
