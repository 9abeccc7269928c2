mod cli;
mod commands;
mod config;
mod watch;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use console_logging::{console_info, LogDestination};
use log::LevelFilter;

use crate::cli::Cli;
use crate::commands::Console;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    initialize_logging(cli.verbose, cli.log_file.as_deref());

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_FILE));
    let mut settings = config::load(&config_path).into_settings();
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }
    if let Some(route) = cli.delete_route {
        settings.delete_route = route;
    }
    console_info!(
        "Using backend {} (delete route {})",
        settings.base_url,
        settings.delete_route
    );

    let result = match Console::new(settings) {
        Ok(console) => console.run(cli.command).await,
        Err(err) => Err(err),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn initialize_logging(verbose: u8, log_file: Option<&Path>) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let destination = if log_file.is_some() {
        LogDestination::Both
    } else {
        LogDestination::Terminal
    };
    console_logging::initialize(destination, level, log_file);
}
