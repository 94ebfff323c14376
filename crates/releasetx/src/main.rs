mod commands;
mod error;
mod interaction;
mod logging;
mod output;

use std::process::ExitCode;

use clap::Parser;

use crate::commands::{Commands, Completion};
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "releasetx")]
#[command(about = "Run release steps as one transaction, rolling back on failure", long_about = None)]
#[command(version)]
struct Cli {
    /// Log debug events as well
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command.execute(cli.verbose) {
        Ok(Completion::Success) => ExitCode::SUCCESS,
        Ok(Completion::RolledBack) => ExitCode::FAILURE,
        Err(e) => {
            print_error(&e);
            ExitCode::from(2)
        }
    }
}

fn print_error(error: &CliError) {
    eprintln!("error: {error}");

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("caused by: {cause}");
        source = std::error::Error::source(cause);
    }
}
