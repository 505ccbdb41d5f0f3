mod cli;
mod commands;
mod libs;
mod logger;
mod schemas;

use clap::Parser;
use std::process::ExitCode;

use cli::cmd_enums::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(cli.debug);
    commands::install::run(cli)
}
