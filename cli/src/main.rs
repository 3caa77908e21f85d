use clap::Parser;
use dalbatch::setup_info_logger;

use crate::{
    cli_interface::{Commands, CLI},
    commands::{
        apply::handle_apply_command, check::handle_check_command, preview::handle_preview_command,
    },
};

mod cli_interface;
mod commands;
mod console;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CLI::parse();

    match &cli.command {
        Commands::Preview(args) => handle_preview_command(args),
        Commands::Apply(args) => handle_apply_command(args).await,
        Commands::Check { manifest } => {
            setup_info_logger();
            handle_check_command(manifest)
        }
    }
}
