//! CAPM CLI entry point
//!
//! Parses arguments, installs the log subscriber, runs the command and turns
//! failures into a colored message with a suggestion.

use anyhow::Result;
use capm_cli::cli;
use capm_cli::core::user_friendly_error;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.init_logging();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}
