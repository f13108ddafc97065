//! Prodigio CLI
//!
//! Preset and history manager for the prodigio optimizers.
//!
//! ```bash
//! # List available optimizers
//! prodigio list
//!
//! # Show preset tables
//! prodigio presets adabelief
//! prodigio presets adabelief --label consumer
//!
//! # Inspect or trim usage history
//! prodigio history adabelief show --ttl-days 30
//! prodigio history adabelief clear
//! ```

use clap::Parser;
use prodigio::cli::{run_command, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
