//! Entrenar-dual CLI
//!
//! # Usage
//!
//! ```bash
//! # Train from a data directory
//! entrenar-dual train --data data/iwslt14 --source-lang de --target-lang en
//!
//! # Train from config with overrides
//! entrenar-dual train --config run.yaml --lr 0.001 --patience 3
//!
//! # Validate config
//! entrenar-dual validate run.yaml --detailed
//! ```

use clap::Parser;
use entrenar_dual::cli::{run_command, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
