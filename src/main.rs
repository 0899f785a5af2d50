//! Ensayar CLI
//!
//! Training entry point for the ensayar library.
//!
//! # Usage
//!
//! ```bash
//! # Train on an IDX dataset with defaults
//! ensayar train data/fashion
//!
//! # Train with overrides
//! ensayar train data/fashion --epochs 1 --batch-size 128 --slice-size 10000
//!
//! # Train on generated clusters, no dataset needed
//! ensayar synth --n-examples 2000 --n-classes 4
//! ```

use clap::Parser;
use ensayar::cli::{run_command, Cli};
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
