//! ## quill
//! **Command-line driver for the quill logger**
//!
//! Emits sample records, stress-tests a logger from several threads and
//! receives batches sent by the network writer.
//!
//! Diagnostics of the logger itself go to stderr, filtered by `QUILL_DIAG`.

use clap::Parser;

mod commands;

use commands::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    quill_telemetry::diagnostics::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Emit(args) => commands::run_emit(&cli, args),
        Commands::Stress(args) => commands::run_stress(&cli, args),
        Commands::Listen(args) => commands::run_listen(args),
    }
}
