//! tpbuild CLI - Build third-party native libraries from source
//!
//! Entry point for the tpbuild command-line application.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tpbuild::cli::output::{display_error, OutputConfig};
use tpbuild::cli::Cli;

fn main() {
    let cli = Cli::parse();

    // Apply output configuration globally
    let output_config = OutputConfig::new(cli.quiet, cli.json, cli.verbose);
    output_config.apply_global();

    // RUST_LOG wins over the verbosity flags
    let filter = EnvFilter::builder()
        .with_default_directive(output_config.log_level().into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Run the command and handle errors
    if let Err(e) = cli.run() {
        display_error(&e);
        std::process::exit(1);
    }
}
