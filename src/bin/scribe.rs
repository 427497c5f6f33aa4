//! Scribe CLI Binary
//!
//! Command-line interface for generating examples, test scripts and reports
//! for Postman collections.

use anyhow::Context;
use clap::Parser;
use collection_scribe::logging::init_logging;
use collection_scribe::tooling::cli::{Cli, CliContext};
use std::process;

fn run(cli: &Cli) -> anyhow::Result<String> {
    let config = cli.load_config().context("Failed to load configuration")?;
    // Logging settings live in the config, so only loading it goes unlogged
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Warning: logging disabled: {}", e);
    }
    let context = CliContext::new(cli, config).context("Failed to initialize")?;
    let output = context.execute(&cli.command)?;
    Ok(output)
}

fn main() {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
