//! Identifier remapping CLI for JVM class archives.
//!
//! Reads mapping tables (`--mapFile`, then `--map`), scans every reference
//! and input archive for class hierarchy, then writes one output archive in
//! which classes are renamed and everything else is copied.
//!
//! Exit status is 0 on success (and for `--help`/`-?`), 1 otherwise.
//! `RUST_LOG` controls log verbosity (default `info`); logs go to stderr.
mod args;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use remap_core::MappingTable;
use tracing::info;
use tracing_subscriber::EnvFilter;

use args::Args;

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    init_tracing();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:#}", err);
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: &Args) -> Result<()> {
    let config = args.to_config()?;

    let mut table = MappingTable::new(args.default_package());
    for path in &args.map_file {
        info!(path = %path.display(), "reading mappings");
        table.read_mapping_file(path)?;
    }
    for line in &args.map {
        table.read_mapping_line(line);
    }

    let summary = remap_core::run(&config, &table)?;

    if args.json {
        let json = serde_json::to_string(&summary).context("failed to serialize summary")?;
        println!("{}", json);
    }
    Ok(())
}
