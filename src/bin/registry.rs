//! Entry point for `waypoint-registry`.
//!
//! Binds an ephemeral localhost port, prints it on stdout, then serves
//! `!id:port` / `?id` / `@` until interrupted.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use waypoint::listener::interrupted;
use waypoint::{Listener, Registry, RegistryError};

/// Id-to-port registry for waypoint stations.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    if let Err(e) = Cli::try_parse() {
        e.print()?;
        return Ok(if e.use_stderr() {
            ExitCode::from(RegistryError::USAGE_EXIT_CODE)
        } else {
            ExitCode::SUCCESS
        });
    }

    let listener = Listener::bind().await?;
    println!("{}", listener.port());

    Arc::new(Registry::new())
        .run(listener, interrupted())
        .await?;
    Ok(ExitCode::SUCCESS)
}
