//! Entry point for `waypoint-visitor`.
//!
//! Resolves its destinations, visits each station in order and prints the
//! collected infos on stdout.  A failed visit is reported through the exit
//! code only after the infos have been printed.

use std::process::ExitCode;

use clap::Parser;
use waypoint::config::VisitorConfig;
use waypoint::{Visitor, VisitorError};

/// Visit waypoint stations by port or by registered id.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Id sent to every station visited.
    #[arg(allow_hyphen_values = true)]
    id: String,
    /// Registry port, or '-' when every destination is a port.
    #[arg(allow_hyphen_values = true)]
    registry: String,
    /// Station ports or ids, visited in order.
    #[arg(allow_hyphen_values = true)]
    destinations: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(VisitorError::USAGE_EXIT_CODE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), VisitorError> {
    let visitor = Visitor::new(VisitorConfig::new(cli.id, &cli.registry, cli.destinations))?;
    let report = visitor.run().await?;

    let rendered = report.render();
    if !rendered.is_empty() {
        println!("{rendered}");
    }
    report.outcome()
}
