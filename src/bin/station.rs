//! Entry point for `waypoint-station`.
//!
//! Validates its id and info, binds an ephemeral localhost port, prints it on
//! stdout, optionally registers with a registry, then serves visitors until
//! interrupted.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use waypoint::config::StationConfig;
use waypoint::listener::interrupted;
use waypoint::{Listener, Station, StationError};

/// A station that logs every visitor and answers with its info.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Station id (no ':', '\n' or '\r').
    #[arg(allow_hyphen_values = true)]
    id: String,
    /// Info sent to every visitor (no ':', '\n' or '\r').
    #[arg(allow_hyphen_values = true)]
    info: String,
    /// Port of a registry to announce this station to.
    #[arg(allow_hyphen_values = true)]
    registry: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(StationError::USAGE_EXIT_CODE)
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

async fn run(cli: Cli) -> Result<(), StationError> {
    let config = StationConfig::parse(&cli.id, &cli.info, cli.registry.as_deref())?;
    let listener = Listener::bind().await?;
    println!("{}", listener.port());

    Arc::new(Station::from_config(&config))
        .run(listener, config.registry_port, interrupted())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hyphen_leading_values_are_positional() {
        let cli = Cli::try_parse_from(["waypoint-station", "-BNE", "-hot and humid", "4000"]).unwrap();
        assert_eq!(cli.id, "-BNE");
        assert_eq!(cli.info, "-hot and humid");
        assert_eq!(cli.registry.as_deref(), Some("4000"));
    }

    #[test]
    fn registry_port_is_optional() {
        let cli = Cli::try_parse_from(["waypoint-station", "BNE", "Brisbane"]).unwrap();
        assert_eq!(cli.registry, None);
    }

    #[test]
    fn missing_info_is_a_usage_error() {
        let err = Cli::try_parse_from(["waypoint-station", "BNE"]).unwrap_err();
        assert!(err.use_stderr());
    }
}
