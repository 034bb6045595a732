//! Visitor client: resolve destinations, visit each station, report.
//!
//! ```text
//!  START ─▶ registry resolved | skipped ─▶ destinations resolved
//!        ─▶ visiting 0..n (a failed dial is recorded, not fatal)
//!        ─▶ reported ─▶ ok | partial failure
//! ```
//!
//! Resolution is all-or-nothing: one unknown id aborts the run before any
//! station is contacted.  Visiting is best-effort: every reachable station is
//! visited and the report is produced even when some were not.

use crate::channel::{ChannelError, LineChannel};
use crate::concurrent_log::ConcurrentLog;
use crate::config::{RegistryArg, VisitorConfig};
use crate::dialer::{dial, DialError};
use crate::protocol::{is_valid_payload, parse_port, query_request, NO_ENTRY};

/// Errors that end a visitor run.
#[derive(Debug, thiserror::Error)]
pub enum VisitorError {
    /// Own id contains a forbidden character.
    #[error("Invalid visitor id")]
    InvalidId,
    #[error("Invalid registry port")]
    InvalidRegistryPort,
    /// A destination is not a port and no registry was given.
    #[error("Registry required")]
    RegistryRequired,
    #[error("Failed to connect to registry: {0}")]
    RegistryUnreachable(#[source] DialError),
    #[error("No registry entry for destination {id}")]
    NoEntry { id: String },
    /// The registry connection broke while resolving `id`.
    #[error("Registry query for {id} failed: {source}")]
    RegistryQuery {
        id: String,
        #[source]
        source: ChannelError,
    },
    #[error("Failed to connect to at least one destination ({failed} failed)")]
    StationUnreachable { failed: usize },
}

impl VisitorError {
    /// Process exit code for bad command-line usage.
    pub const USAGE_EXIT_CODE: u8 = 1;

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidId => Self::USAGE_EXIT_CODE,
            Self::InvalidRegistryPort => 2,
            Self::RegistryRequired => 3,
            Self::RegistryUnreachable(_) => 4,
            Self::NoEntry { .. } | Self::RegistryQuery { .. } => 5,
            Self::StationUnreachable { .. } => 6,
        }
    }
}

/// One entry of the destination list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Port(u16),
    /// Station id to look up in the registry.
    Id(String),
}

impl Destination {
    /// A valid port is always taken literally, even if a station happens to
    /// use digits as its id.
    pub fn parse(text: &str) -> Self {
        match parse_port(text) {
            Some(port) => Self::Port(port),
            None => Self::Id(text.to_string()),
        }
    }
}

/// Outcome of the visiting phase.
#[derive(Debug, Default)]
pub struct VisitReport {
    /// Station infos in visit order.
    visited: ConcurrentLog<String>,
    /// Ports that could not be visited, in order.
    failed: Vec<u16>,
}

impl VisitReport {
    /// Infos joined by `\n` in visit order, no trailing newline.
    pub fn render(&self) -> String {
        self.visited.render_all()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn failed(&self) -> &[u16] {
        &self.failed
    }

    /// `Err(StationUnreachable)` if any destination failed.
    pub fn outcome(&self) -> Result<(), VisitorError> {
        if self.failed.is_empty() {
            Ok(())
        } else {
            Err(VisitorError::StationUnreachable {
                failed: self.failed.len(),
            })
        }
    }
}

/// Why a single visit failed.
#[derive(Debug, thiserror::Error)]
enum VisitFailure {
    #[error(transparent)]
    Dial(#[from] DialError),
    #[error(transparent)]
    Exchange(#[from] ChannelError),
}

/// A configured visitor.
#[derive(Debug)]
pub struct Visitor {
    id: String,
    registry: RegistryArg,
    destinations: Vec<Destination>,
}

impl Visitor {
    pub fn new(config: VisitorConfig) -> Result<Self, VisitorError> {
        if !is_valid_payload(&config.id) {
            return Err(VisitorError::InvalidId);
        }
        Ok(Self {
            id: config.id,
            registry: config.registry,
            destinations: config.destinations.iter().map(|d| Destination::parse(d)).collect(),
        })
    }

    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    /// Resolve every destination, then visit them in order.
    ///
    /// Returns `Err` only for fatal conditions, all of which are detected
    /// before the first visit.  Per-destination failures are in the report.
    pub async fn run(&self) -> Result<VisitReport, VisitorError> {
        let mut registry = self.connect_registry().await?;
        let ports = self.resolve(&mut registry).await?;
        drop(registry);
        Ok(self.visit_all(&ports).await)
    }

    async fn connect_registry(&self) -> Result<Option<LineChannel>, VisitorError> {
        match &self.registry {
            RegistryArg::NoRegistry => {
                if self
                    .destinations
                    .iter()
                    .all(|d| matches!(d, Destination::Port(_)))
                {
                    Ok(None)
                } else {
                    Err(VisitorError::RegistryRequired)
                }
            }
            RegistryArg::Port(text) => {
                let port = parse_port(text).ok_or(VisitorError::InvalidRegistryPort)?;
                let channel = dial(port)
                    .await
                    .map_err(VisitorError::RegistryUnreachable)?;
                log::debug!("[visitor:{}] connected to registry on {port}", self.id);
                Ok(Some(channel))
            }
        }
    }

    /// Ports for every destination, in input order.
    async fn resolve(
        &self,
        registry: &mut Option<LineChannel>,
    ) -> Result<Vec<u16>, VisitorError> {
        let mut ports = Vec::with_capacity(self.destinations.len());
        for destination in &self.destinations {
            let port = match destination {
                Destination::Port(port) => *port,
                Destination::Id(id) => {
                    let channel = registry.as_mut().ok_or(VisitorError::RegistryRequired)?;
                    lookup(channel, id).await?
                }
            };
            ports.push(port);
        }
        Ok(ports)
    }

    async fn visit_all(&self, ports: &[u16]) -> VisitReport {
        let mut report = VisitReport::default();
        for &port in ports {
            match self.visit(port).await {
                Ok(info) => {
                    if let Err(e) = report.visited.append(info) {
                        log::warn!("[visitor:{}] info from {port} not kept: {e}", self.id);
                    }
                }
                Err(e) => {
                    log::warn!("[visitor:{}] could not visit {port}: {e}", self.id);
                    report.failed.push(port);
                }
            }
        }
        report
    }

    /// Send own id, read one line of station info.
    ///
    /// A station that closes without answering yields an empty info.
    async fn visit(&self, port: u16) -> Result<String, VisitFailure> {
        let mut channel = dial(port).await?;
        channel.send(&self.id).await?;
        let info = channel.receive_line().await?.unwrap_or_default();
        log::debug!("[visitor:{}] visited {port}: {info:?}", self.id);
        Ok(info)
    }
}

/// Ask the registry for `id`'s port.
///
/// `;`, an empty line, end-of-stream or a non-port reply all mean no entry.
/// An id the registry would refuse to parse cannot have been registered, so
/// it is not sent at all.
async fn lookup(channel: &mut LineChannel, id: &str) -> Result<u16, VisitorError> {
    let no_entry = || VisitorError::NoEntry { id: id.to_string() };
    if !is_valid_payload(id) {
        return Err(no_entry());
    }
    let query_failed = |source| VisitorError::RegistryQuery {
        id: id.to_string(),
        source,
    };
    channel
        .send(&query_request(id))
        .await
        .map_err(query_failed)?;
    let reply = channel.receive_line().await.map_err(query_failed)?;
    match reply.as_deref() {
        None | Some("") | Some(NO_ENTRY) => Err(no_entry()),
        Some(text) => parse_port(text).ok_or_else(no_entry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(registry: &str, destinations: &[&str]) -> VisitorConfig {
        VisitorConfig::new(
            "plane",
            registry,
            destinations.iter().map(|d| d.to_string()).collect(),
        )
    }

    #[test]
    fn destinations_parse_ports_and_ids() {
        let v = Visitor::new(config("-", &["4000", "BNE", "0", "65536"])).unwrap();
        assert_eq!(
            v.destinations(),
            &[
                Destination::Port(4000),
                Destination::Id("BNE".into()),
                Destination::Id("0".into()),
                Destination::Id("65536".into()),
            ]
        );
    }

    #[test]
    fn invalid_own_id_is_rejected() {
        let result = Visitor::new(VisitorConfig::new("pl:ane", "-", vec![]));
        assert!(matches!(result, Err(VisitorError::InvalidId)));
    }

    #[tokio::test]
    async fn symbolic_destination_without_registry_fails_fast() {
        let v = Visitor::new(config("-", &["4000", "BNE"])).unwrap();
        let result = v.run().await;
        assert!(matches!(result, Err(VisitorError::RegistryRequired)));
    }

    #[tokio::test]
    async fn invalid_registry_port_is_fatal() {
        let v = Visitor::new(config("port", &["BNE"])).unwrap();
        assert!(matches!(
            v.run().await,
            Err(VisitorError::InvalidRegistryPort)
        ));
    }

    #[tokio::test]
    async fn no_destinations_yields_empty_report() {
        let v = Visitor::new(config("-", &[])).unwrap();
        let report = v.run().await.unwrap();
        assert_eq!(report.render(), "");
        assert!(report.outcome().is_ok());
    }

    #[test]
    fn report_outcome_reflects_failures() {
        let mut report = VisitReport::default();
        report.visited.append("info-1".into()).unwrap();
        report.failed.push(9);
        assert_eq!(report.render(), "info-1");
        assert!(matches!(
            report.outcome(),
            Err(VisitorError::StationUnreachable { failed: 1 })
        ));
    }

    #[test]
    fn exit_codes() {
        assert_eq!(VisitorError::InvalidRegistryPort.exit_code(), 2);
        assert_eq!(VisitorError::RegistryRequired.exit_code(), 3);
        assert_eq!(VisitorError::NoEntry { id: "x".into() }.exit_code(), 5);
        assert_eq!(
            VisitorError::StationUnreachable { failed: 2 }.exit_code(),
            6
        );
    }
}
