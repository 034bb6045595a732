//! Startup configuration for every role.
//!
//! Binaries parse positional arguments with clap and hand the raw strings to
//! the constructors here; validation that the protocol depends on happens in
//! one place so the services only ever see well-formed values.

use crate::protocol::{is_valid_payload, parse_port};
use crate::station::StationError;

/// Host every service binds and every client dials.
pub const DEFAULT_HOST: &str = "localhost";

/// Pending-connection queue length requested from the OS.
pub const DEFAULT_BACKLOG: u32 = 128;

/// Argument that tells a visitor to run without a registry.
pub const NO_REGISTRY: &str = "-";

/// Listening socket parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    /// Resolved to its first IPv4 address; bound with an ephemeral port.
    pub host: String,
    /// Backlog passed to `listen`.
    pub backlog: u32,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            backlog: DEFAULT_BACKLOG,
        }
    }
}

/// Validated station settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationConfig {
    pub id: String,
    pub info: String,
    /// Registry to announce this station to, if any.
    pub registry_port: Option<u16>,
}

impl StationConfig {
    /// Validate `id` and `info` against the payload alphabet first, then the
    /// optional registry port.
    pub fn parse(id: &str, info: &str, registry: Option<&str>) -> Result<Self, StationError> {
        if !is_valid_payload(id) || !is_valid_payload(info) {
            return Err(StationError::InvalidArgument);
        }
        let registry_port = match registry {
            Some(text) => Some(parse_port(text).ok_or(StationError::InvalidPort)?),
            None => None,
        };
        Ok(Self {
            id: id.to_string(),
            info: info.to_string(),
            registry_port,
        })
    }
}

/// How a visitor reaches the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryArg {
    /// `-`: every destination must be a literal port.
    NoRegistry,
    /// Unvalidated port text; checked only once a registry is needed.
    Port(String),
}

impl RegistryArg {
    pub fn parse(text: &str) -> Self {
        if text == NO_REGISTRY {
            Self::NoRegistry
        } else {
            Self::Port(text.to_string())
        }
    }
}

/// Visitor settings as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitorConfig {
    pub id: String,
    pub registry: RegistryArg,
    /// Literal ports or station ids, in visiting order.
    pub destinations: Vec<String>,
}

impl VisitorConfig {
    pub fn new(id: impl Into<String>, registry: &str, destinations: Vec<String>) -> Self {
        Self {
            id: id.into(),
            registry: RegistryArg::parse(registry),
            destinations,
        }
    }
}
