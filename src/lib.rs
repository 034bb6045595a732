//! `waypoint`: a loopback service registry, visitor-logging stations and a
//! visiting client, all speaking one newline-delimited text protocol over TCP.
//!
//! # Architecture
//!
//! ```text
//!                 !id:port            ┌────────────┐
//!   ┌─────────┐ ────────────────────▶ │  Registry  │ ◀──── ?id / @
//!   │ Station │                       └─────▲──────┘         │
//!   └────▲────┘                             │ ?id            │
//!        │  visitor id / log                │                │
//!        │                            ┌─────┴──────┐         │
//!        └─────────────────────────── │  Visitor   │ ────────┘
//!                  info               └────────────┘
//! ```
//!
//! Both services run the same [`listener::Listener`] accept loop, one tokio
//! task per connection, each task driving a [`channel::LineChannel`] and
//! handing every line to a [`listener::LineService`].  The only state shared
//! between connections is each service's [`concurrent_log::ConcurrentLog`].
//!
//! Each module has a single responsibility:
//! - [`channel`]: newline-delimited text over a connected socket
//! - [`concurrent_log`]: mutex-guarded append / find / sort / render log
//! - [`protocol`]: payload validation and request-line parsing
//! - [`dialer`]: open a line channel to a localhost port
//! - [`listener`]: ephemeral-port bind, accept loop, shutdown/drain
//! - [`registry`]: id → port mapping service
//! - [`station`]: visitor-logging service with self-registration
//! - [`visitor`]: resolve, visit and report client
//! - [`config`]: startup configuration for every role

pub mod channel;
pub mod concurrent_log;
pub mod config;
pub mod dialer;
pub mod listener;
pub mod protocol;
pub mod registry;
pub mod station;
pub mod visitor;

pub use channel::{ChannelError, LineChannel};
pub use concurrent_log::{ConcurrentLog, LogEntry, LogError};
pub use dialer::{dial, DialError};
pub use listener::{LineService, ListenError, Listener};
pub use registry::{Mapping, Registry, RegistryError};
pub use station::{Station, StationError};
pub use visitor::{Destination, VisitReport, Visitor, VisitorError};
