//! Registry service: maps station ids to ports.
//!
//! All state is one [`ConcurrentLog`] of [`Mapping`]s shared by every
//! connection.  Mappings are added once and never change or go away; the
//! first add for an id wins.

use std::sync::Arc;

use crate::concurrent_log::{ConcurrentLog, LogEntry};
use crate::listener::{LineService, ListenError, Listener};
use crate::protocol::{RegistryRequest, MAPPING_SEPARATOR, NO_ENTRY};

/// One registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub id: String,
    pub port: u16,
}

impl Mapping {
    pub fn new(id: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            port,
        }
    }
}

impl LogEntry for Mapping {
    type Key = str;

    fn key(&self) -> &str {
        &self.id
    }

    /// `id:port`
    fn render(&self, out: &mut String) {
        out.push_str(&self.id);
        out.push(MAPPING_SEPARATOR);
        out.push_str(&self.port.to_string());
    }
}

/// Errors that end a registry process.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Listen(#[from] ListenError),
}

impl RegistryError {
    /// Process exit code for bad command-line usage.
    pub const USAGE_EXIT_CODE: u8 = 1;

    pub fn exit_code(&self) -> u8 {
        1
    }
}

/// Registry state and request dispatch.
#[derive(Debug, Default)]
pub struct Registry {
    mappings: ConcurrentLog<Mapping>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `id → port` unless `id` is already mapped.
    ///
    /// Returns `true` if the mapping was stored.
    pub fn add(&self, id: &str, port: u16) -> bool {
        match self.mappings.insert_if_absent(Mapping::new(id, port)) {
            Ok(stored) => stored,
            Err(e) => {
                log::warn!("[registry] dropping add for {id}: {e}");
                false
            }
        }
    }

    pub fn lookup(&self, id: &str) -> Option<u16> {
        self.mappings.find(id).map(|m| m.port)
    }

    /// All mappings sorted by id, one `id:port` per line, no trailing
    /// newline.  Sorting reorders the stored log.
    pub fn dump(&self) -> String {
        self.mappings.sort_in_place();
        self.mappings.render_all()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn run<F>(
        self: Arc<Self>,
        listener: Listener,
        shutdown: F,
    ) -> Result<(), RegistryError>
    where
        F: std::future::Future<Output = ()>,
    {
        log::info!("[registry] serving on port {}", listener.port());
        listener.serve(self, shutdown).await?;
        Ok(())
    }
}

impl LineService for Registry {
    fn handle_line(&self, line: &str) -> Vec<String> {
        match RegistryRequest::parse(line) {
            Some(RegistryRequest::Add { id, port }) => {
                if self.add(id, port) {
                    log::debug!("[registry] mapped {id} -> {port}");
                }
                Vec::new()
            }
            Some(RegistryRequest::Query { id }) => match self.lookup(id) {
                Some(port) => vec![port.to_string()],
                None => vec![NO_ENTRY.to_string()],
            },
            Some(RegistryRequest::Dump) => {
                let block = self.dump();
                if block.is_empty() {
                    Vec::new()
                } else {
                    vec![block]
                }
            }
            None => {
                log::debug!("[registry] ignoring line {line:?}");
                Vec::new()
            }
        }
    }
}
