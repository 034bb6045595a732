//! Station service: answers every visitor with its info and logs who came.
//!
//! A station may announce itself to a registry once at startup.  The
//! announcement is one-way: [`Station::register`] sends a single add line,
//! flushes it, shuts down its write side and returns without reading.  The
//! registry never acknowledges an add, so there is nothing to wait for; the
//! half-close guarantees the registry reads the line before end-of-stream.

use std::future::Future;
use std::sync::Arc;

use crate::channel::ChannelError;
use crate::concurrent_log::ConcurrentLog;
use crate::config::StationConfig;
use crate::dialer::{dial, DialError};
use crate::listener::{LineService, ListenError, Listener};
use crate::protocol::{add_request, StationRequest, END_OF_LOG};

/// Errors that end a station process.
#[derive(Debug, thiserror::Error)]
pub enum StationError {
    /// Id or info contains a forbidden character.
    #[error("Invalid char in parameter")]
    InvalidArgument,
    /// Registry port is not a number in 1..=65535.
    #[error("Invalid port")]
    InvalidPort,
    #[error("Can not connect to registry: {0}")]
    RegistryUnreachable(#[source] DialError),
    #[error("Can not register with registry: {0}")]
    Registration(#[source] ChannelError),
    #[error("Can not listen: {0}")]
    Listen(#[from] ListenError),
}

impl StationError {
    /// Process exit code for bad command-line usage.
    pub const USAGE_EXIT_CODE: u8 = 1;

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidArgument => 2,
            Self::InvalidPort => 3,
            Self::RegistryUnreachable(_) | Self::Registration(_) => 4,
            Self::Listen(_) => 5,
        }
    }
}

/// Station state and request dispatch.
#[derive(Debug)]
pub struct Station {
    id: String,
    info: String,
    visitors: ConcurrentLog<String>,
}

impl Station {
    /// Station with a validated id and info.
    pub fn new(id: &str, info: &str) -> Result<Self, StationError> {
        StationConfig::parse(id, info, None).map(|cfg| Self::from_config(&cfg))
    }

    pub fn from_config(config: &StationConfig) -> Self {
        Self {
            id: config.id.clone(),
            info: config.info.clone(),
            visitors: ConcurrentLog::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn info(&self) -> &str {
        &self.info
    }

    /// Record a visit and return the info to send back.
    pub fn visit(&self, visitor: &str) -> &str {
        if let Err(e) = self.visitors.append(visitor.to_string()) {
            log::warn!("[station:{}] visit by {visitor} not logged: {e}", self.id);
        }
        &self.info
    }

    /// Visitor ids sorted, one per line, no trailing newline.  Sorting
    /// reorders the stored log.
    pub fn visitor_log(&self) -> String {
        self.visitors.sort_in_place();
        self.visitors.render_all()
    }

    /// Announce `!<id>:<own_port>` to the registry on `registry_port`.
    pub async fn register(&self, registry_port: u16, own_port: u16) -> Result<(), StationError> {
        let mut channel = dial(registry_port)
            .await
            .map_err(StationError::RegistryUnreachable)?;
        channel
            .send(&add_request(&self.id, own_port))
            .await
            .map_err(StationError::Registration)?;
        channel.close().await.map_err(StationError::Registration)?;
        log::info!(
            "[station:{}] registered port {own_port} with registry on {registry_port}",
            self.id
        );
        Ok(())
    }

    /// Register if a registry port is given, then serve on `listener` until
    /// `shutdown` resolves.
    pub async fn run<F>(
        self: Arc<Self>,
        listener: Listener,
        registry_port: Option<u16>,
        shutdown: F,
    ) -> Result<(), StationError>
    where
        F: Future<Output = ()>,
    {
        if let Some(registry_port) = registry_port {
            self.register(registry_port, listener.port()).await?;
        }
        log::info!("[station:{}] serving on port {}", self.id, listener.port());
        listener.serve(self, shutdown).await?;
        Ok(())
    }
}

impl LineService for Station {
    fn handle_line(&self, line: &str) -> Vec<String> {
        match StationRequest::parse(line) {
            Some(StationRequest::Log) => {
                let block = self.visitor_log();
                let mut replies = Vec::with_capacity(2);
                if !block.is_empty() {
                    replies.push(block);
                }
                replies.push(END_OF_LOG.to_string());
                replies
            }
            Some(StationRequest::Visit { visitor }) => {
                log::debug!("[station:{}] visited by {visitor}", self.id);
                vec![self.visit(visitor).to_string()]
            }
            None => {
                log::debug!("[station:{}] ignoring line {line:?}", self.id);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station() -> Station {
        Station::new("BNE", "Brisbane").unwrap()
    }

    #[test]
    fn visit_replies_with_info() {
        let s = station();
        assert_eq!(s.handle_line("plane-1"), vec!["Brisbane"]);
    }

    #[test]
    fn log_is_sorted_then_terminated() {
        let s = station();
        s.handle_line("zulu");
        s.handle_line("alpha");
        assert_eq!(s.handle_line("log"), vec!["alpha\nzulu", "."]);
    }

    #[test]
    fn empty_log_is_just_terminator() {
        let s = station();
        assert_eq!(s.handle_line("log"), vec!["."]);
    }

    #[test]
    fn repeat_visits_are_all_logged() {
        let s = station();
        s.handle_line("p");
        s.handle_line("p");
        assert_eq!(s.handle_line("log"), vec!["p\np", "."]);
    }

    #[test]
    fn forbidden_lines_are_ignored_and_not_logged() {
        let s = station();
        assert!(s.handle_line("a:b").is_empty());
        assert!(s.handle_line("a\rb").is_empty());
        assert_eq!(s.handle_line("log"), vec!["."]);
    }

    #[test]
    fn log_request_is_not_itself_logged() {
        let s = station();
        s.handle_line("log");
        s.handle_line("log");
        assert_eq!(s.handle_line("log"), vec!["."]);
    }

    #[test]
    fn new_rejects_forbidden_chars() {
        assert!(matches!(
            Station::new("a:b", "info"),
            Err(StationError::InvalidArgument)
        ));
        assert!(matches!(
            Station::new("id", "in\nfo"),
            Err(StationError::InvalidArgument)
        ));
    }

    #[test]
    fn exit_codes() {
        assert_eq!(StationError::InvalidArgument.exit_code(), 2);
        assert_eq!(StationError::InvalidPort.exit_code(), 3);
    }
}
