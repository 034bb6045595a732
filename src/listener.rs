//! Server side of every service: bind, accept, one task per connection.
//!
//! [`Listener`] binds an ephemeral port on the loopback interface and hands
//! each accepted connection to its own tokio task.  The task reads lines from
//! a [`LineChannel`] and passes them to a [`LineService`], sending back
//! whatever replies the service returns.
//!
//! The accept loop never waits on a handler and puts no cap on how many run
//! at once; a silent peer holds its task until it disconnects.  Tasks are
//! kept in a [`JoinSet`] so that [`Listener::serve`] can stop accepting and
//! drain them when its shutdown future resolves.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpSocket};
use tokio::task::JoinSet;

use crate::channel::LineChannel;
use crate::config::ListenerConfig;
use crate::dialer::{resolve_ipv4, DialError};

/// Line-level behaviour of a service.
///
/// Called once per received line; dispatch must not block.  Each returned
/// string is written with one `send` (it may contain embedded newlines); an
/// empty vec means the line gets no response.
pub trait LineService: Send + Sync + 'static {
    fn handle_line(&self, line: &str) -> Vec<String>;
}

/// Errors that can arise from the listening socket.
#[derive(Debug, thiserror::Error)]
pub enum ListenError {
    #[error("could not resolve listen address: {0}")]
    Resolve(#[source] DialError),
    #[error("could not bind listening socket: {0}")]
    Bind(#[source] std::io::Error),
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),
}

/// A bound, listening socket.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind an ephemeral port on localhost with the default backlog.
    pub async fn bind() -> Result<Self, ListenError> {
        Self::bind_with(&ListenerConfig::default()).await
    }

    pub async fn bind_with(config: &ListenerConfig) -> Result<Self, ListenError> {
        let addr = resolve_ipv4(&config.host, 0)
            .await
            .map_err(ListenError::Resolve)?;
        let socket = TcpSocket::new_v4().map_err(ListenError::Bind)?;
        socket.bind(addr).map_err(ListenError::Bind)?;
        let inner = socket.listen(config.backlog).map_err(ListenError::Bind)?;
        let local_addr = inner.local_addr().map_err(ListenError::Bind)?;
        log::info!("[listener] bound {local_addr} (backlog {})", config.backlog);
        Ok(Self { inner, local_addr })
    }

    /// Port assigned by the OS.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until accepting itself fails.
    pub async fn accept_loop<S: LineService>(self, service: Arc<S>) -> Result<(), ListenError> {
        self.serve(service, std::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves or accepting fails.
    ///
    /// On exit every in-flight handler is aborted and awaited, so no handler
    /// outlives this call.
    pub async fn serve<S, F>(self, service: Arc<S>, shutdown: F) -> Result<(), ListenError>
    where
        S: LineService,
        F: Future<Output = ()>,
    {
        let port = self.port();
        let mut handlers = JoinSet::new();
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                accepted = self.inner.accept() => match accepted {
                    Ok((stream, peer)) => {
                        log::debug!("[listener:{port}] accepted {peer}");
                        let service = Arc::clone(&service);
                        handlers.spawn(async move {
                            serve_connection(LineChannel::from_tcp(stream), service.as_ref()).await;
                            log::debug!("[listener:{port}] closed {peer}");
                        });
                    }
                    Err(e) => break Err(ListenError::Accept(e)),
                },
                Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            log::warn!("[listener:{port}] connection handler panicked: {e}");
                        }
                    }
                }
                _ = &mut shutdown => break Ok(()),
            }
        };

        let in_flight = handlers.len();
        handlers.shutdown().await;
        log::info!("[listener:{port}] stopped, drained {in_flight} connection(s)");
        result
    }
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
pub async fn interrupted() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("[listener] interrupted"),
        Err(e) => {
            log::warn!("[listener] cannot watch for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    }
}

/// Drive one connection until the peer stops sending.
///
/// Returns on end-of-stream or the first I/O error; dropping the channel
/// closes both directions.
pub async fn serve_connection<S, T>(mut channel: LineChannel<T>, service: &S)
where
    S: LineService + ?Sized,
    T: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let line = match channel.receive_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                log::debug!("[listener] read failed: {e}");
                return;
            }
        };
        for reply in service.handle_line(&line) {
            if let Err(e) = channel.send(&reply).await {
                log::debug!("[listener] write failed: {e}");
                return;
            }
        }
    }
}
