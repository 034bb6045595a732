//! Newline-delimited text channel over a connected byte stream.
//!
//! [`LineChannel`] speaks whole lines instead of raw bytes.  Every `send` is
//! followed by a flush so no message sits in a buffer waiting for the next
//! one.  Protocol logic lives elsewhere; this module owns only line framing.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;

/// Starting capacity of the line buffer; it grows by doubling past this.
pub const INITIAL_LINE_CAPACITY: usize = 80;

/// Line terminator used in both directions.
const NEWLINE: u8 = b'\n';

/// Errors that can arise from channel operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Underlying I/O error from the OS.
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A bidirectional line channel.
///
/// Generic over the stream so tests can run it over an in-memory pipe; in
/// production it is always a [`TcpStream`].
#[derive(Debug)]
pub struct LineChannel<S = TcpStream> {
    stream: BufStream<S>,
    /// Reused across reads so the capacity reached by long lines is kept.
    line: Vec<u8>,
}

impl<S> LineChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufStream::new(stream),
            line: Vec::with_capacity(INITIAL_LINE_CAPACITY),
        }
    }

    /// Write `text` followed by a single `\n` and flush.
    ///
    /// `text` may itself contain `\n` separators; a multi-line block is still
    /// one send.
    pub async fn send(&mut self, text: &str) -> Result<(), ChannelError> {
        self.stream.write_all(text.as_bytes()).await?;
        self.stream.write_all(&[NEWLINE]).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Read the next line with its trailing `\n` stripped.
    ///
    /// Returns `Ok(None)` once the peer has closed its side and no complete
    /// line remains.  An unterminated fragment before end-of-stream is
    /// discarded rather than returned as a line.
    pub async fn receive_line(&mut self) -> Result<Option<String>, ChannelError> {
        self.line.clear();
        let n = self.stream.read_until(NEWLINE, &mut self.line).await?;
        if n == 0 || self.line.last() != Some(&NEWLINE) {
            return Ok(None);
        }
        self.line.pop();
        Ok(Some(String::from_utf8_lossy(&self.line).into_owned()))
    }

    /// Flush and shut down the write direction.
    ///
    /// The peer sees end-of-stream after every line already sent.  Reading
    /// remains possible until the channel is dropped.
    pub async fn close(&mut self) -> Result<(), ChannelError> {
        self.stream.shutdown().await?;
        Ok(())
    }

    /// Current capacity of the internal line buffer.
    pub fn line_capacity(&self) -> usize {
        self.line.capacity()
    }
}

impl LineChannel<TcpStream> {
    /// Wrap a connected TCP stream.
    ///
    /// Nagle is disabled since every message is a short, flushed line.
    pub fn from_tcp(stream: TcpStream) -> Self {
        if let Err(e) = stream.set_nodelay(true) {
            log::debug!("[channel] set_nodelay failed: {e}");
        }
        Self::new(stream)
    }
}
