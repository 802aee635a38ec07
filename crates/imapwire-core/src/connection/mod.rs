//! IMAP connection engine
//!
//! Owns the duplex byte stream to an IMAP server. Outgoing command text is
//! buffered until a fragment is committed with `eol`, literal payloads are
//! streamed in bounded chunks, and incoming data is assembled into one
//! [`Tokenize`](crate::tokenize::Tokenize) per logical response unit.
//!
//! A connection is not reentrant: every operation takes `&mut self`. Any
//! transport failure closes the stream, after which all operations fail
//! with [`Error::Closed`].

mod buffer;
mod literal;
mod reader;
mod writer;

#[cfg(test)]
mod mock;

pub use buffer::OutputBuffer;
pub use literal::LiteralSource;

use crate::debug::{DebugSink, NoopDebug};
use imapwire_common::config::ConnectionConfig;
use imapwire_common::{Error, Result};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

/// Client side of an IMAP byte stream
pub struct Connection<S> {
    stream: Option<BufReader<S>>,
    buffer: OutputBuffer,
    config: ConnectionConfig,
    debug: Box<dyn DebugSink>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an established stream
    pub fn new(stream: S, config: ConnectionConfig, debug: impl DebugSink + 'static) -> Self {
        let capacity = config.chunk_size.max(1);
        Self {
            stream: Some(BufReader::with_capacity(capacity, stream)),
            buffer: OutputBuffer::new(),
            config,
            debug: Box::new(debug),
        }
    }

    /// Wrap a stream with the default configuration and no debug output
    pub fn with_defaults(stream: S) -> Self {
        Self::new(stream, ConnectionConfig::default(), NoopDebug)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Bytes queued by `write(.., false)` and not yet sent
    pub fn pending_output(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    /// Shut the stream down and drop it. Calling this twice is harmless.
    pub async fn close(&mut self) {
        self.buffer.clear();
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("Error shutting down IMAP stream: {}", e);
            }
        }
    }

    /// Hand the stream back to the caller, e.g. to wrap it in TLS.
    ///
    /// Server bytes already buffered but not yet consumed by `read` are lost.
    pub fn into_inner(self) -> Result<S> {
        self.stream.map(BufReader::into_inner).ok_or(Error::Closed)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.stream.is_none() {
            return Err(Error::Closed);
        }
        Ok(())
    }
}
