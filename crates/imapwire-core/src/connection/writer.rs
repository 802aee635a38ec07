//! Outgoing side of the connection

use super::{Connection, LiteralSource};
use imapwire_common::{Error, Result};
use std::io::Cursor;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::warn;

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Queue `data`, or with `eol` send everything queued plus `data` and CRLF.
    ///
    /// A committed fragment goes out as a single stream write. The buffer is
    /// emptied before that write is issued.
    pub async fn write(&mut self, data: &[u8], eol: bool) -> Result<()> {
        self.ensure_open()?;

        if !eol {
            self.buffer.push(data);
            return Ok(());
        }

        let mut payload = self.buffer.take();
        payload.extend_from_slice(data);
        self.debug.client(&payload);
        payload.extend_from_slice(b"\r\n");

        let result = match self.stream.as_mut() {
            Some(stream) => match stream.write_all(&payload).await {
                Ok(()) => stream.flush().await,
                Err(e) => Err(e),
            },
            None => return Err(Error::Closed),
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail_write(e).await),
        }
    }

    /// Stream a literal payload of `length` bytes from `data`.
    ///
    /// The announcing `{N}` fragment must already have been committed; any
    /// text still queued is discarded. `length` is only used for logging, the
    /// source is copied until it reports end of data.
    pub async fn write_literal(
        &mut self,
        data: &mut dyn LiteralSource,
        length: u64,
        binary: bool,
    ) -> Result<()> {
        self.ensure_open()?;
        self.buffer.clear();

        let chunk_size = self.config.chunk_size.max(1);
        let result = match self.stream.as_mut() {
            Some(stream) => copy_literal(data, stream, chunk_size).await,
            None => return Err(Error::Closed),
        };
        if let Err(e) = result {
            return Err(self.fail_write(e).await);
        }

        if self.config.debug_literal {
            if let Err(e) = self.dump_literal(data, chunk_size).await {
                warn!("Failed to re-read literal for debug output: {}", e);
            }
        } else {
            let kind = if binary { "BINARY" } else { "LITERAL" };
            self.debug
                .client(format!("[{} DATA: {} bytes]", kind, length).as_bytes());
        }

        Ok(())
    }

    /// Stream an in-memory literal payload
    pub async fn write_literal_bytes(&mut self, data: &[u8], binary: bool) -> Result<()> {
        let mut cursor = Cursor::new(data);
        self.write_literal(&mut cursor, data.len() as u64, binary).await
    }

    async fn dump_literal(
        &mut self,
        data: &mut dyn LiteralSource,
        chunk_size: usize,
    ) -> std::io::Result<()> {
        data.rewind().await?;
        let mut buf = vec![0u8; chunk_size];
        loop {
            let n = data.read_chunk(&mut buf).await?;
            if n == 0 {
                return Ok(());
            }
            self.debug.raw(&buf[..n]);
        }
    }

    async fn fail_write(&mut self, e: std::io::Error) -> Error {
        warn!("IMAP write failed, closing connection: {}", e);
        self.debug
            .info(&format!("ERROR: Failed to write to the server: {}", e));
        self.close().await;
        Error::ConnectionWrite(e)
    }
}

/// Rewind `data` and copy it to `out` one chunk per write
async fn copy_literal<W>(
    data: &mut dyn LiteralSource,
    out: &mut W,
    chunk_size: usize,
) -> std::io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    data.rewind().await?;

    let mut buf = vec![0u8; chunk_size];
    let mut copied = 0u64;
    loop {
        let n = data.read_chunk(&mut buf).await?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n]).await?;
        copied += n as u64;
    }
    out.flush().await?;

    Ok(copied)
}
