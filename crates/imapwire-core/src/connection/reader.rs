//! Incoming side of the connection

use super::Connection;
use crate::tokenize::{LiteralMarker, Tokenize};
use imapwire_common::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite};
use tracing::{debug, warn};

/// Position of `read` within one response unit
#[derive(Debug)]
enum ReadState {
    AwaitingLine,
    AwaitingLiteral {
        remaining: u64,
        marker: LiteralMarker,
    },
    Done,
    Fatal(ReadFailure),
}

#[derive(Debug)]
enum ReadFailure {
    Eof,
    Timeout,
    Io(std::io::Error),
    Closed,
}

impl From<std::io::Error> for ReadFailure {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ReadFailure::Eof
        } else {
            ReadFailure::Io(e)
        }
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Read one complete response unit.
    ///
    /// Lines ending in a literal marker are followed by exactly the declared
    /// number of payload bytes, after which the unit continues with the next
    /// line. The unit ends with the first line that carries no marker.
    pub async fn read(&mut self) -> Result<Tokenize> {
        self.ensure_open()?;

        let mut tokens = Tokenize::new();
        let mut line = Vec::new();
        let mut chunk = Vec::new();
        let mut literal_buf = Vec::new();
        let mut got_data = false;
        let mut state = ReadState::AwaitingLine;

        loop {
            state = match state {
                ReadState::AwaitingLine => {
                    chunk.clear();
                    match self.read_line_chunk(&mut chunk).await {
                        Err(failure) => {
                            // read_until keeps what it consumed before failing
                            got_data |= !chunk.is_empty();
                            ReadState::Fatal(failure)
                        }
                        Ok(()) => {
                            got_data = true;
                            line.extend_from_slice(&chunk);

                            if chunk.last() != Some(&b'\n') {
                                ReadState::AwaitingLine
                            } else {
                                while matches!(line.last(), Some(b'\r' | b'\n')) {
                                    line.pop();
                                }
                                self.debug.server(&line);
                                tokens.add_line(&line);
                                line.clear();

                                match tokens.literal_length() {
                                    None => ReadState::Done,
                                    Some(marker) => {
                                        tokens.start_literal();
                                        if marker.length == 0 {
                                            ReadState::AwaitingLine
                                        } else {
                                            ReadState::AwaitingLiteral {
                                                remaining: marker.length,
                                                marker,
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }

                ReadState::AwaitingLiteral { remaining, marker } => {
                    let chunk_size = self.config.chunk_size.max(1);
                    let want = remaining.min(chunk_size as u64) as usize;
                    literal_buf.resize(want, 0);

                    match self.read_literal_chunk(&mut literal_buf).await {
                        Err(failure) => ReadState::Fatal(failure),
                        Ok(n) => {
                            got_data = true;
                            let data = &literal_buf[..n];
                            tokens.add_literal(data);
                            if self.config.debug_literal {
                                self.debug.raw(data);
                            }

                            let remaining = remaining - n as u64;
                            if remaining > 0 {
                                ReadState::AwaitingLiteral { remaining, marker }
                            } else {
                                if !self.config.debug_literal {
                                    let kind = if marker.binary { "BINARY" } else { "LITERAL" };
                                    self.debug.server(
                                        format!("[{} DATA: {} bytes]", kind, marker.length)
                                            .as_bytes(),
                                    );
                                }
                                ReadState::AwaitingLine
                            }
                        }
                    }
                }

                ReadState::Done => return Ok(tokens),

                ReadState::Fatal(failure) => return Err(self.fail_read(failure, got_data).await),
            };
        }
    }

    /// Read up to one line, bounded by the chunk size
    async fn read_line_chunk(
        &mut self,
        chunk: &mut Vec<u8>,
    ) -> std::result::Result<(), ReadFailure> {
        let limit = self.config.chunk_size.max(1) as u64;
        let deadline = self.config.read_timeout();
        let stream = self.stream.as_mut().ok_or(ReadFailure::Closed)?;

        let mut limited = (&mut *stream).take(limit);
        let n = with_deadline(deadline, limited.read_until(b'\n', chunk)).await?;
        if n == 0 {
            return Err(ReadFailure::Eof);
        }
        Ok(())
    }

    /// Read up to `buf.len()` literal bytes
    async fn read_literal_chunk(
        &mut self,
        buf: &mut [u8],
    ) -> std::result::Result<usize, ReadFailure> {
        let deadline = self.config.read_timeout();
        let stream = self.stream.as_mut().ok_or(ReadFailure::Closed)?;

        let n = with_deadline(deadline, stream.read(buf)).await?;
        if n == 0 {
            return Err(ReadFailure::Eof);
        }
        Ok(n)
    }

    async fn fail_read(&mut self, failure: ReadFailure, got_data: bool) -> Error {
        let (message, error) = match failure {
            ReadFailure::Closed => return Error::Closed,
            ReadFailure::Eof if got_data => (
                "ERROR: Server closed the connection.".to_string(),
                Error::ServerDisconnected,
            ),
            ReadFailure::Eof | ReadFailure::Timeout => (
                "ERROR: IMAP read/timeout error.".to_string(),
                Error::ServerReadTimeout,
            ),
            ReadFailure::Io(e) => (format!("ERROR: {}", e), Error::ServerRead(e)),
        };

        warn!("IMAP read failed, closing connection: {}", error);
        self.debug.info(&message);
        self.close().await;
        error
    }
}

async fn with_deadline<F, T>(
    deadline: Option<Duration>,
    fut: F,
) -> std::result::Result<T, ReadFailure>
where
    F: Future<Output = std::io::Result<T>>,
{
    match deadline {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                debug!("IMAP read timed out after {:?}", limit);
                Err(ReadFailure::Timeout)
            }
        },
        None => Ok(fut.await?),
    }
}
