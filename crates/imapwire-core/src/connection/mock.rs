//! Scripted stream for connection tests

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Serves the scripted read chunks one per `poll_read` (EOF or the configured
/// read error afterwards) and records every `poll_write` call separately.
pub struct MockStream {
    reads: VecDeque<Vec<u8>>,
    state: Arc<Mutex<MockState>>,
    fail_writes: bool,
    read_error: Option<io::ErrorKind>,
}

#[derive(Default)]
struct MockState {
    writes: Vec<Vec<u8>>,
    shutdown: bool,
}

/// Inspects what the connection did to a `MockStream`
#[derive(Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn written(&self) -> Vec<u8> {
        self.writes().concat()
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.lock().unwrap().shutdown
    }
}

impl MockStream {
    pub fn new(reads: Vec<Vec<u8>>) -> (Self, MockHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        let stream = Self {
            reads: reads.into(),
            state: state.clone(),
            fail_writes: false,
            read_error: None,
        };
        (stream, MockHandle { state })
    }

    pub fn failing_writes() -> (Self, MockHandle) {
        let (mut stream, handle) = Self::new(vec![]);
        stream.fail_writes = true;
        (stream, handle)
    }

    /// Serve `reads`, then fail every further read with `kind`
    pub fn failing_reads(reads: Vec<Vec<u8>>, kind: io::ErrorKind) -> (Self, MockHandle) {
        let (mut stream, handle) = Self::new(reads);
        stream.read_error = Some(kind);
        (stream, handle)
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.reads.pop_front() {
            Some(mut chunk) => {
                let n = chunk.len().min(buf.remaining());
                buf.put_slice(&chunk[..n]);
                if n < chunk.len() {
                    let rest = chunk.split_off(n);
                    self.reads.push_front(rest);
                }
            }
            None => {
                if let Some(kind) = self.read_error {
                    return Poll::Ready(Err(kind.into()));
                }
            }
        }
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.fail_writes {
            return Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()));
        }
        self.state.lock().unwrap().writes.push(buf.to_vec());
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.state.lock().unwrap().shutdown = true;
        Poll::Ready(Ok(()))
    }
}
