//! Wire debug sinks
//!
//! The connection reports every line it sends or receives, literal payloads
//! (or a summary of them) and fatal transport events to a [`DebugSink`].

use imapwire_common::config::DebugConfig;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Gap between two events after which the writer sink flags a slow command
const SLOW_COMMAND: Duration = Duration::from_secs(5);

/// Receiver for wire-level debug events
pub trait DebugSink: Send {
    /// Data sent to the server (without CRLF)
    fn client(&mut self, data: &[u8]);

    /// Data received from the server (without CRLF)
    fn server(&mut self, data: &[u8]);

    /// Protocol-fatal events and other notes
    fn info(&mut self, message: &str);

    /// Literal payload bytes, verbatim
    fn raw(&mut self, data: &[u8]);
}

impl<T: DebugSink + ?Sized> DebugSink for Box<T> {
    fn client(&mut self, data: &[u8]) {
        (**self).client(data)
    }

    fn server(&mut self, data: &[u8]) {
        (**self).server(data)
    }

    fn info(&mut self, message: &str) {
        (**self).info(message)
    }

    fn raw(&mut self, data: &[u8]) {
        (**self).raw(data)
    }
}

/// Build the sink selected by the `[debug]` configuration section
pub fn sink_from_config(config: &DebugConfig) -> std::io::Result<Box<dyn DebugSink>> {
    if !config.enabled {
        return Ok(Box::new(NoopDebug));
    }
    match &config.file {
        Some(path) => Ok(Box::new(WriterDebug::create(path)?)),
        None => Ok(Box::new(TracingDebug)),
    }
}

/// Discards all events
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDebug;

impl DebugSink for NoopDebug {
    fn client(&mut self, _data: &[u8]) {}
    fn server(&mut self, _data: &[u8]) {}
    fn info(&mut self, _message: &str) {}
    fn raw(&mut self, _data: &[u8]) {}
}

/// Forwards events to `tracing` under the `imapwire::wire` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDebug;

impl DebugSink for TracingDebug {
    fn client(&mut self, data: &[u8]) {
        debug!(target: "imapwire::wire", direction = "client", "{}", String::from_utf8_lossy(data));
    }

    fn server(&mut self, data: &[u8]) {
        debug!(target: "imapwire::wire", direction = "server", "{}", String::from_utf8_lossy(data));
    }

    fn info(&mut self, message: &str) {
        debug!(target: "imapwire::wire", direction = "info", "{}", message);
    }

    fn raw(&mut self, data: &[u8]) {
        debug!(
            target: "imapwire::wire",
            direction = "raw",
            bytes = data.len(),
            "{}",
            String::from_utf8_lossy(data)
        );
    }
}

/// Writes a plain-text wire log (`C: `, `S: `, `>> ` prefixes)
pub struct WriterDebug<W> {
    writer: W,
    last_event: Option<Instant>,
}

impl WriterDebug<File> {
    /// Append to the log file at `path`, creating it if needed
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write + Send> WriterDebug<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            last_event: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_event(&mut self, prefix: &str, data: &[u8]) {
        let now = Instant::now();
        let mut out = Vec::with_capacity(prefix.len() + data.len() + 1);

        match self.last_event {
            Some(last) => {
                let gap = now.duration_since(last);
                if gap > SLOW_COMMAND {
                    out.extend_from_slice(
                        format!(">> Slow IMAP Command: {:.3} seconds\n", gap.as_secs_f64())
                            .as_bytes(),
                    );
                }
            }
            None => {
                out.extend_from_slice(
                    format!(
                        "{}\n>> Timestamp: {}\n",
                        "-".repeat(30),
                        chrono::Local::now().to_rfc2822()
                    )
                    .as_bytes(),
                );
            }
        }
        self.last_event = Some(now);

        out.extend_from_slice(prefix.as_bytes());
        out.extend_from_slice(data);
        out.push(b'\n');
        self.emit(&out);
    }

    fn emit(&mut self, bytes: &[u8]) {
        if let Err(e) = self.writer.write_all(bytes).and_then(|_| self.writer.flush()) {
            warn!("Failed to write IMAP debug log: {}", e);
        }
    }
}

impl<W: Write + Send> DebugSink for WriterDebug<W> {
    fn client(&mut self, data: &[u8]) {
        self.write_event("C: ", data);
    }

    fn server(&mut self, data: &[u8]) {
        self.write_event("S: ", data);
    }

    fn info(&mut self, message: &str) {
        self.write_event(">> ", message.as_bytes());
    }

    fn raw(&mut self, data: &[u8]) {
        self.emit(data);
    }
}

/// A recorded debug event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugEvent {
    Client(Vec<u8>),
    Server(Vec<u8>),
    Info(String),
    Raw(Vec<u8>),
}

/// Records events in memory; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct MemoryDebug {
    events: Arc<Mutex<Vec<DebugEvent>>>,
}

impl MemoryDebug {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events recorded so far
    pub fn events(&self) -> Vec<DebugEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn clear(&self) {
        match self.events.lock() {
            Ok(mut events) => events.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    fn record(&self, event: DebugEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

impl DebugSink for MemoryDebug {
    fn client(&mut self, data: &[u8]) {
        self.record(DebugEvent::Client(data.to_vec()));
    }

    fn server(&mut self, data: &[u8]) {
        self.record(DebugEvent::Server(data.to_vec()));
    }

    fn info(&mut self, message: &str) {
        self.record(DebugEvent::Info(message.to_string()));
    }

    fn raw(&mut self, data: &[u8]) {
        self.record(DebugEvent::Raw(data.to_vec()));
    }
}
