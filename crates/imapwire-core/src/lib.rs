//! imapwire Core - IMAP line/literal connection engine
//!
//! This crate turns a duplex byte stream into IMAP response units
//! (text lines with embedded literals) and writes command fragments and
//! literal payloads back onto it.

pub mod connection;
pub mod debug;
pub mod tokenize;

pub use connection::{Connection, LiteralSource, OutputBuffer};
pub use debug::{DebugEvent, DebugSink, MemoryDebug, NoopDebug, TracingDebug, WriterDebug};
pub use tokenize::{LiteralMarker, Segment, Token, Tokenize};
