//! Error types for imapwire

use thiserror::Error;

/// Main error type for imapwire
#[derive(Error, Debug)]
pub enum Error {
    #[error("Error when writing to the mail server: {0}")]
    ConnectionWrite(#[source] std::io::Error),

    #[error("Mail server closed the connection unexpectedly")]
    ServerDisconnected,

    /// The read deadline expired, or the stream ended before any byte of the
    /// unit arrived. A deadline hit partway through a unit also lands here.
    #[error("Error when communicating with the mail server: read timed out or no data received")]
    ServerReadTimeout,

    #[error("Error when reading from the mail server: {0}")]
    ServerRead(#[source] std::io::Error),

    #[error("Connection is closed")]
    Closed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for imapwire
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Error::ConnectionWrite(_) => "SERVER_WRITEERROR",
            Error::ServerDisconnected => "DISCONNECT",
            Error::ServerReadTimeout => "SERVER_READERROR",
            Error::ServerRead(_) => "SERVER_READERROR",
            Error::Closed => "CLOSED",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the connection that raised this error is unusable afterwards
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConnectionWrite(_)
                | Error::ServerDisconnected
                | Error::ServerReadTimeout
                | Error::ServerRead(_)
                | Error::Closed
        )
    }
}
