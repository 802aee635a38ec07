//! imapwire probe - connects to an IMAP server and dumps the wire exchange

use anyhow::{Context, Result};
use imapwire_common::config::{Config, LoggingConfig};
use imapwire_core::debug::sink_from_config;
use imapwire_core::{Connection, Token, Tokenize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // An explicit config path may be given as the only argument
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(std::path::Path::new(&path))?,
        None => Config::load()?,
    };

    init_logging(&config.logging);

    let addr = format!("{}:{}", config.probe.host, config.probe.port);
    info!("Connecting to {}", addr);

    let stream = TcpStream::connect(&addr)
        .await
        .with_context(|| format!("Failed to connect to {}", addr))?;
    let debug = sink_from_config(&config.debug).context("Failed to open debug log")?;
    let mut conn = Connection::new(stream, config.connection.clone(), debug);

    let greeting = conn.read().await?;
    log_unit(&greeting);

    for (tag, command) in [("1", "CAPABILITY"), ("2", "LOGOUT")] {
        conn.write(tag.as_bytes(), false).await?;
        conn.write(b" ", false).await?;
        conn.write(command.as_bytes(), true).await?;

        let units = read_until_tagged(&mut conn, tag).await?;
        info!("{} completed with {} response(s)", command, units.len());
    }

    conn.close().await;
    info!("Probe finished");

    Ok(())
}

/// Read units until one starts with `tag`
async fn read_until_tagged<S>(conn: &mut Connection<S>, tag: &str) -> Result<Vec<Tokenize>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut units = Vec::new();
    loop {
        let unit = conn.read().await?;
        log_unit(&unit);

        let tagged = matches!(unit.tokens().first(), Some(Token::Atom(t)) if t == tag);
        units.push(unit);
        if tagged {
            return Ok(units);
        }
    }
}

fn log_unit(unit: &Tokenize) {
    let literals = unit.literals().count();
    info!(
        literals,
        "S: {}",
        String::from_utf8_lossy(&unit.to_bytes())
    );
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},imapwire=debug", config.level)));

    if config.format == "json" {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(true).with_level(true))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true))
            .with(filter)
            .init();
    }
}
