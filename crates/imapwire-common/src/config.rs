//! Configuration for imapwire

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Connection engine configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Wire debug log configuration
    #[serde(default)]
    pub debug: DebugConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Probe target configuration
    #[serde(default)]
    pub probe: ProbeConfig,
}

/// Connection engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Upper bound for a single line read, literal read or literal write
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Dump literal payloads to the debug sink instead of a summary line
    #[serde(default)]
    pub debug_literal: bool,

    /// Deadline for each individual read from the server
    #[serde(default)]
    pub read_timeout_secs: Option<u64>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            debug_literal: false,
            read_timeout_secs: None,
        }
    }
}

fn default_chunk_size() -> usize {
    8192
}

impl ConnectionConfig {
    /// Per-read deadline, if one is configured
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }

    /// Check values that serde cannot reject on its own
    pub fn validate(&self) -> crate::Result<()> {
        if self.chunk_size == 0 {
            return Err(crate::Error::Config(
                "connection.chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.read_timeout_secs == Some(0) {
            return Err(crate::Error::Config(
                "connection.read_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Wire debug log configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Enable the wire debug log
    #[serde(default)]
    pub enabled: bool,

    /// Write the wire log to this file instead of the tracing output
    pub file: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Probe target configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// IMAP server hostname
    #[serde(default = "default_probe_host")]
    pub host: String,

    /// IMAP server port
    #[serde(default = "default_probe_port")]
    pub port: u16,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            host: default_probe_host(),
            port: default_probe_port(),
        }
    }
}

fn default_probe_host() -> String {
    "localhost".to_string()
}

fn default_probe_port() -> u16 {
    143
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        config.connection.validate()?;

        Ok(config)
    }

    /// Load configuration from the default locations, falling back to defaults
    pub fn load() -> crate::Result<Self> {
        let paths = [
            std::path::PathBuf::from("./imapwire.toml"),
            std::path::PathBuf::from("/etc/imapwire/config.toml"),
        ];

        for path in paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let connection = ConnectionConfig::default();
        assert_eq!(connection.chunk_size, 8192);
        assert!(!connection.debug_literal);
        assert_eq!(connection.read_timeout(), None);

        let probe = ProbeConfig::default();
        assert_eq!(probe.host, "localhost");
        assert_eq!(probe.port, 143);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[connection]
chunk_size = 4096
debug_literal = true
read_timeout_secs = 30

[debug]
enabled = true
file = "/tmp/imap-debug.log"

[logging]
format = "json"

[probe]
host = "imap.example.com"
port = 993
"#;

        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.connection.chunk_size, 4096);
        assert!(config.connection.debug_literal);
        assert_eq!(config.connection.read_timeout(), Some(Duration::from_secs(30)));
        assert!(config.debug.enabled);
        assert_eq!(config.debug.file, Some(PathBuf::from("/tmp/imap-debug.log")));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.probe.host, "imap.example.com");
        assert_eq!(config.probe.port, 993);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.connection.chunk_size, 8192);
        assert!(!config.debug.enabled);
        assert_eq!(config.logging.format, "text");
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err = Config::from_toml("[connection]\nchunk_size = 0\n").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_zero_read_timeout_rejected() {
        let err = Config::from_toml("[connection]\nread_timeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));

        let config = Config::from_toml("[connection]\nread_timeout_secs = 15\n").unwrap();
        assert_eq!(
            config.connection.read_timeout(),
            Some(std::time::Duration::from_secs(15))
        );
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[probe]\nport = 1143").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.probe.port, 1143);

        let missing = Config::from_file(std::path::Path::new("/nonexistent/imapwire.toml"));
        assert!(missing.is_err());
    }
}
