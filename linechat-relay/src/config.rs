//! Configuration system for the `LineChat` relay.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/linechat-relay/config.toml`)
//! 4. Compiled defaults
//!
//! A config file that is missing, unreadable, or malformed is ignored as a
//! whole; the caller gets the error back to log it and carries on with the
//! remaining layers.

use std::ops::Range;
use std::path::PathBuf;
use std::time::Duration;

use rand::Rng;

use crate::relay::{DEFAULT_MAX_LINE_LENGTH, RelaySettings};
use crate::sink::DEFAULT_OUTBOUND_QUEUE;

/// Host used when none is configured.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Range the stream port is drawn from when none is configured.
pub const TCP_PORT_RANGE: Range<u16> = 8000..9000;

/// Range the datagram port is drawn from when none is configured.
pub const UDP_PORT_RANGE: Range<u16> = 9000..10000;

/// Errors that can occur when loading relay configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure for the relay.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct RelayConfigFile {
    server: ServerFileConfig,
}

/// `[server]` section of the relay config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    host: Option<String>,
    #[serde(alias = "tcpPort")]
    tcp_port: Option<u16>,
    #[serde(alias = "udpPort")]
    udp_port: Option<u16>,
    outbound_queue: Option<usize>,
    idle_timeout_secs: Option<u64>,
    max_line_length: Option<usize>,
}

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// CLI arguments for the relay.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "LineChat relay server")]
pub struct RelayCliArgs {
    /// Host to bind the stream listener to and to send announcements to.
    #[arg(long, env = "LINECHAT_HOST")]
    pub host: Option<String>,

    /// Stream (TCP) port.
    #[arg(long, env = "LINECHAT_TCP_PORT")]
    pub tcp_port: Option<u16>,

    /// Datagram (UDP) port.
    #[arg(long, env = "LINECHAT_UDP_PORT")]
    pub udp_port: Option<u16>,

    /// Path to config file (default: `~/.config/linechat-relay/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Lines buffered per client before broadcasts to it are dropped.
    #[arg(long)]
    pub outbound_queue: Option<usize>,

    /// Close clients that send nothing for this many seconds.
    #[arg(long)]
    pub idle_timeout_secs: Option<u64>,

    /// Close clients that send a line longer than this many bytes.
    #[arg(long)]
    pub max_line_length: Option<usize>,

    /// Ask on the console whether to change the UDP port before starting.
    #[arg(long)]
    pub ask_udp_port: bool,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "LINECHAT_LOG")]
    pub log_level: String,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved relay configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Host for the stream listener and the announcement target.
    pub host: String,
    /// Stream (TCP) port.
    pub tcp_port: u16,
    /// Datagram (UDP) port.
    pub udp_port: u16,
    /// Capacity of each session's outbound queue.
    pub outbound_queue: usize,
    /// Idle timeout for sessions; `None` waits forever.
    pub idle_timeout: Option<Duration>,
    /// Longest accepted client line in bytes.
    pub max_line_length: usize,
    /// Log level filter string.
    pub log_level: String,
}

impl Default for RelayConfig {
    /// Defaults with freshly drawn random ports.
    fn default() -> Self {
        let mut rng = rand::rng();
        Self {
            host: DEFAULT_HOST.to_string(),
            tcp_port: rng.random_range(TCP_PORT_RANGE),
            udp_port: rng.random_range(UDP_PORT_RANGE),
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            idle_timeout: None,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            log_level: "info".to_string(),
        }
    }
}

impl RelayConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// Never fails: if the file cannot be read or parsed it is skipped and
    /// the error is returned alongside the resolved config for logging. A
    /// missing file at the default location is not an error.
    #[must_use]
    pub fn load(cli: &RelayCliArgs) -> (Self, Option<ConfigError>) {
        match load_config_file(cli.config.as_deref()) {
            Ok(file) => (Self::resolve(cli, &file), None),
            Err(e) => (Self::resolve(cli, &RelayConfigFile::default()), Some(e)),
        }
    }

    /// Resolve a `RelayConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    #[must_use]
    fn resolve(cli: &RelayCliArgs, file: &RelayConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            host: cli
                .host
                .clone()
                .or_else(|| file.server.host.clone())
                .unwrap_or(defaults.host),
            tcp_port: cli
                .tcp_port
                .or(file.server.tcp_port)
                .unwrap_or(defaults.tcp_port),
            udp_port: cli
                .udp_port
                .or(file.server.udp_port)
                .unwrap_or(defaults.udp_port),
            outbound_queue: cli
                .outbound_queue
                .or(file.server.outbound_queue)
                .unwrap_or(defaults.outbound_queue),
            idle_timeout: cli
                .idle_timeout_secs
                .or(file.server.idle_timeout_secs)
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            max_line_length: cli
                .max_line_length
                .or(file.server.max_line_length)
                .filter(|max| *max > 0)
                .unwrap_or(defaults.max_line_length),
            log_level: cli.log_level.clone(),
        }
    }

    /// Address the stream listener binds to.
    #[must_use]
    pub fn tcp_addr(&self) -> String {
        join_host_port(&self.host, self.tcp_port)
    }

    /// Per-session settings for the relay state.
    #[must_use]
    pub const fn settings(&self) -> RelaySettings {
        RelaySettings {
            outbound_queue: self.outbound_queue,
            idle_timeout: self.idle_timeout,
            max_line_length: self.max_line_length,
        }
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Formats `host:port`, bracketing IPv6 literals.
fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Load and parse a TOML config file for the relay.
fn load_config_file(
    explicit_path: Option<&std::path::Path>,
) -> Result<RelayConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(RelayConfigFile::default());
        };
        config_dir.join("linechat-relay").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RelayConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
