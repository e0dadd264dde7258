//! Server configuration.
//!
//! Values come from the environment (a `.env` file is loaded first if
//! present) and can be overridden by CLI flags.
//!
//! | Variable                      | Default     |
//! |-------------------------------|-------------|
//! | `MATRIX_API_HOST`             | `0.0.0.0`   |
//! | `MATRIX_API_PORT`             | `8080`      |
//! | `MATRIX_API_STRATEGY`         | `streaming` |
//! | `MATRIX_API_CHANNEL_CAPACITY` | `64`        |
//! | `MATRIX_API_UPLOAD_BUFFER`    | `16`        |
//! | `MATRIX_API_MAX_UPLOAD_BYTES` | `52428800`  |

use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use clap::ValueEnum;

use crate::error::{ConfigError, ConfigResult};
use crate::service::streaming::DEFAULT_CHANNEL_CAPACITY;

pub const DEFAULT_PORT: u16 = 8080;

/// Chunks of an upload that may be queued ahead of the parser.
pub const DEFAULT_UPLOAD_BUFFER: usize = 16;

/// Request body limit, 50 MB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Which [`MatrixProcessor`](crate::service::MatrixProcessor) backs the
/// file-stream endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Strategy {
    Serial,
    #[default]
    Streaming,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Serial => write!(f, "serial"),
            Strategy::Streaming => write!(f, "streaming"),
        }
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "serial" => Ok(Strategy::Serial),
            "streaming" | "concurrent" => Ok(Strategy::Streaming),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub strategy: Strategy,
    /// Bound on values the streaming producer may run ahead of its consumer.
    pub channel_capacity: usize,
    /// Bound on upload chunks queued ahead of the parser.
    pub upload_buffer: usize,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            strategy: Strategy::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            upload_buffer: DEFAULT_UPLOAD_BUFFER,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> ConfigResult<Self> {
        // Try loading .env file
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            host: parse_var(&lookup, "MATRIX_API_HOST")?.unwrap_or(defaults.host),
            port: parse_var(&lookup, "MATRIX_API_PORT")?.unwrap_or(defaults.port),
            strategy: match lookup("MATRIX_API_STRATEGY") {
                Some(raw) => raw.parse()?,
                None => defaults.strategy,
            },
            channel_capacity: parse_var(&lookup, "MATRIX_API_CHANNEL_CAPACITY")?
                .unwrap_or(defaults.channel_capacity),
            upload_buffer: parse_var(&lookup, "MATRIX_API_UPLOAD_BUFFER")?
                .unwrap_or(defaults.upload_buffer),
            max_upload_bytes: parse_var(&lookup, "MATRIX_API_MAX_UPLOAD_BYTES")?
                .unwrap_or(defaults.max_upload_bytes),
        };
        Ok(config.normalized())
    }

    /// Clamp capacities to at least 1.
    pub fn normalized(mut self) -> Self {
        self.channel_capacity = self.channel_capacity.max(1);
        self.upload_buffer = self.upload_buffer.max(1);
        self
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> ConfigResult<Option<T>>
where
    F: Fn(&'static str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}
