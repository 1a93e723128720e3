//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Every key has a default, so an empty
//! environment yields a working configuration.

use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::error::GatewayError;

/// Fixed TCP port remote clients connect to.
pub const DEFAULT_CLIENT_PORT: u16 = 33882;

/// Port of the operator control API.
pub const DEFAULT_CONTROL_PORT: u16 = 33883;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(GatewayError::InvalidConfig(format!(
                "unknown LOG_FORMAT `{other}`"
            ))),
        }
    }
}

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address the client WebSocket listener binds (all interfaces).
    pub client_listen_addr: SocketAddr,

    /// Address the operator control API binds.
    pub control_listen_addr: SocketAddr,

    /// Capacity of the EventBus broadcast channel.
    pub event_bus_capacity: usize,

    /// Frames buffered per connection before sends report backpressure.
    pub outbound_queue_capacity: usize,

    /// How long the control API refuses a new execute after one is accepted.
    pub execute_cooldown: Duration,

    /// Tracing output format.
    pub log_format: LogFormat,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            client_listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_CLIENT_PORT)),
            control_listen_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_CONTROL_PORT)),
            event_bus_capacity: 1_024,
            outbound_queue_capacity: 64,
            execute_cooldown: Duration::from_millis(1_000),
            log_format: LogFormat::Text,
        }
    }
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidConfig`] if a listen address or the
    /// log format is set but cannot be parsed.
    pub fn from_env() -> Result<Self, GatewayError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`GatewayConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let client_listen_addr = parse_addr(&lookup, "CLIENT_LISTEN_ADDR")?
            .unwrap_or(defaults.client_listen_addr);
        let control_listen_addr = parse_addr(&lookup, "CONTROL_LISTEN_ADDR")?
            .unwrap_or(defaults.control_listen_addr);

        let event_bus_capacity =
            parse_or(&lookup, "EVENT_BUS_CAPACITY", defaults.event_bus_capacity).max(1);
        let outbound_queue_capacity = parse_or(
            &lookup,
            "OUTBOUND_QUEUE_CAPACITY",
            defaults.outbound_queue_capacity,
        )
        .max(1);
        let execute_cooldown = lookup("EXECUTE_COOLDOWN_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .map_or(defaults.execute_cooldown, Duration::from_millis);

        let log_format = match lookup("LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => defaults.log_format,
        };

        Ok(Self {
            client_listen_addr,
            control_listen_addr,
            event_bus_capacity,
            outbound_queue_capacity,
            execute_cooldown,
            log_format,
        })
    }
}

fn parse_addr<F>(lookup: &F, key: &str) -> Result<Option<SocketAddr>, GatewayError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.parse().map_err(|e| {
                GatewayError::InvalidConfig(format!("{key}=`{raw}` is not a socket address: {e}"))
            })
        })
        .transpose()
}

/// Parses a value as `T`, returning `default` on missing or invalid values.
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}
