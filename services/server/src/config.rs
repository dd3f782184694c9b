//! Server configuration
//!
//! Loaded from environment variables with sensible defaults; every knob
//! has an `ENGINE_`-prefixed variable. Queue capacities are bounded by
//! design: a full queue drops and counts rather than blocking the
//! producer.

use std::net::Ipv4Addr;
use std::str::FromStr;

/// Runtime configuration for the engine server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP listen address.
    pub tcp_addr: String,
    pub tcp_port: u16,
    pub tcp_enabled: bool,

    /// Multicast group for market data.
    pub multicast_group: Ipv4Addr,
    pub multicast_port: u16,
    pub multicast_enabled: bool,
    pub multicast_ttl: u32,

    /// Maximum concurrent TCP clients; excess connections are refused.
    pub max_tcp_clients: usize,

    /// Bounded queue capacities.
    pub engine_queue_capacity: usize,
    pub client_queue_capacity: usize,
    pub multicast_queue_capacity: usize,

    /// Symbols pre-registered at startup.
    pub symbols: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tcp_addr: "0.0.0.0".to_string(),
            tcp_port: 1234,
            tcp_enabled: true,
            multicast_group: Ipv4Addr::new(239, 255, 0, 1),
            multicast_port: 1236,
            multicast_enabled: true,
            multicast_ttl: 1,
            max_tcp_clients: 1024,
            engine_queue_capacity: 100_000,
            client_queue_capacity: 10_000,
            multicast_queue_capacity: 50_000,
            symbols: ["IBM", "AAPL", "GOOG", "MSFT", "TSLA"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the environment, falling back to defaults
    /// for unset or unparseable variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            tcp_addr: env_or("ENGINE_TCP_ADDR", defaults.tcp_addr),
            tcp_port: env_parse("ENGINE_TCP_PORT", defaults.tcp_port),
            tcp_enabled: env_parse("ENGINE_TCP_ENABLED", defaults.tcp_enabled),
            multicast_group: env_parse("ENGINE_MCAST_GROUP", defaults.multicast_group),
            multicast_port: env_parse("ENGINE_MCAST_PORT", defaults.multicast_port),
            multicast_enabled: env_parse("ENGINE_MCAST_ENABLED", defaults.multicast_enabled),
            multicast_ttl: env_parse("ENGINE_MCAST_TTL", defaults.multicast_ttl),
            max_tcp_clients: env_parse("ENGINE_MAX_TCP_CLIENTS", defaults.max_tcp_clients),
            engine_queue_capacity: env_parse(
                "ENGINE_QUEUE_CAPACITY",
                defaults.engine_queue_capacity,
            ),
            client_queue_capacity: env_parse(
                "ENGINE_CLIENT_QUEUE_CAPACITY",
                defaults.client_queue_capacity,
            ),
            multicast_queue_capacity: env_parse(
                "ENGINE_MCAST_QUEUE_CAPACITY",
                defaults.multicast_queue_capacity,
            ),
            symbols: std::env::var("ENGINE_SYMBOLS")
                .map(|s| {
                    s.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or(defaults.symbols),
        }
    }

    /// TCP listen address in `host:port` form.
    pub fn tcp_listen_addr(&self) -> String {
        format!("{}:{}", self.tcp_addr, self.tcp_port)
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
