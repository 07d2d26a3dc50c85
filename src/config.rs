//! Server configuration loaded from the environment

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::connection::DEFAULT_OUTBOUND_CAPACITY;
use crate::hub::DEFAULT_INTAKE_CAPACITY;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_ASSETS_DIR: &str = "static";
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP/WebSocket listener binds to
    pub addr: SocketAddr,
    /// Directory holding `home.html` and any other static files
    pub assets_dir: PathBuf,
    /// Messages a connection may have queued before the hub evicts it
    pub outbound_capacity: usize,
    /// Pending requests the hub accepts before callers wait
    pub intake_capacity: usize,
    /// Largest inbound WebSocket message accepted
    pub max_message_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            assets_dir: PathBuf::from(DEFAULT_ASSETS_DIR),
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            intake_capacity: DEFAULT_INTAKE_CAPACITY,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

impl ServerConfig {
    /// Load config from environment variables, falling back to defaults for
    /// anything missing or invalid
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let addr = std::env::var("RELAYHUB_ADDR")
            .ok()
            .and_then(|raw| match parse_addr(&raw) {
                Some(addr) => Some(addr),
                None => {
                    tracing::warn!(value = %raw, "Invalid RELAYHUB_ADDR, using {}", DEFAULT_ADDR);
                    None
                }
            })
            .unwrap_or(defaults.addr);

        let assets_dir = std::env::var("RELAYHUB_ASSETS")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.assets_dir);

        let outbound_capacity =
            positive_env("RELAYHUB_OUTBOUND_CAPACITY", defaults.outbound_capacity);
        let intake_capacity = positive_env("RELAYHUB_INTAKE_CAPACITY", defaults.intake_capacity);
        let max_message_bytes =
            positive_env("RELAYHUB_MAX_MESSAGE_BYTES", defaults.max_message_bytes);

        tracing::info!(
            %addr,
            assets_dir = %assets_dir.display(),
            outbound_capacity,
            intake_capacity,
            max_message_bytes,
            "Server config loaded"
        );

        Self {
            addr,
            assets_dir,
            outbound_capacity,
            intake_capacity,
            max_message_bytes,
        }
    }
}

/// Accepts a full socket address or a bare `:port`, which binds all interfaces
fn parse_addr(raw: &str) -> Option<SocketAddr> {
    let raw = raw.trim();
    match raw.strip_prefix(':') {
        Some(port) => port
            .parse::<u16>()
            .ok()
            .map(|port| SocketAddr::from(([0, 0, 0, 0], port))),
        None => SocketAddr::from_str(raw).ok(),
    }
}

fn positive_env(key: &str, default: usize) -> usize {
    let Ok(raw) = std::env::var(key) else {
        return default;
    };

    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => value,
        _ => {
            tracing::warn!(key, value = %raw, "Expected a positive integer, using {}", default);
            default
        }
    }
}
