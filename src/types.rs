use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Opaque handle for one live connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(Ulid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Point-in-time counters taken inside the hub loop
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubStats {
    /// Currently registered connections
    pub connections: usize,
    /// Broadcast requests processed since startup
    pub messages_broadcast: u64,
    /// Messages successfully queued to a recipient
    pub deliveries: u64,
    /// Connections dropped because their outbound queue was full or closed
    pub evictions: u64,
}
