use chrono::{DateTime, Utc};

use crate::config::ServerConfig;
use crate::hub::{Hub, HubHandle};

/// Shared application state
pub struct AppState {
    /// The process-wide hub; every accepted socket registers here
    pub hub: HubHandle,
    pub config: ServerConfig,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Spawns the hub, so this must run inside a Tokio runtime
    pub fn new(config: ServerConfig) -> Self {
        let hub = Hub::spawn(config.intake_capacity);
        Self {
            hub,
            config,
            started_at: Utc::now(),
        }
    }
}
