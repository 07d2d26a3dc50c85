//! Requests processed by the hub loop, one at a time.

use tokio::sync::{mpsc, oneshot};

use super::EvictionNotice;
use crate::message::Message;
use crate::types::{ConnectionId, HubStats};

pub enum HubCommand {
    /// Add a connection; `done` receives its eviction notice once it is part
    /// of the membership set
    Register {
        id: ConnectionId,
        outbound: mpsc::Sender<Message>,
        done: oneshot::Sender<EvictionNotice>,
    },
    /// Remove a connection if present; replies whether it was
    Unregister {
        id: ConnectionId,
        done: oneshot::Sender<bool>,
    },
    Broadcast(Message),
    Members {
        reply: oneshot::Sender<Vec<ConnectionId>>,
    },
    Stats {
        reply: oneshot::Sender<HubStats>,
    },
}

impl std::fmt::Debug for HubCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HubCommand::Register { id, .. } => write!(f, "Register({id})"),
            HubCommand::Unregister { id, .. } => write!(f, "Unregister({id})"),
            HubCommand::Broadcast(msg) => write!(f, "Broadcast({} bytes)", msg.len()),
            HubCommand::Members { .. } => f.write_str("Members"),
            HubCommand::Stats { .. } => f.write_str("Stats"),
        }
    }
}
