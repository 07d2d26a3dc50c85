use tokio::sync::{mpsc, oneshot};

use super::command::HubCommand;
use super::{EvictionNotice, HubError};
use crate::message::Message;
use crate::types::{ConnectionId, HubStats};

/// Cloneable entry point to a running hub.
///
/// Every method funnels through the hub's single command channel, so
/// requests from all clones are applied in the order they were accepted.
#[derive(Debug, Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    pub(crate) fn new(commands: mpsc::Sender<HubCommand>) -> Self {
        Self { commands }
    }

    /// Add a connection to the membership set.
    ///
    /// Returns once the hub has applied it; any broadcast issued afterwards
    /// reaches `outbound`. The returned notice fires if the hub later evicts
    /// the connection.
    pub async fn register(
        &self,
        id: ConnectionId,
        outbound: mpsc::Sender<Message>,
    ) -> Result<EvictionNotice, HubError> {
        let (done, applied) = oneshot::channel();
        self.send(HubCommand::Register { id, outbound, done })
            .await?;
        applied.await.map_err(|_| HubError::Stopped)
    }

    /// Remove a connection and close its outbound queue.
    ///
    /// Safe to call for a connection that is already gone; returns whether
    /// this call removed it.
    pub async fn unregister(&self, id: ConnectionId) -> Result<bool, HubError> {
        let (done, applied) = oneshot::channel();
        self.send(HubCommand::Unregister { id, done }).await?;
        applied.await.map_err(|_| HubError::Stopped)
    }

    /// Hand a message to the hub for fan-out.
    ///
    /// Waits only for room in the hub's intake, never for recipients.
    pub async fn broadcast(&self, message: Message) -> Result<(), HubError> {
        self.send(HubCommand::Broadcast(message)).await
    }

    /// Connections currently registered
    pub async fn members(&self) -> Result<Vec<ConnectionId>, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Members { reply }).await?;
        rx.await.map_err(|_| HubError::Stopped)
    }

    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Stats { reply }).await?;
        rx.await.map_err(|_| HubError::Stopped)
    }

    async fn send(&self, command: HubCommand) -> Result<(), HubError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| HubError::Stopped)
    }
}
