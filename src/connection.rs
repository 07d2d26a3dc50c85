//! Per-connection lifecycle
//!
//! Each connection runs two tasks: a reader that forwards inbound messages
//! to the hub, and a writer that drains the connection's outbound queue into
//! the transport. A supervisor waits for whichever ends first and tears
//! down the rest:
//!
//! - reader ends: unregister, which closes the queue, so the writer drains
//!   what is left, closes the sink and exits
//! - writer ends (send failure or eviction by the hub): abort the reader,
//!   dropping the read side, then unregister
//!
//! An evicted writer stops at once, even mid-send to a peer that no longer
//! reads, and discards whatever is still queued. Unregistering an already
//! evicted connection is a no-op in the hub, so the paths can overlap freely.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::hub::{EvictionNotice, HubError, HubHandle};
use crate::message::Message;
use crate::transport::{MessageSink, MessageSource, TransportError};
use crate::types::ConnectionId;

/// Default number of messages a connection may have queued before the hub
/// evicts it
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// How long closing a transport may take before it is simply dropped
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// A registered connection whose reader and writer are running
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    supervisor: JoinHandle<()>,
}

impl Connection {
    /// Register a new connection with the hub, then start its tasks.
    ///
    /// Registration completes before either task starts, so the connection
    /// receives every broadcast the hub processes from here on. If the hub
    /// is gone the sink is closed and the error returned.
    pub async fn open<S, K>(
        hub: &HubHandle,
        source: S,
        mut sink: K,
        outbound_capacity: usize,
    ) -> Result<Self, HubError>
    where
        S: MessageSource + 'static,
        K: MessageSink + 'static,
    {
        let id = ConnectionId::new();
        let (outbound_tx, outbound_rx) = mpsc::channel(outbound_capacity.max(1));

        let eviction = match hub.register(id, outbound_tx).await {
            Ok(eviction) => eviction,
            Err(e) => {
                let _ = sink.close().await;
                return Err(e);
            }
        };

        let supervisor = tokio::spawn(supervise(
            id,
            hub.clone(),
            source,
            sink,
            outbound_rx,
            eviction,
        ));
        Ok(Self { id, supervisor })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Wait until both directions are shut down and the hub has let go
    pub async fn closed(self) {
        if let Err(e) = self.supervisor.await {
            tracing::error!(connection = %self.id, "Connection supervisor failed: {}", e);
        }
    }
}

async fn supervise<S, K>(
    id: ConnectionId,
    hub: HubHandle,
    source: S,
    sink: K,
    outbound: mpsc::Receiver<Message>,
    eviction: EvictionNotice,
) where
    S: MessageSource + 'static,
    K: MessageSink + 'static,
{
    let mut writer = tokio::spawn(write_pump(id, sink, outbound, eviction));
    let mut reader = tokio::spawn(read_pump(id, source, hub.clone()));

    tokio::select! {
        _ = &mut reader => {
            unregister(&hub, id).await;
            if let Err(e) = writer.await {
                tracing::error!(connection = %id, "Writer task failed: {}", e);
            }
        }
        _ = &mut writer => {
            reader.abort();
            // Cancelled reader: nothing more from this peer reaches the hub
            let _ = reader.await;
            unregister(&hub, id).await;
        }
    }

    tracing::info!(connection = %id, "Connection closed");
}

async fn unregister(hub: &HubHandle, id: ConnectionId) {
    match hub.unregister(id).await {
        Ok(true) => {}
        Ok(false) => tracing::debug!(connection = %id, "Already removed from hub"),
        Err(e) => tracing::warn!(connection = %id, "Could not unregister: {}", e),
    }
}

/// Forward every inbound message to the hub until the transport fails
pub async fn read_pump<S: MessageSource>(id: ConnectionId, mut source: S, hub: HubHandle) {
    loop {
        let message = match source.receive().await {
            Ok(message) => message,
            Err(TransportError::Closed) => {
                tracing::debug!(connection = %id, "Peer closed the connection");
                break;
            }
            Err(e) => {
                tracing::info!(connection = %id, "Read failed: {}", e);
                break;
            }
        };

        tracing::trace!(connection = %id, bytes = message.len(), "Received message");

        if let Err(e) = hub.broadcast(message).await {
            tracing::error!(connection = %id, "Dropping inbound message: {}", e);
            break;
        }
    }
}

/// Drain the outbound queue into the transport.
///
/// Ends when the hub closes the queue, a send fails or the hub evicts the
/// connection; the sink is closed in every case. Eviction interrupts a
/// pending send and drops the rest of the queue.
pub async fn write_pump<K: MessageSink>(
    id: ConnectionId,
    mut sink: K,
    mut outbound: mpsc::Receiver<Message>,
    eviction: EvictionNotice,
) {
    tokio::select! {
        _ = drain(id, &mut sink, &mut outbound) => {}
        true = eviction.evicted() => {
            tracing::info!(connection = %id, "Evicted by hub, discarding queued messages");
        }
    }

    match tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(connection = %id, "Close failed: {}", e),
        Err(_) => tracing::debug!(connection = %id, "Close timed out, dropping transport"),
    }
}

async fn drain<K: MessageSink>(
    id: ConnectionId,
    sink: &mut K,
    outbound: &mut mpsc::Receiver<Message>,
) {
    while let Some(message) = outbound.recv().await {
        if let Err(e) = sink.send(message).await {
            tracing::info!(connection = %id, "Write failed: {}", e);
            break;
        }
    }
}
