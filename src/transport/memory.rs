//! In-process transport
//!
//! Pairs a server-side [`MemorySource`]/[`MemorySink`] with a client-side
//! [`MemoryPeer`]. Used to drive connections without sockets, including
//! forcing a link to fail and simulating a client that stops reading.
//!
//! This exists for tests (the crate's own and downstream ones); the server
//! itself only ever uses the WebSocket adapters in [`crate::ws::socket`].

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use super::{MessageSink, MessageSource, TransportError};
use crate::message::Message;

/// Create a connected transport.
///
/// `buffer` bounds how many server-to-client messages can sit unread at the
/// peer before `MemorySink::send` starts waiting.
pub fn pair(buffer: usize) -> (MemorySource, MemorySink, MemoryPeer) {
    let (to_server, inbound) = mpsc::unbounded_channel();
    let (outbound, from_server) = mpsc::channel(buffer.max(1));
    let (broken_tx, broken_rx) = watch::channel(false);

    let source = MemorySource {
        inbound,
        broken: broken_rx.clone(),
    };
    let sink = MemorySink {
        outbound: Some(outbound),
        broken: broken_rx,
    };
    let peer = MemoryPeer {
        to_server,
        from_server,
        broken: broken_tx,
    };

    (source, sink, peer)
}

/// Resolves to `true` when the link is failed, `false` if the peer is gone
async fn link_failed(broken: &mut watch::Receiver<bool>) -> bool {
    loop {
        if *broken.borrow_and_update() {
            return true;
        }
        if broken.changed().await.is_err() {
            return false;
        }
    }
}

pub struct MemorySource {
    inbound: mpsc::UnboundedReceiver<Message>,
    broken: watch::Receiver<bool>,
}

#[async_trait]
impl MessageSource for MemorySource {
    async fn receive(&mut self) -> Result<Message, TransportError> {
        if *self.broken.borrow() {
            return Err(TransportError::Io("link failed".to_string()));
        }

        tokio::select! {
            msg = self.inbound.recv() => msg.ok_or(TransportError::Closed),
            failed = link_failed(&mut self.broken) => if failed {
                Err(TransportError::Io("link failed".to_string()))
            } else {
                // Peer dropped without failing the link
                Err(TransportError::Closed)
            },
        }
    }
}

pub struct MemorySink {
    outbound: Option<mpsc::Sender<Message>>,
    broken: watch::Receiver<bool>,
}

#[async_trait]
impl MessageSink for MemorySink {
    async fn send(&mut self, message: Message) -> Result<(), TransportError> {
        if *self.broken.borrow() {
            return Err(TransportError::Io("link failed".to_string()));
        }
        let outbound = self.outbound.as_ref().ok_or(TransportError::Closed)?;

        tokio::select! {
            sent = outbound.send(message) => sent.map_err(|_| TransportError::Closed),
            failed = link_failed(&mut self.broken) => if failed {
                Err(TransportError::Io("link failed".to_string()))
            } else {
                Err(TransportError::Closed)
            },
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.outbound.take();
        Ok(())
    }
}

/// Client end of an in-memory transport
pub struct MemoryPeer {
    to_server: mpsc::UnboundedSender<Message>,
    from_server: mpsc::Receiver<Message>,
    broken: watch::Sender<bool>,
}

impl MemoryPeer {
    /// Deliver a message to the server's source
    pub fn send(&self, message: Message) -> Result<(), TransportError> {
        self.to_server
            .send(message)
            .map_err(|_| TransportError::Closed)
    }

    /// Next message written by the server, or `None` once its sink closed
    pub async fn recv(&mut self) -> Option<Message> {
        self.from_server.recv().await
    }

    /// Message already written by the server, without waiting
    pub fn try_recv(&mut self) -> Option<Message> {
        self.from_server.try_recv().ok()
    }

    /// Break the link in both directions, as a dropped socket would
    pub fn fail(&self) {
        self.broken.send_replace(true);
    }
}
