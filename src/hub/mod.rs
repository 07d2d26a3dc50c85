//! Connection hub
//!
//! The hub owns the set of registered connections and is the only place that
//! reads or changes it. It runs as a single task draining one command
//! channel, so register, unregister and broadcast never overlap: a
//! broadcast always sees a complete membership set.
//!
//! Delivery is `try_send` onto each connection's bounded outbound queue. A
//! full (or already closed) queue gets its connection evicted on the spot
//! instead of stalling everyone else. Eviction fires the connection's
//! [`EvictionNotice`] so its tasks can stop without draining the queue.

mod command;
mod handle;

pub use command::HubCommand;
pub use handle::HubHandle;

use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;

use crate::message::Message;
use crate::types::{ConnectionId, HubStats};

/// Default size of the hub's command intake
pub const DEFAULT_INTAKE_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("hub is no longer running")]
    Stopped,
}

/// Handed out on registration; resolves when the hub lets go of the connection
#[derive(Debug)]
pub struct EvictionNotice(oneshot::Receiver<()>);

impl EvictionNotice {
    /// `true` if the hub evicted the connection, `false` if it was removed
    /// any other way (unregister, hub stopped)
    pub async fn evicted(self) -> bool {
        self.0.await.is_ok()
    }
}

struct Member {
    outbound: mpsc::Sender<Message>,
    evict: Option<oneshot::Sender<()>>,
}

/// State owned by the hub task
pub struct Hub {
    connections: HashMap<ConnectionId, Member>,
    commands: mpsc::Receiver<HubCommand>,
    stats: HubStats,
}

impl Hub {
    /// Start the hub loop on the current runtime.
    ///
    /// The loop runs until every [`HubHandle`] has been dropped.
    pub fn spawn(intake_capacity: usize) -> HubHandle {
        let (tx, rx) = mpsc::channel(intake_capacity.max(1));
        let hub = Self {
            connections: HashMap::new(),
            commands: rx,
            stats: HubStats::default(),
        };
        tokio::spawn(hub.run());
        HubHandle::new(tx)
    }

    async fn run(mut self) {
        tracing::debug!("Hub started");
        while let Some(command) = self.commands.recv().await {
            self.handle(command);
        }
        tracing::debug!(
            connections = self.connections.len(),
            "Hub stopped, all handles dropped"
        );
    }

    fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register { id, outbound, done } => {
                let notice = self.register(id, outbound);
                let _ = done.send(notice);
            }
            HubCommand::Unregister { id, done } => {
                let removed = self.unregister(id);
                let _ = done.send(removed);
            }
            HubCommand::Broadcast(message) => self.broadcast(message),
            HubCommand::Members { reply } => {
                let _ = reply.send(self.connections.keys().copied().collect());
            }
            HubCommand::Stats { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn register(&mut self, id: ConnectionId, outbound: mpsc::Sender<Message>) -> EvictionNotice {
        let (evict, notice) = oneshot::channel();
        self.connections.insert(
            id,
            Member {
                outbound,
                evict: Some(evict),
            },
        );
        tracing::info!(
            connection = %id,
            connections = self.connections.len(),
            "Connection registered"
        );
        EvictionNotice(notice)
    }

    /// Dropping the stored sender is what closes the outbound queue. The
    /// eviction notice is dropped unfired.
    fn unregister(&mut self, id: ConnectionId) -> bool {
        if self.connections.remove(&id).is_some() {
            tracing::info!(
                connection = %id,
                connections = self.connections.len(),
                "Connection unregistered"
            );
            true
        } else {
            tracing::debug!(connection = %id, "Unregister for unknown connection ignored");
            false
        }
    }

    fn broadcast(&mut self, message: Message) {
        self.stats.messages_broadcast += 1;
        let mut delivered = 0u64;
        let mut evicted = 0u64;

        self.connections.retain(|id, member| {
            match member.outbound.try_send(message.clone()) {
                Ok(()) => {
                    delivered += 1;
                    return true;
                }
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(connection = %id, "Outbound queue full, evicting connection");
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(connection = %id, "Outbound queue closed, evicting connection");
                }
            }
            evicted += 1;
            if let Some(evict) = member.evict.take() {
                let _ = evict.send(());
            }
            false
        });

        self.stats.deliveries += delivered;
        self.stats.evictions += evicted;
        tracing::debug!(
            bytes = message.len(),
            delivered,
            evicted,
            "Broadcast fanned out"
        );
    }

    fn snapshot(&self) -> HubStats {
        HubStats {
            connections: self.connections.len(),
            ..self.stats.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn join(hub: &HubHandle, capacity: usize) -> (ConnectionId, mpsc::Receiver<Message>) {
        let (id, rx, _notice) = join_with_notice(hub, capacity).await;
        (id, rx)
    }

    async fn join_with_notice(
        hub: &HubHandle,
        capacity: usize,
    ) -> (ConnectionId, mpsc::Receiver<Message>, EvictionNotice) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(capacity);
        let notice = hub.register(id, tx).await.unwrap();
        (id, rx, notice)
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_member_once() {
        let hub = Hub::spawn(DEFAULT_INTAKE_CAPACITY);
        let mut receivers = Vec::new();
        for _ in 0..5 {
            receivers.push(join(&hub, 8).await.1);
        }

        hub.broadcast(Message::text("hello")).await.unwrap();
        hub.stats().await.unwrap();

        for rx in &mut receivers {
            assert_eq!(rx.try_recv().unwrap(), Message::text("hello"));
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn test_full_queue_evicts_without_blocking() {
        let hub = Hub::spawn(DEFAULT_INTAKE_CAPACITY);
        let (slow_id, mut slow_rx) = join(&hub, 1).await;
        let (fast_id, mut fast_rx) = join(&hub, 8).await;

        hub.broadcast(Message::text("first")).await.unwrap();
        // slow_rx never drained, so its single slot is still taken
        hub.broadcast(Message::text("second")).await.unwrap();

        let members = hub.members().await.unwrap();
        assert!(!members.contains(&slow_id));
        assert!(members.contains(&fast_id));

        assert_eq!(fast_rx.recv().await.unwrap(), Message::text("first"));
        assert_eq!(fast_rx.recv().await.unwrap(), Message::text("second"));

        // Queue closed after eviction: the buffered message drains, then None
        assert_eq!(slow_rx.recv().await.unwrap(), Message::text("first"));
        assert!(slow_rx.recv().await.is_none());

        assert_eq!(hub.stats().await.unwrap().evictions, 1);
    }

    #[tokio::test]
    async fn test_closed_queue_is_evicted() {
        let hub = Hub::spawn(DEFAULT_INTAKE_CAPACITY);
        let (gone_id, gone_rx) = join(&hub, 8).await;
        drop(gone_rx);

        hub.broadcast(Message::text("anyone?")).await.unwrap();

        assert!(!hub.members().await.unwrap().contains(&gone_id));
    }

    #[tokio::test]
    async fn test_broadcast_order_is_preserved() {
        let hub = Hub::spawn(DEFAULT_INTAKE_CAPACITY);
        let (_, mut a) = join(&hub, 8).await;
        let (_, mut b) = join(&hub, 8).await;

        hub.broadcast(Message::text("m1")).await.unwrap();
        hub.broadcast(Message::text("m2")).await.unwrap();

        for rx in [&mut a, &mut b] {
            assert_eq!(rx.recv().await.unwrap(), Message::text("m1"));
            assert_eq!(rx.recv().await.unwrap(), Message::text("m2"));
        }
    }

    #[tokio::test]
    async fn test_unregister_twice_is_harmless() {
        let hub = Hub::spawn(DEFAULT_INTAKE_CAPACITY);
        let (id, mut rx) = join(&hub, 8).await;
        let (_, mut other) = join(&hub, 8).await;

        assert!(hub.unregister(id).await.unwrap());
        assert!(!hub.unregister(id).await.unwrap());

        // Unregister closed the queue
        assert!(rx.recv().await.is_none());

        hub.broadcast(Message::text("still here")).await.unwrap();
        assert_eq!(other.recv().await.unwrap(), Message::text("still here"));
    }

    #[tokio::test]
    async fn test_membership_follows_register_and_unregister() {
        let hub = Hub::spawn(DEFAULT_INTAKE_CAPACITY);
        let (id, mut rx) = join(&hub, 8).await;

        hub.broadcast(Message::text("in")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), Message::text("in"));

        hub.unregister(id).await.unwrap();
        hub.broadcast(Message::text("out")).await.unwrap();
        hub.stats().await.unwrap();

        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_stats_track_fan_out() {
        let hub = Hub::spawn(DEFAULT_INTAKE_CAPACITY);
        let (_, _a) = join(&hub, 8).await;
        let (_, _b) = join(&hub, 8).await;

        hub.broadcast(Message::binary(vec![1, 2, 3])).await.unwrap();
        hub.broadcast(Message::binary(vec![4])).await.unwrap();

        let stats = hub.stats().await.unwrap();
        assert_eq!(
            stats,
            HubStats {
                connections: 2,
                messages_broadcast: 2,
                deliveries: 4,
                evictions: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_broadcast_with_no_members() {
        let hub = Hub::spawn(DEFAULT_INTAKE_CAPACITY);
        hub.broadcast(Message::text("void")).await.unwrap();

        let stats = hub.stats().await.unwrap();
        assert_eq!(stats.messages_broadcast, 1);
        assert_eq!(stats.deliveries, 0);
    }

    #[tokio::test]
    async fn test_eviction_fires_notice() {
        let hub = Hub::spawn(DEFAULT_INTAKE_CAPACITY);
        let (_, _slow_rx, notice) = join_with_notice(&hub, 1).await;

        hub.broadcast(Message::text("fills the queue")).await.unwrap();
        hub.broadcast(Message::text("overflows")).await.unwrap();

        assert!(notice.evicted().await);
    }

    #[tokio::test]
    async fn test_unregister_releases_notice_without_eviction() {
        let hub = Hub::spawn(DEFAULT_INTAKE_CAPACITY);
        let (id, _rx, notice) = join_with_notice(&hub, 8).await;

        hub.unregister(id).await.unwrap();

        assert!(!notice.evicted().await);
    }
}
