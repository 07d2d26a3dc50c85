//! Connection adapters
//!
//! A transport is split into a receive half ([`MessageSource`]) and a send
//! half ([`MessageSink`]) so the reader and writer tasks of a connection can
//! own one each. The hub never sees either half.

pub mod memory;

use async_trait::async_trait;

use crate::message::Message;

/// Errors raised by a connection adapter.
///
/// Every variant is terminal for the direction that produced it.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("websocket error: {0}")]
    WebSocket(#[from] axum::Error),

    #[error("transport failed: {0}")]
    Io(String),
}

/// Receive half of a connection
#[async_trait]
pub trait MessageSource: Send {
    /// Wait for the next data message.
    ///
    /// Returns `TransportError::Closed` once the peer has gone away.
    async fn receive(&mut self) -> Result<Message, TransportError>;
}

/// Send half of a connection
#[async_trait]
pub trait MessageSink: Send {
    /// Write one message, waiting on transport I/O only
    async fn send(&mut self, message: Message) -> Result<(), TransportError>;

    /// Close the write side. Calling this more than once is harmless.
    async fn close(&mut self) -> Result<(), TransportError>;
}
