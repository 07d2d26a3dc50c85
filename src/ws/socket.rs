//! WebSocket halves as connection adapters
//!
//! Text frames stay text and binary frames stay binary when relayed. Ping and
//! pong frames never reach the hub; axum answers pings on its own.

use async_trait::async_trait;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use bytes::Bytes;
use futures::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};

use crate::message::{Message, MessageKind};
use crate::transport::{MessageSink, MessageSource, TransportError};

pub struct WsSource {
    receiver: SplitStream<WebSocket>,
}

impl WsSource {
    pub fn new(receiver: SplitStream<WebSocket>) -> Self {
        Self { receiver }
    }
}

#[async_trait]
impl MessageSource for WsSource {
    async fn receive(&mut self) -> Result<Message, TransportError> {
        loop {
            match self.receiver.next().await {
                Some(Ok(frame)) => {
                    if let Some(message) = from_frame(frame)? {
                        return Ok(message);
                    }
                }
                Some(Err(e)) => return Err(TransportError::WebSocket(e)),
                None => return Err(TransportError::Closed),
            }
        }
    }
}

pub struct WsSink {
    sender: SplitSink<WebSocket, WsMessage>,
    closed: bool,
}

impl WsSink {
    pub fn new(sender: SplitSink<WebSocket, WsMessage>) -> Self {
        Self {
            sender,
            closed: false,
        }
    }
}

#[async_trait]
impl MessageSink for WsSink {
    async fn send(&mut self, message: Message) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.sender.send(to_frame(message)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.sender.close().await?;
        Ok(())
    }
}

/// Map an inbound frame to a hub message; `None` for control frames
fn from_frame(frame: WsMessage) -> Result<Option<Message>, TransportError> {
    match frame {
        WsMessage::Text(text) => Ok(Some(Message {
            kind: MessageKind::Text,
            data: Bytes::from(text),
        })),
        WsMessage::Binary(data) => Ok(Some(Message::binary(data))),
        WsMessage::Ping(_) | WsMessage::Pong(_) => Ok(None),
        WsMessage::Close(_) => Err(TransportError::Closed),
    }
}

fn to_frame(message: Message) -> WsMessage {
    if message.kind == MessageKind::Text {
        if let Some(text) = message.as_text() {
            return WsMessage::Text(text.into());
        }
    }
    WsMessage::Binary(message.data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_frame_round_trips_as_text() {
        let message = from_frame(WsMessage::Text("hello".into()))
            .unwrap()
            .unwrap();
        assert_eq!(message, Message::text("hello"));

        match to_frame(message) {
            WsMessage::Text(text) => assert_eq!(text.as_str(), "hello"),
            other => panic!("Expected text frame, got {:?}", other),
        }
    }

    #[test]
    fn test_binary_frame_stays_binary() {
        let message = from_frame(WsMessage::Binary(Bytes::from_static(&[1, 2, 3])))
            .unwrap()
            .unwrap();
        assert_eq!(message.kind, MessageKind::Binary);
        assert!(matches!(to_frame(message), WsMessage::Binary(_)));
    }

    #[test]
    fn test_control_frames_are_skipped() {
        assert!(from_frame(WsMessage::Ping(Bytes::new())).unwrap().is_none());
        assert!(from_frame(WsMessage::Pong(Bytes::new())).unwrap().is_none());
    }

    #[test]
    fn test_close_frame_ends_the_stream() {
        assert!(matches!(
            from_frame(WsMessage::Close(None)),
            Err(TransportError::Closed)
        ));
    }

    #[test]
    fn test_invalid_utf8_text_goes_out_as_binary() {
        let message = Message {
            kind: MessageKind::Text,
            data: Bytes::from_static(&[0xff, 0xfe]),
        };
        assert!(matches!(to_frame(message), WsMessage::Binary(_)));
    }
}
