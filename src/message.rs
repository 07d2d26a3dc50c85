use bytes::Bytes;

/// Frame kind a message arrived as, so it can be relayed the same way
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Binary,
}

/// An opaque payload relayed by the hub.
///
/// The hub never looks inside `data`; cloning is cheap because the bytes are
/// reference counted, which matters when one message fans out to every
/// connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub data: Bytes,
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Text,
            data: Bytes::from(text.into()),
        }
    }

    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self {
            kind: MessageKind::Binary,
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Payload as UTF-8, if it is valid
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_message() {
        let msg = Message::text("hello");
        assert_eq!(msg.kind, MessageKind::Text);
        assert_eq!(msg.as_text(), Some("hello"));
        assert_eq!(msg.len(), 5);
    }

    #[test]
    fn test_binary_message_is_opaque() {
        let msg = Message::binary(vec![0xff, 0x00, 0xfe]);
        assert_eq!(msg.kind, MessageKind::Binary);
        assert!(msg.as_text().is_none());
        assert!(!msg.is_empty());
    }

    #[test]
    fn test_clone_shares_payload() {
        let msg = Message::text("shared");
        let copy = msg.clone();
        assert_eq!(msg.data.as_ptr(), copy.data.as_ptr());
    }
}
