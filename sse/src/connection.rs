use crate::error::SinkError;
use crate::message::Frame;
use tokio::sync::mpsc::UnboundedSender;

/// Opaque channel identifier. In practice the authenticated user's id; its
/// meaning belongs to the caller.
pub type ChannelId = String;

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// One live push connection, as seen by the registry.
///
/// The transport owns the connection; the registry only routes frames to it.
/// `enqueue` must not block and must not panic: a sink that cannot accept a
/// frame returns an error straight away.
pub trait ConnectionSink: Send + Sync {
    fn connection_id(&self) -> &ConnectionId;

    fn enqueue(&self, frame: &Frame) -> Result<(), SinkError>;
}

/// Sink backed by an unbounded mpsc channel whose receiver feeds the HTTP
/// response body.
#[derive(Debug)]
pub struct ChannelSink {
    connection_id: ConnectionId,
    sender: UnboundedSender<Frame>,
}

impl ChannelSink {
    pub fn new(sender: UnboundedSender<Frame>) -> Self {
        Self {
            connection_id: ConnectionId::new(),
            sender,
        }
    }
}

impl ConnectionSink for ChannelSink {
    fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    fn enqueue(&self, frame: &Frame) -> Result<(), SinkError> {
        self.sender.send(frame.clone())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkErrorKind;
    use events::Event;
    use tokio::sync::mpsc;

    #[test]
    fn test_connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[tokio::test]
    async fn test_channel_sink_forwards_frames() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ChannelSink::new(tx);
        let frame = Frame::encode(&Event::ping()).unwrap();

        sink.enqueue(&frame).unwrap();

        assert_eq!(rx.recv().await, Some(frame));
    }

    #[test]
    fn test_channel_sink_fails_once_receiver_is_gone() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = ChannelSink::new(tx);
        drop(rx);

        let err = sink
            .enqueue(&Frame::encode(&Event::ping()).unwrap())
            .unwrap_err();
        assert_eq!(err.error_kind, SinkErrorKind::Closed);
    }
}
