use bytes::Bytes;
use events::Event;
use std::borrow::Cow;

use crate::connection::ChannelId;

/// One encoded server-sent event: `data: <JSON event>\n\n`.
///
/// Backed by `Bytes`, so cloning a frame for each sink in a channel shares
/// the single serialized buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Bytes);

impl Frame {
    pub fn encode(event: &Event) -> Result<Self, serde_json::Error> {
        let json = event.to_json()?;
        Ok(Self(Bytes::from(format!("data: {json}\n\n"))))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn to_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

/// An event together with the channels it should reach.
#[derive(Debug, Clone)]
pub struct Message {
    pub event: Event,
    pub scope: MessageScope,
}

#[derive(Debug, Clone)]
pub enum MessageScope {
    /// Send to every connection registered under one channel
    Channel { channel_id: ChannelId },
    /// Send to each listed channel in order; duplicates are delivered twice
    Channels { channel_ids: Vec<ChannelId> },
}
