use crate::connection::{ChannelId, ConnectionId, ConnectionSink};
use crate::error::SinkError;
use crate::heartbeat::HeartbeatHandle;
use crate::message::Frame;
use dashmap::DashMap;
use events::Event;
use log::*;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

type ChannelSinks = HashMap<ConnectionId, Weak<dyn ConnectionSink>>;

/// Maps channel ids to the connections currently listening on them.
///
/// Sinks are held weakly: the registry routes frames but never keeps a
/// connection alive. A channel whose set becomes empty is removed at once, so
/// memory tracks live connections rather than every channel ever seen.
///
/// All reads and writes of one channel's set go through that channel's
/// DashMap shard lock. No lock is held while frames are being enqueued.
pub struct ChannelRegistry {
    channels: DashMap<ChannelId, ChannelSinks>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Adds `sink` to `channel_id`, creating the channel if needed. Adding the
    /// same connection twice leaves a single entry.
    pub fn add_client(&self, channel_id: &str, sink: &Arc<dyn ConnectionSink>) {
        let connection_id = sink.connection_id().clone();
        let mut sinks = self.channels.entry(channel_id.to_string()).or_default();
        sinks.insert(connection_id, Arc::downgrade(sink));

        debug!(
            "Client added to channel {channel_id}. Total clients in channel: {}",
            sinks.len()
        );
    }

    /// Removes a connection from a channel, pruning the channel if it is now
    /// empty. Returns `false` when the connection was not registered there.
    pub fn remove_client(&self, channel_id: &str, connection_id: &ConnectionId) -> bool {
        let (removed, remaining) = {
            let Some(mut sinks) = self.channels.get_mut(channel_id) else {
                return false;
            };
            (sinks.remove(connection_id).is_some(), sinks.len())
        };

        // Re-checked under the shard lock: an add racing with this removal wins.
        if self
            .channels
            .remove_if(channel_id, |_, sinks| sinks.is_empty())
            .is_some()
        {
            debug!("Channel {channel_id} is now empty and has been removed");
        } else if removed {
            debug!(
                "Client removed from channel {channel_id}. Total clients in channel: {remaining}"
            );
        }

        removed
    }

    pub fn contains(&self, channel_id: &str, connection_id: &ConnectionId) -> bool {
        self.channels
            .get(channel_id)
            .is_some_and(|sinks| sinks.contains_key(connection_id))
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn connection_count(&self, channel_id: &str) -> usize {
        self.channels
            .get(channel_id)
            .map_or(0, |sinks| sinks.len())
    }

    /// Delivers `event` to every connection in `channel_id` and returns how
    /// many accepted it.
    ///
    /// The event is serialized once. A connection that refuses the frame is
    /// removed and delivery carries on with the rest. Sending to a channel
    /// with no connections does nothing.
    pub fn send(&self, channel_id: &str, event: &Event) -> usize {
        if !self.channels.contains_key(channel_id) {
            trace!("No clients in channel {channel_id}, skipping {} event", event.name());
            return 0;
        }

        match Frame::encode(event) {
            Ok(frame) => {
                debug!(
                    "Sending event \"{}\" to channel \"{channel_id}\"",
                    event.name()
                );
                self.deliver(channel_id, &frame)
            }
            Err(e) => {
                error!("Failed to serialize SSE event: {e}");
                0
            }
        }
    }

    /// Sends `event` to each channel in order. A failure in one channel never
    /// stops delivery to the others. Returns the total number of connections
    /// that accepted the frame.
    pub fn broadcast<I, S>(&self, channel_ids: I, event: &Event) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let frame = match Frame::encode(event) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize SSE event: {e}");
                return 0;
            }
        };

        let mut channels = 0;
        let mut delivered = 0;
        for channel_id in channel_ids {
            channels += 1;
            delivered += self.deliver(channel_id.as_ref(), &frame);
        }

        debug!(
            "Broadcast event \"{}\" to {channels} channel(s), {delivered} connection(s) reached",
            event.name()
        );
        delivered
    }

    /// Starts a recurring ping for one connection. The first tick fires one
    /// `period` from now. Ticks after the connection has left the channel do
    /// nothing. A `period` below [`crate::MIN_HEARTBEAT_INTERVAL`] is raised
    /// to it.
    ///
    /// The returned handle must be cancelled when the connection ends; it also
    /// stops the timer if it is dropped.
    pub fn start_heartbeat(
        self: &Arc<Self>,
        channel_id: &str,
        connection_id: &ConnectionId,
        period: Duration,
    ) -> HeartbeatHandle {
        HeartbeatHandle::spawn(
            Arc::clone(self),
            channel_id.to_string(),
            connection_id.clone(),
            period,
        )
    }

    fn deliver(&self, channel_id: &str, frame: &Frame) -> usize {
        let snapshot: Vec<(ConnectionId, Weak<dyn ConnectionSink>)> =
            match self.channels.get(channel_id) {
                Some(sinks) => sinks
                    .iter()
                    .map(|(id, sink)| (id.clone(), sink.clone()))
                    .collect(),
                None => return 0,
            };

        let mut delivered = 0;
        for (connection_id, sink) in snapshot {
            let result = match sink.upgrade() {
                Some(sink) => sink.enqueue(frame),
                None => Err(SinkError::closed()),
            };

            match result {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(
                        "Failed to send to connection {} in channel {channel_id}: {e}. Removing client.",
                        connection_id.as_str()
                    );
                    self.remove_client(channel_id, &connection_id);
                }
            }
        }
        delivered
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
