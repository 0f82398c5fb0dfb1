use crate::connection::{ChannelId, ChannelSink, ConnectionId, ConnectionSink};
use crate::heartbeat::HeartbeatHandle;
use crate::message::{Frame, Message as SseMessage, MessageScope};
use crate::registry::ChannelRegistry;
use crate::{DEFAULT_HEARTBEAT_INTERVAL, MIN_HEARTBEAT_INTERVAL};
use events::Event;
use log::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};

pub struct Manager {
    registry: Arc<ChannelRegistry>,
    heartbeat_interval: Duration,
}

impl Manager {
    /// Creates a manager with its own registry. An interval below
    /// [`MIN_HEARTBEAT_INTERVAL`] (including zero) is raised to it.
    pub fn new(heartbeat_interval: Duration) -> Self {
        if heartbeat_interval < MIN_HEARTBEAT_INTERVAL {
            warn!(
                "SSE heartbeat interval {heartbeat_interval:?} is too short, using {MIN_HEARTBEAT_INTERVAL:?}"
            );
        }

        Self {
            registry: Arc::new(ChannelRegistry::new()),
            heartbeat_interval: heartbeat_interval.max(MIN_HEARTBEAT_INTERVAL),
        }
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    /// Opens a connection on `channel_id`.
    ///
    /// Registers a new sink, pushes one `ping` to the channel straight away
    /// and starts the heartbeat. Frames for the connection arrive on the
    /// returned receiver. Dropping the [`Connection`] guard is the disconnect
    /// signal: it stops the heartbeat and unregisters the sink.
    pub fn connect(&self, channel_id: ChannelId) -> (Connection, UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink: Arc<dyn ConnectionSink> = Arc::new(ChannelSink::new(tx));
        let connection_id = sink.connection_id().clone();

        self.registry.add_client(&channel_id, &sink);
        info!(
            "Registered SSE connection {} on channel {channel_id}",
            connection_id.as_str()
        );

        self.registry.send(&channel_id, &Event::ping());

        let heartbeat =
            self.registry
                .start_heartbeat(&channel_id, &connection_id, self.heartbeat_interval);

        let connection = Connection {
            registry: Arc::clone(&self.registry),
            channel_id,
            connection_id,
            heartbeat: Some(heartbeat),
            _sink: sink,
        };

        (connection, rx)
    }

    /// Send a message based on its scope. Returns the number of connections
    /// that accepted it.
    pub fn send_message(&self, message: SseMessage) -> usize {
        match message.scope {
            MessageScope::Channel { channel_id } => self.registry.send(&channel_id, &message.event),
            MessageScope::Channels { channel_ids } => {
                self.registry.broadcast(&channel_ids, &message.event)
            }
        }
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new(DEFAULT_HEARTBEAT_INTERVAL)
    }
}

/// Guard for one open connection.
///
/// Owns the connection's sink (the registry only holds a weak reference) and
/// its heartbeat timer. Drop it when the client goes away.
pub struct Connection {
    registry: Arc<ChannelRegistry>,
    channel_id: ChannelId,
    connection_id: ConnectionId,
    heartbeat: Option<HeartbeatHandle>,
    _sink: Arc<dyn ConnectionSink>,
}

impl Connection {
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.cancel();
        }
        self.registry
            .remove_client(&self.channel_id, &self.connection_id);
        info!(
            "Unregistered SSE connection {} on channel {}",
            self.connection_id.as_str(),
            self.channel_id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;

    fn ping_text() -> String {
        Frame::encode(&Event::ping()).unwrap().to_text().into_owned()
    }

    #[tokio::test]
    async fn test_connect_registers_and_pings_immediately() {
        let manager = Manager::default();

        let (connection, mut rx) = manager.connect("u1".to_string());

        assert!(manager
            .registry()
            .contains("u1", connection.connection_id()));
        assert_eq!(connection.channel_id(), "u1");
        assert_eq!(rx.recv().await.unwrap().to_text(), ping_text());
    }

    #[tokio::test]
    async fn test_dropping_connection_unregisters_it() {
        let manager = Manager::default();
        let (connection, _rx) = manager.connect("u1".to_string());

        drop(connection);

        assert_eq!(manager.registry().channel_count(), 0);
    }

    #[tokio::test]
    async fn test_connect_pings_existing_connections_on_channel() {
        let manager = Manager::default();
        let other = RecordingSink::new();
        manager.registry().add_client("u1", &other.as_sink());

        let (_connection, _rx) = manager.connect("u1".to_string());

        assert_eq!(other.frames().len(), 1);
        assert_eq!(manager.registry().connection_count("u1"), 2);
    }

    #[tokio::test]
    async fn test_send_message_routes_by_scope() {
        let manager = Manager::default();
        let (_c1, mut rx1) = manager.connect("u1".to_string());
        let (_c2, mut rx2) = manager.connect("u2".to_string());
        // Drain the connect pings.
        rx1.recv().await.unwrap();
        rx2.recv().await.unwrap();

        let event = Event::message_now("hello").unwrap();
        let reached = manager.send_message(SseMessage {
            event: event.clone(),
            scope: MessageScope::Channel {
                channel_id: "u1".to_string(),
            },
        });
        assert_eq!(reached, 1);
        assert!(rx1.recv().await.unwrap().to_text().contains("hello"));
        assert!(rx2.try_recv().is_err());

        let reached = manager.send_message(SseMessage {
            event,
            scope: MessageScope::Channels {
                channel_ids: vec!["u1".to_string(), "u2".to_string(), "u3".to_string()],
            },
        });
        assert_eq!(reached, 2);
        assert!(rx1.recv().await.unwrap().to_text().contains("hello"));
        assert!(rx2.recv().await.unwrap().to_text().contains("hello"));
        assert_eq!(manager.registry().channel_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_heartbeat_uses_configured_interval() {
        let manager = Manager::new(Duration::from_secs(5));
        let (_connection, mut rx) = manager.connect("u1".to_string());
        rx.recv().await.unwrap();

        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(rx.try_recv().unwrap().to_text(), ping_text());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_heartbeat_interval_is_raised_to_minimum() {
        let manager = Manager::new(Duration::ZERO);
        assert_eq!(manager.heartbeat_interval(), MIN_HEARTBEAT_INTERVAL);

        let (_connection, mut rx) = manager.connect("u1".to_string());
        assert_eq!(rx.recv().await.unwrap().to_text(), ping_text());

        tokio::time::sleep(MIN_HEARTBEAT_INTERVAL + Duration::from_millis(1)).await;
        assert_eq!(rx.recv().await.unwrap().to_text(), ping_text());
    }
}
