use crate::connection::{ChannelId, ConnectionId};
use crate::registry::ChannelRegistry;
use crate::MIN_HEARTBEAT_INTERVAL;
use events::Event;
use log::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Owned handle to one connection's heartbeat timer.
///
/// Cancel it on the same event that removes the connection from the registry.
/// Dropping the handle stops the timer as well, so a heartbeat can never
/// outlive the value that owns it.
#[derive(Debug)]
pub struct HeartbeatHandle {
    task: JoinHandle<()>,
}

impl HeartbeatHandle {
    pub(crate) fn spawn(
        registry: Arc<ChannelRegistry>,
        channel_id: ChannelId,
        connection_id: ConnectionId,
        period: Duration,
    ) -> Self {
        let period = period.max(MIN_HEARTBEAT_INTERVAL);
        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let ping = Event::ping();

            loop {
                ticker.tick().await;

                // Check-then-send is not atomic. If the connection leaves in
                // between, the ping either reaches nobody or fails and is pruned.
                if registry.contains(&channel_id, &connection_id) {
                    trace!(
                        "Heartbeat for connection {} on channel {channel_id}",
                        connection_id.as_str()
                    );
                    registry.send(&channel_id, &ping);
                }
            }
        });

        Self { task }
    }

    /// Stops the timer. Consumes the handle so it can only happen once.
    pub fn cancel(self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
