//! Server-Sent Events (SSE) channel registry and delivery engine.
//!
//! This crate owns the in-process mapping from channel ids to live push
//! connections and the rules for getting events onto them.
//!
//! # Architecture
//!
//! - **Channels**: a channel is an opaque string (normally the user id). Each
//!   channel maps to the set of connections currently listening on it.
//! - **Weak sinks**: the registry holds `Weak` references to
//!   [`ConnectionSink`]s. The transport owns the connection; the registry only
//!   routes to it.
//! - **Self-pruning**: a channel is created on first add and removed the
//!   moment its last connection leaves. A sink that refuses a write is removed
//!   as if it had disconnected.
//! - **Encode once**: an event is serialized into one [`Frame`] per send or
//!   broadcast and the same buffer is shared by every sink.
//! - **Heartbeat**: each connection gets a timer that pings its channel while
//!   the connection is registered. The timer is owned by a
//!   [`HeartbeatHandle`] and stops when the handle is cancelled or dropped.
//! - **Ephemeral**: nothing is persisted. Sending to a channel with no
//!   connections is a no-op.
//!
//! # Message Flow
//!
//! 1. The web layer authenticates the caller and calls [`Manager::connect`]
//!    with the caller's id as the channel.
//! 2. The manager registers an mpsc-backed sink, pushes a `ping`, and starts
//!    the heartbeat. The receiver becomes the HTTP response body.
//! 3. Producers call [`Manager::send_message`] (or the registry's `send` /
//!    `broadcast`) with a validated [`events::Event`].
//! 4. When the client disconnects, axum drops the body stream, which drops the
//!    [`Connection`] guard: the heartbeat is cancelled and the sink removed.
//!
//! # Example: Sending an event
//!
//! ```rust,ignore
//! use sse::message::{Message as SseMessage, MessageScope};
//!
//! app_state.sse_manager.send_message(SseMessage {
//!     event: events::Event::message_now("hello")?,
//!     scope: MessageScope::Channel { channel_id: user_id },
//! });
//! ```
//!
//! # Modules
//!
//! - `connection`: `ConnectionId`, the `ConnectionSink` trait and the mpsc-backed `ChannelSink`
//! - `registry`: `ChannelRegistry` with add/remove/send/broadcast
//! - `heartbeat`: per-connection ping timer
//! - `manager`: connection lifecycle and scope-based routing
//! - `message`: wire `Frame` plus `Message`/`MessageScope`

use std::time::Duration;

pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod manager;
pub mod message;
pub mod registry;

#[cfg(test)]
mod testing;

pub use connection::{ChannelId, ChannelSink, ConnectionId, ConnectionSink};
pub use heartbeat::HeartbeatHandle;
pub use manager::{Connection, Manager};
pub use message::Frame;
pub use registry::ChannelRegistry;

/// Heartbeat period used when none is configured.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Shortest heartbeat period; shorter requests are raised to this.
pub const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);
