//! SSE HTTP handler for the web layer.
//!
//! Only the axum handler lives here. The channel registry, heartbeat and
//! connection lifecycle live in the `sse` crate.

pub mod handler;
