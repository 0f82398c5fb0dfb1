use crate::connection::{ConnectionId, ConnectionSink};
use crate::error::SinkError;
use crate::message::Frame;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory sink that records every frame it accepts and can be told to
/// start refusing writes.
pub(crate) struct RecordingSink {
    connection_id: ConnectionId,
    frames: Mutex<Vec<Frame>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            connection_id: ConnectionId::new(),
            frames: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        })
    }

    pub(crate) fn failing() -> Arc<Self> {
        let sink = Self::new();
        sink.failing.store(true, Ordering::SeqCst);
        sink
    }

    pub(crate) fn frames(&self) -> Vec<Frame> {
        self.frames.lock().unwrap().clone()
    }

    pub(crate) fn as_sink(self: &Arc<Self>) -> Arc<dyn ConnectionSink> {
        self.clone()
    }
}

impl ConnectionSink for RecordingSink {
    fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    fn enqueue(&self, frame: &Frame) -> Result<(), SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::rejected("test sink refuses writes"));
        }
        self.frames.lock().unwrap().push(frame.clone());
        Ok(())
    }
}
