//! Error types for the `sse` crate.

use std::error::Error as StdError;
use std::fmt;

/// A connection sink refused a frame.
///
/// Never reported to producers: the registry treats it as a disconnect and
/// drops the sink from its channel.
#[derive(Debug)]
pub struct SinkError {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: SinkErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum SinkErrorKind {
    /// The receiving side of the connection is gone.
    Closed,
    /// The sink is alive but would not take the frame.
    Rejected(String),
}

impl SinkError {
    pub fn closed() -> Self {
        Self {
            source: None,
            error_kind: SinkErrorKind::Closed,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            source: None,
            error_kind: SinkErrorKind::Rejected(reason.into()),
        }
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            SinkErrorKind::Closed => write!(f, "connection closed"),
            SinkErrorKind::Rejected(reason) => write!(f, "frame rejected: {reason}"),
        }
    }
}

impl StdError for SinkError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for SinkError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        // The unsent value is dropped here; only the fact of closure matters.
        SinkError::closed()
    }
}
