use std::error::Error as StdError;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

/// Errors surfaced by the web layer, following the same `source` + `error_kind`
/// shape the lower crates use. `error_kind` alone decides the HTTP status.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: WebErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum WebErrorKind {
    /// Caller has no valid session.
    Unauthenticated,
    /// Malformed input; the reason is returned to the caller as-is.
    Validation(String),
    Internal(String),
}

impl Error {
    pub fn unauthenticated() -> Self {
        Self {
            source: None,
            error_kind: WebErrorKind::Unauthenticated,
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self {
            source: None,
            error_kind: WebErrorKind::Validation(reason.into()),
        }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self {
            source: None,
            error_kind: WebErrorKind::Internal(reason.into()),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.error_kind {
            WebErrorKind::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
            }
            WebErrorKind::Validation(reason) => {
                debug!("Rejecting request: {reason}");
                (StatusCode::BAD_REQUEST, reason).into_response()
            }
            WebErrorKind::Internal(reason) => {
                error!("Internal error: {reason} (source: {:?})", self.source);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
            }
        }
    }
}

impl From<events::ValidationError> for Error {
    fn from(err: events::ValidationError) -> Self {
        Self {
            error_kind: WebErrorKind::Validation(err.reason()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}
