//! Error types for the `events` crate.
//!
//! Follows the same shape as the other crates in the workspace: a root error
//! struct holding an `error_kind` enum plus an optional `source` for chaining.

use std::error::Error as StdError;
use std::fmt;

/// Raised whenever a value does not conform to one of the known event shapes.
#[derive(Debug)]
pub struct ValidationError {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ValidationErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum ValidationErrorKind {
    /// The input was not a JSON object with a string `name` field.
    Malformed(String),
    /// `name` is not one of the known event names.
    UnknownName(String),
    /// A required `data` field is absent.
    MissingField(&'static str),
    /// A `data` field is present but has the wrong type or content.
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

impl ValidationError {
    pub(crate) fn new(error_kind: ValidationErrorKind) -> Self {
        Self {
            source: None,
            error_kind,
        }
    }

    pub(crate) fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::InvalidField {
            field,
            reason: reason.into(),
        })
    }

    /// Human-readable explanation suitable for a 400 response body.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ValidationErrorKind::Malformed(reason) => write!(f, "malformed event: {reason}"),
            ValidationErrorKind::UnknownName(name) => write!(f, "unknown event name \"{name}\""),
            ValidationErrorKind::MissingField(field) => {
                write!(f, "missing required field \"{field}\"")
            }
            ValidationErrorKind::InvalidField { field, reason } => {
                write!(f, "invalid field \"{field}\": {reason}")
            }
        }
    }
}

impl StdError for ValidationError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        Self {
            error_kind: ValidationErrorKind::Malformed(err.to_string()),
            source: Some(Box::new(err)),
        }
    }
}
