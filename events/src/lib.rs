//! Event model for the fan-out service.
//!
//! Every value pushed down a stream is an [`Event`]: a tagged JSON object of
//! the form `{"name": <name>, "data": {...}}` whose `data` shape is fixed by
//! `name`. The set of names is closed ([`EventName`]).
//!
//! Events are validated exactly once, when they are constructed or parsed.
//! Fields are private, so any `Event` a consumer holds is already well-formed
//! and the delivery path never re-validates.
//!
//! # Example
//!
//! ```rust
//! use events::{create_event, Event, EventName};
//! use serde_json::json;
//!
//! let event = create_event(
//!     EventName::Message,
//!     json!({"message": "hi", "timestamp": "2024-01-01T00:00:00Z"}),
//! )
//! .unwrap();
//!
//! let wire = event.to_json().unwrap();
//! assert_eq!(Event::from_json(&wire).unwrap(), event);
//! ```

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub mod error;

pub use error::{ValidationError, ValidationErrorKind};

/// The closed set of event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    Ping,
    Message,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::Ping => "ping",
            EventName::Message => "message",
        }
    }
}

impl FromStr for EventName {
    type Err = ValidationError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "ping" => Ok(EventName::Ping),
            "message" => Ok(EventName::Message),
            other => Err(ValidationError::new(ValidationErrorKind::UnknownName(
                other.to_string(),
            ))),
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a `ping` event. Always serialized as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PingData {}

/// Payload of a `message` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageData {
    message: String,
    timestamp: String,
}

impl MessageData {
    pub fn message(&self) -> &str {
        &self.message
    }

    /// ISO-8601 UTC timestamp, exactly as it was supplied or generated.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

/// A validated, immutable event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "name", content = "data", rename_all = "lowercase")]
pub enum Event {
    Ping(PingData),
    Message(MessageData),
}

impl Event {
    pub fn ping() -> Self {
        Event::Ping(PingData::default())
    }

    /// Builds a `message` event stamped with `at`, formatted the way a browser
    /// `Date.toISOString()` would (millisecond precision, `Z` suffix).
    pub fn message(text: impl Into<String>, at: DateTime<Utc>) -> Result<Self, ValidationError> {
        let message = text.into();
        validate_message_text(&message)?;
        Ok(Event::Message(MessageData {
            message,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }))
    }

    pub fn message_now(text: impl Into<String>) -> Result<Self, ValidationError> {
        Self::message(text, Utc::now())
    }

    pub fn name(&self) -> EventName {
        match self {
            Event::Ping(_) => EventName::Ping,
            Event::Message(_) => EventName::Message,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses and validates a JSON document, e.g. the payload of a received frame.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        let raw: Value = serde_json::from_str(json)?;
        validate_event(&raw)
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        validate_event(&raw).map_err(serde::de::Error::custom)
    }
}

/// Validates an untyped value and turns it into an [`Event`].
///
/// The value must be an object with a known string `name`; its `data` must
/// match the shape required by that name.
pub fn validate_event(raw: &Value) -> Result<Event, ValidationError> {
    let object = raw.as_object().ok_or_else(|| {
        ValidationError::new(ValidationErrorKind::Malformed(
            "expected a JSON object".to_string(),
        ))
    })?;

    let name = match object.get("name") {
        Some(Value::String(name)) => name.parse::<EventName>()?,
        Some(_) => return Err(ValidationError::invalid_field("name", "expected a string")),
        None => {
            return Err(ValidationError::new(ValidationErrorKind::MissingField(
                "name",
            )))
        }
    };

    build_event(name, object.get("data"))
}

/// Constructs an event of a specific kind from an untyped payload, applying
/// the same validation as [`validate_event`].
pub fn create_event(name: EventName, data: Value) -> Result<Event, ValidationError> {
    build_event(name, Some(&data))
}

fn build_event(name: EventName, data: Option<&Value>) -> Result<Event, ValidationError> {
    match name {
        EventName::Ping => match data {
            None | Some(Value::Object(_)) => Ok(Event::ping()),
            Some(_) => Err(ValidationError::invalid_field(
                "data",
                "expected an object or nothing",
            )),
        },
        EventName::Message => {
            let data = data.ok_or_else(|| {
                ValidationError::new(ValidationErrorKind::MissingField("data"))
            })?;
            let fields = data
                .as_object()
                .ok_or_else(|| ValidationError::invalid_field("data", "expected an object"))?;

            let message = string_field(fields, "message")?;
            validate_message_text(message)?;

            let timestamp = string_field(fields, "timestamp")?;
            validate_timestamp(timestamp)?;

            Ok(Event::Message(MessageData {
                message: message.to_string(),
                timestamp: timestamp.to_string(),
            }))
        }
    }
}

fn string_field<'a>(
    fields: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    match fields.get(field) {
        Some(Value::String(value)) => Ok(value.as_str()),
        Some(_) => Err(ValidationError::invalid_field(field, "expected a string")),
        None => Err(ValidationError::new(ValidationErrorKind::MissingField(
            field,
        ))),
    }
}

fn validate_message_text(message: &str) -> Result<(), ValidationError> {
    if message.is_empty() {
        return Err(ValidationError::invalid_field(
            "message",
            "message cannot be empty",
        ));
    }
    Ok(())
}

// Strict `YYYY-MM-DDTHH:MM:SS[.f]Z`. RFC 3339 also allows a space or a
// lowercase `t` as the separator, other offsets and leap seconds; all are
// rejected here.
fn validate_timestamp(timestamp: &str) -> Result<(), ValidationError> {
    let parsed = DateTime::parse_from_rfc3339(timestamp).map_err(|e| ValidationError {
        source: Some(Box::new(e)),
        error_kind: ValidationErrorKind::InvalidField {
            field: "timestamp",
            reason: format!("\"{timestamp}\" is not an ISO-8601 datetime"),
        },
    })?;

    if !timestamp.ends_with('Z') {
        return Err(ValidationError::invalid_field(
            "timestamp",
            "expected a UTC datetime ending in 'Z'",
        ));
    }

    if timestamp.as_bytes().get(10) != Some(&b'T') {
        return Err(ValidationError::invalid_field(
            "timestamp",
            "expected 'T' between date and time",
        ));
    }

    // chrono keeps a parsed `:60` as second 59 with an overflowing nanosecond.
    if parsed.nanosecond() >= 1_000_000_000 {
        return Err(ValidationError::invalid_field(
            "timestamp",
            "leap seconds are not accepted",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn hi_event() -> Event {
        create_event(
            EventName::Message,
            json!({"message": "hi", "timestamp": "2024-01-01T00:00:00Z"}),
        )
        .unwrap()
    }

    #[test]
    fn test_message_event_serializes_to_tagged_object() {
        let value: Value = serde_json::from_str(&hi_event().to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"name": "message", "data": {"message": "hi", "timestamp": "2024-01-01T00:00:00Z"}})
        );
    }

    #[test]
    fn test_ping_serializes_with_empty_data() {
        assert_eq!(Event::ping().to_json().unwrap(), r#"{"name":"ping","data":{}}"#);
    }

    #[test]
    fn test_round_trip_for_every_variant() {
        for event in [Event::ping(), hi_event()] {
            let wire = event.to_json().unwrap();
            let raw: Value = serde_json::from_str(&wire).unwrap();
            assert_eq!(validate_event(&raw).unwrap(), event);
            assert_eq!(Event::from_json(&wire).unwrap(), event);
        }
    }

    #[test]
    fn test_ping_accepts_absent_data() {
        let event = validate_event(&json!({"name": "ping"})).unwrap();
        assert_eq!(event, Event::ping());
        assert_eq!(event.name(), EventName::Ping);
    }

    #[test]
    fn test_ping_rejects_non_object_data() {
        let err = validate_event(&json!({"name": "ping", "data": "x"})).unwrap_err();
        assert!(matches!(
            err.error_kind,
            ValidationErrorKind::InvalidField { field: "data", .. }
        ));
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let err = validate_event(&json!({"name": "explode", "data": {}})).unwrap_err();
        assert_eq!(
            err.error_kind,
            ValidationErrorKind::UnknownName("explode".to_string())
        );
        assert_eq!(err.reason(), "unknown event name \"explode\"");
    }

    #[test]
    fn test_non_object_is_malformed() {
        let err = validate_event(&json!(["ping"])).unwrap_err();
        assert!(matches!(err.error_kind, ValidationErrorKind::Malformed(_)));
    }

    #[test]
    fn test_missing_name_is_rejected() {
        let err = validate_event(&json!({"data": {}})).unwrap_err();
        assert_eq!(err.error_kind, ValidationErrorKind::MissingField("name"));
    }

    #[test]
    fn test_empty_message_is_rejected() {
        let err = create_event(
            EventName::Message,
            json!({"message": "", "timestamp": "2024-01-01T00:00:00Z"}),
        )
        .unwrap_err();
        assert!(matches!(
            err.error_kind,
            ValidationErrorKind::InvalidField {
                field: "message",
                ..
            }
        ));
        assert!(Event::message_now("").is_err());
    }

    #[test]
    fn test_message_requires_both_fields() {
        let err = create_event(EventName::Message, json!({"message": "hi"})).unwrap_err();
        assert_eq!(err.error_kind, ValidationErrorKind::MissingField("timestamp"));

        let err = validate_event(&json!({"name": "message"})).unwrap_err();
        assert_eq!(err.error_kind, ValidationErrorKind::MissingField("data"));
    }

    #[test]
    fn test_message_rejects_non_string_message() {
        let err = create_event(
            EventName::Message,
            json!({"message": 42, "timestamp": "2024-01-01T00:00:00Z"}),
        )
        .unwrap_err();
        assert!(matches!(
            err.error_kind,
            ValidationErrorKind::InvalidField {
                field: "message",
                ..
            }
        ));
    }

    #[test]
    fn test_timestamp_must_be_iso8601_utc() {
        for bad in [
            "yesterday",
            "2024-01-01",
            "2024-01-01T00:00:00+02:00",
            "2024-01-01 00:00:00Z",
            "2024-01-01t00:00:00Z",
            "2024-01-01T00:00:60Z",
            "2024-01-01T00:00:00z",
        ] {
            let err = create_event(
                EventName::Message,
                json!({"message": "hi", "timestamp": bad}),
            )
            .unwrap_err();
            assert!(
                matches!(
                    err.error_kind,
                    ValidationErrorKind::InvalidField {
                        field: "timestamp",
                        ..
                    }
                ),
                "{bad} should be rejected"
            );
        }

        assert!(create_event(
            EventName::Message,
            json!({"message": "hi", "timestamp": "2024-01-01T00:00:00.123Z"}),
        )
        .is_ok());
    }

    #[test]
    fn test_message_constructor_uses_millisecond_utc_format() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 30, 0).unwrap();
        match Event::message("hello", at).unwrap() {
            Event::Message(data) => {
                assert_eq!(data.message(), "hello");
                assert_eq!(data.timestamp(), "2024-01-01T12:30:00.000Z");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_deserialize_runs_validation() {
        assert!(serde_json::from_str::<Event>(r#"{"name":"nope"}"#).is_err());
        let event: Event = serde_json::from_str(r#"{"name":"ping","data":{}}"#).unwrap();
        assert_eq!(event, Event::ping());
    }

    #[test]
    fn test_event_name_parse_and_display() {
        assert_eq!("message".parse::<EventName>().unwrap(), EventName::Message);
        assert_eq!(EventName::Ping.to_string(), "ping");
        assert!("PING".parse::<EventName>().is_err());
    }
}
